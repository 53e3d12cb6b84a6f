//! Connector functions
//!
//! A [`FunctionDescriptor`] is what binding an operation produces: a
//! signature (visible parameters and a possibly pending return type) plus
//! the request metadata needed to call it. Registered functions are used
//! through the [`AsyncFunction`] trait so the registry can hold connector
//! functions next to anything else the host provides.

mod check;
mod descriptor;
pub(crate) mod request;
pub(crate) mod response;

pub use check::{check_call, CallArg};
pub use descriptor::{
    FunctionDescriptor, GlobalValues, OperationMeta, ParamDescriptor, Placement, Slot, SlotSource,
};

use async_trait::async_trait;

use crate::error::Result;
use crate::invoke::{self, InvocationContext};
use crate::types::ReturnType;
use crate::values::Val;

/// A function callable from expressions
#[async_trait]
pub trait AsyncFunction: Send + Sync {
    fn qualified_name(&self) -> &str;

    fn params(&self) -> &[ParamDescriptor];

    fn return_type(&self) -> &ReturnType;

    async fn invoke(&self, ctx: &InvocationContext, args: Vec<Val>) -> Result<Val>;
}

#[async_trait]
impl AsyncFunction for FunctionDescriptor {
    fn qualified_name(&self) -> &str {
        FunctionDescriptor::qualified_name(self)
    }

    fn params(&self) -> &[ParamDescriptor] {
        FunctionDescriptor::params(self)
    }

    fn return_type(&self) -> &ReturnType {
        FunctionDescriptor::return_type(self)
    }

    async fn invoke(&self, ctx: &InvocationContext, args: Vec<Val>) -> Result<Val> {
        let connector = ctx.connector_context();
        invoke::invoke(self, connector.as_ref(), &args, ctx.cancel()).await
    }
}

#[cfg(test)]
mod tests;
