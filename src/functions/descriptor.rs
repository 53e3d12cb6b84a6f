//! Function descriptors: one per bound operation

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::capabilities::HttpMethod;
use crate::config::FunctionSettings;
use crate::types::{FormulaType, ReturnType};
use crate::values::Val;

/// Values injected at bind time, shared by every function of one binding call
pub type GlobalValues = BTreeMap<String, Val>;

/// A parameter callers pass explicitly
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub ty: FormulaType,
    pub required: bool,
    pub description: Option<String>,
}

/// Where a request input travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Path,
    Query,
    Header,
    /// The whole JSON body
    Body,
    /// One property of a flattened object body
    BodyProperty,
}

/// Where a request input's value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSource {
    /// Index into the call's argument list
    Argument(usize),
    /// Filled from the binding's global values
    Global(Val),
    /// Internal parameter, always sent with its default
    Default(Val),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub placement: Placement,
    pub source: SlotSource,
}

/// Everything needed to build the HTTP request for a call
#[derive(Debug, Clone, PartialEq)]
pub struct OperationMeta {
    pub operation_id: String,
    pub method: HttpMethod,
    pub base_path: String,
    /// Path template relative to `base_path`, e.g. `/items/{id}`
    pub path: String,
    pub slots: Vec<Slot>,
}

/// One callable unit derived from one operation.
///
/// Descriptors are immutable once built. Resolving a pending return type
/// produces a new descriptor via [`FunctionDescriptor::with_return_type`].
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) qualified_name: String,
    pub(crate) description: Option<String>,
    pub(crate) deprecated: bool,
    pub(crate) params: Vec<ParamDescriptor>,
    pub(crate) return_type: ReturnType,
    pub(crate) operation: OperationMeta,
    pub(crate) settings: Arc<FunctionSettings>,
    pub(crate) globals: Arc<GlobalValues>,
}

impl FunctionDescriptor {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Operation name without the namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `namespace.operationName`
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| p.required).count()
    }

    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    pub fn operation(&self) -> &OperationMeta {
        &self.operation
    }

    pub fn settings(&self) -> &FunctionSettings {
        &self.settings
    }

    pub fn globals(&self) -> &GlobalValues {
        &self.globals
    }

    /// A copy of this descriptor with the return type settled
    pub fn with_return_type(&self, ty: FormulaType) -> FunctionDescriptor {
        FunctionDescriptor {
            return_type: ReturnType::Resolved(ty),
            ..self.clone()
        }
    }
}

/// `Sql.GetItemV2(id: Text) -> ?`
impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.qualified_name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let marker = if param.required { "" } else { "?" };
            write!(f, "{}{}: {}", param.name, marker, param.ty)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}
