pub mod binder;
pub mod capabilities;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod functions;
pub mod invoke;
pub mod openapi;
pub mod registry;
pub mod resolver;
pub mod table;
pub mod types;
pub mod values;

#[cfg(test)]
mod testing;

// Re-export main types
pub use capabilities::{CapabilityProvider, ConnectorContext, HttpInvoker};
pub use config::{Config, FunctionSettings, NumberPolicy};
pub use diagnostics::{Diagnostic, Severity, Span, Token};
pub use error::{ConnectorError, Result};
pub use functions::{AsyncFunction, FunctionDescriptor, GlobalValues};
pub use invoke::InvocationContext;
pub use openapi::ApiDocument;
pub use registry::FunctionRegistry;
pub use table::TableSource;
pub use types::{FormulaType, RecordType, ReturnType};
pub use values::Val;
