//! Table sources backed by connectors

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::capabilities::ConnectorContext;
use crate::error::Result;
use crate::functions::FunctionDescriptor;
use crate::invoke;
use crate::types::{FormulaType, RecordType};
use crate::values::Val;

/// A connector exposed as a table: its functions plus the row type learned
/// from the item-fetch operation.
///
/// Immutable. A different row type means a new `TableSource`.
#[derive(Debug, Clone)]
pub struct TableSource {
    name: String,
    row_type: RecordType,
    functions: Vec<Arc<FunctionDescriptor>>,
    item_fetch: Arc<FunctionDescriptor>,
}

impl TableSource {
    pub(crate) fn new(
        name: impl Into<String>,
        row_type: RecordType,
        functions: Vec<Arc<FunctionDescriptor>>,
        item_fetch: Arc<FunctionDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            row_type,
            functions,
            item_fetch,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        self.item_fetch.namespace()
    }

    pub fn row_type(&self) -> &RecordType {
        &self.row_type
    }

    /// `*[...]` over the row type
    pub fn formula_type(&self) -> FormulaType {
        FormulaType::Table(self.row_type.clone())
    }

    pub fn functions(&self) -> &[Arc<FunctionDescriptor>] {
        &self.functions
    }

    /// Function by operation name
    pub fn function(&self, name: &str) -> Option<&Arc<FunctionDescriptor>> {
        self.functions.iter().find(|f| f.name() == name)
    }

    pub fn item_fetch(&self) -> &Arc<FunctionDescriptor> {
        &self.item_fetch
    }

    /// Fetch one row through the item-fetch operation
    pub async fn fetch_item(
        &self,
        ctx: &dyn ConnectorContext,
        key: &[Val],
        cancel: &CancellationToken,
    ) -> Result<Val> {
        invoke::invoke(&self.item_fetch, ctx, key, cancel).await
    }
}
