//! Dynamic type resolution
//!
//! Some result shapes are only known to the connector. Resolution asks it:
//! either through the operation named by a dynamic-schema extension, whose
//! response carries a JSON schema, or by calling the operation itself and
//! inferring a type from what comes back.
//!
//! Tabular connectors use this once, at bind time, to learn their row type
//! from the item-fetch operation.

use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capabilities::{ConnectorContext, HttpInvoker, TempConnectorContext};
use crate::config::FunctionSettings;
use crate::diagnostics::messages;
use crate::error::{ConnectorError, Result};
use crate::functions::{response, FunctionDescriptor, GlobalValues};
use crate::invoke;
use crate::openapi::schema::TypeBuilder;
use crate::openapi::{ApiDocument, DynamicParameter, DynamicSchemaRef, Schema};
use crate::registry::FunctionRegistry;
use crate::table::TableSource;
use crate::types::{FormulaType, PendingReturn, ReturnType};
use crate::values::Val;

/// Operation names containing this fetch a single item...
pub const ITEM_FETCH: &str = "GetItem";
/// ...unless they contain this, which fetches the whole collection
pub const COLLECTION_FETCH: &str = "GetItems";

/// Namespace prefix for tables bound by name alone
pub const TABLE_NAMESPACE_PREFIX: &str = "_tbl_";

/// The single function whose name contains `GetItem` but not `GetItems`
pub fn select_item_fetch(functions: &[Arc<FunctionDescriptor>]) -> Result<&Arc<FunctionDescriptor>> {
    let matches: Vec<&Arc<FunctionDescriptor>> = functions
        .iter()
        .filter(|f| f.name().contains(ITEM_FETCH) && !f.name().contains(COLLECTION_FETCH))
        .collect();

    match matches.as_slice() {
        [single] => Ok(*single),
        [] => Err(ConnectorError::schema(format!(
            "no item-fetch operation: expected a name containing '{}' but not '{}'",
            ITEM_FETCH, COLLECTION_FETCH
        ))),
        many => {
            let names: Vec<&str> = many.iter().map(|f| f.name()).collect();
            Err(ConnectorError::schema(messages::render(
                messages::ERR_AMBIGUOUS_ITEM_FETCH,
                &[names.join(", ")],
            )))
        }
    }
}

/// Settle `desc`'s return type.
///
/// Resolved types come back without I/O. `functions` is where a dynamic
/// schema's operation is looked up (the descriptors of the same binding).
pub async fn resolve_return_type(
    desc: &FunctionDescriptor,
    functions: &[Arc<FunctionDescriptor>],
    ctx: &dyn ConnectorContext,
    cancel: &CancellationToken,
) -> Result<FormulaType> {
    match desc.return_type() {
        ReturnType::Resolved(ty) => Ok(ty.clone()),
        ReturnType::Pending(PendingReturn::Dynamic(dynamic)) => {
            resolve_dynamic(desc, dynamic, functions, ctx, cancel).await
        }
        ReturnType::Pending(PendingReturn::Sample) => resolve_by_sample(desc, ctx, cancel).await,
    }
}

async fn resolve_dynamic(
    desc: &FunctionDescriptor,
    dynamic: &DynamicSchemaRef,
    functions: &[Arc<FunctionDescriptor>],
    ctx: &dyn ConnectorContext,
    cancel: &CancellationToken,
) -> Result<FormulaType> {
    let target = functions
        .iter()
        .find(|f| f.name() == dynamic.operation_id)
        .ok_or_else(|| {
            ConnectorError::schema(format!(
                "{}: schema operation '{}' is not part of the connector",
                desc.qualified_name(),
                dynamic.operation_id
            ))
        })?;

    let policy = desc.settings().number_policy();
    let mut args = Vec::with_capacity(target.params().len());
    for param in target.params() {
        let value = match dynamic.parameters.get(&param.name) {
            Some(DynamicParameter::Reference { parameter }) => desc.globals().get(parameter).cloned(),
            Some(DynamicParameter::Literal { value }) | Some(DynamicParameter::Bare(value)) => {
                Some(response::literal(value, policy))
            }
            None => None,
        };
        match value {
            Some(value) => args.push(value),
            None if param.required => {
                return Err(ConnectorError::schema(format!(
                    "{}: no value for parameter '{}' of schema operation '{}'",
                    desc.qualified_name(),
                    param.name,
                    target.name()
                )))
            }
            None => args.push(Val::Null),
        }
    }

    debug!(
        function = %desc.qualified_name(),
        schema_operation = %target.name(),
        "resolving dynamic schema"
    );
    let body = fetch_json(target, ctx, &args, cancel).await?;

    let node = match &dynamic.value_path {
        Some(path) => navigate(&body, path).ok_or_else(|| {
            ConnectorError::schema(format!(
                "{}: '{}' not found in the response of '{}'",
                desc.qualified_name(),
                path,
                target.name()
            ))
        })?,
        None => &body,
    };

    let schema: Schema = serde_json::from_value(node.clone()).map_err(|e| {
        ConnectorError::schema(format!("{}: malformed dynamic schema: {}", desc.qualified_name(), e))
    })?;
    Ok(TypeBuilder::standalone(policy).to_type(&schema))
}

async fn resolve_by_sample(
    desc: &FunctionDescriptor,
    ctx: &dyn ConnectorContext,
    cancel: &CancellationToken,
) -> Result<FormulaType> {
    if let Some(param) = desc.params().iter().find(|p| p.required) {
        return Err(ConnectorError::schema(format!(
            "{}: cannot sample without a value for required parameter '{}'",
            desc.qualified_name(),
            param.name
        )));
    }

    debug!(function = %desc.qualified_name(), "resolving return type by sample call");
    let body = fetch_json(desc, ctx, &[], cancel).await?;
    Ok(FormulaType::infer(&body, desc.settings().number_policy()))
}

async fn fetch_json(
    desc: &FunctionDescriptor,
    ctx: &dyn ConnectorContext,
    args: &[Val],
    cancel: &CancellationToken,
) -> Result<JsonValue> {
    let response = invoke::send(desc, ctx, args, cancel).await?;
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Null);
    }
    serde_json::from_slice(&response.body).map_err(|e| {
        ConnectorError::schema(format!("{}: response is not JSON: {}", desc.qualified_name(), e))
    })
}

/// Follow a `/`-separated path of object keys, ignoring case
fn navigate<'j>(json: &'j JsonValue, path: &str) -> Option<&'j JsonValue> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .try_fold(json, |node, segment| {
            let map = node.as_object()?;
            map.get(segment).or_else(|| {
                map.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(segment))
                    .map(|(_, value)| value)
            })
        })
}

/* ===================== Tabular Connectors ===================== */

impl FunctionRegistry {
    /// Bind `document` and learn the table's row type from its item-fetch
    /// operation.
    ///
    /// The document's functions are registered first and stay registered if
    /// resolution fails. On success the item-fetch function is re-registered
    /// with its settled return type.
    pub async fn add_tabular_connector(
        &mut self,
        settings: FunctionSettings,
        table_name: &str,
        document: Option<&ApiDocument>,
        globals: Option<GlobalValues>,
        invoker: Arc<dyn HttpInvoker>,
        cancel: &CancellationToken,
    ) -> Result<TableSource> {
        let mut functions = self.add_action_connector(settings, document, globals)?;
        let item_fetch = select_item_fetch(&functions)?.clone();
        info!(
            table = %table_name,
            function = %item_fetch.qualified_name(),
            "selected item-fetch operation"
        );

        let ctx = TempConnectorContext::new(invoker);
        let row_type = match resolve_return_type(&item_fetch, &functions, &ctx, cancel).await? {
            FormulaType::Record(row) => row,
            other => {
                return Err(ConnectorError::schema(format!(
                    "{}: expected a record, resolved {}",
                    item_fetch.qualified_name(),
                    other
                )))
            }
        };

        let resolved = Arc::new(item_fetch.with_return_type(FormulaType::Record(row_type.clone())));
        self.add_function(resolved.clone());
        for function in functions.iter_mut() {
            if function.name() == resolved.name() {
                *function = resolved.clone();
            }
        }

        info!(table = %table_name, row_type = %FormulaType::Record(row_type.clone()), "bound tabular connector");
        Ok(TableSource::new(table_name, row_type, functions, resolved))
    }

    /// [`add_tabular_connector`](Self::add_tabular_connector) into the
    /// namespace `_tbl_<table_name>` with default settings
    pub async fn add_tabular_connector_for_table(
        &mut self,
        table_name: &str,
        document: Option<&ApiDocument>,
        globals: Option<GlobalValues>,
        invoker: Arc<dyn HttpInvoker>,
        cancel: &CancellationToken,
    ) -> Result<TableSource> {
        let settings = FunctionSettings::new(format!("{}{}", TABLE_NAMESPACE_PREFIX, table_name));
        self.add_tabular_connector(settings, table_name, document, globals, invoker, cancel)
            .await
    }
}
