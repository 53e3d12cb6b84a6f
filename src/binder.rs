//! Binding API documents into a function registry
//!
//! Every operation of a document becomes one [`FunctionDescriptor`],
//! registered as `namespace.operationName` in document order. Binding is
//! synchronous and does no I/O: return types the document does not pin down
//! stay pending until the resolver asks the connector.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::FunctionSettings;
use crate::error::{ConnectorError, Result};
use crate::functions::{
    response, FunctionDescriptor, GlobalValues, OperationMeta, ParamDescriptor, Placement, Slot,
    SlotSource,
};
use crate::openapi::schema::TypeBuilder;
use crate::openapi::{ApiDocument, Operation, ParameterLocation};
use crate::registry::FunctionRegistry;
use crate::values::Val;

/// Global value name platform connectors receive their connection under
pub const CONNECTION_ID: &str = "connectionId";

impl FunctionRegistry {
    /// Bind every operation of `document` under `settings`' namespace.
    ///
    /// Fails with `InvalidArgument` when `document` is missing; nothing is
    /// registered in that case. Functions already registered under the same
    /// qualified name are replaced.
    pub fn add_action_connector(
        &mut self,
        settings: FunctionSettings,
        document: Option<&ApiDocument>,
        globals: Option<GlobalValues>,
    ) -> Result<Vec<Arc<FunctionDescriptor>>> {
        let document =
            document.ok_or_else(|| ConnectorError::invalid_argument("API document is required"))?;

        let namespace = settings.namespace().to_string();
        let functions = describe_document(document, Arc::new(settings), Arc::new(globals.unwrap_or_default()));

        for function in &functions {
            debug!(function = %function, "registering connector function");
            self.add_function(function.clone());
        }

        info!(
            namespace = %namespace,
            functions = functions.len(),
            "bound action connector"
        );
        Ok(functions)
    }

    /// [`add_action_connector`](Self::add_action_connector) with default settings for `namespace`
    pub fn add_action_connector_in(
        &mut self,
        namespace: &str,
        document: Option<&ApiDocument>,
        globals: Option<GlobalValues>,
    ) -> Result<Vec<Arc<FunctionDescriptor>>> {
        self.add_action_connector(FunctionSettings::new(namespace), document, globals)
    }

    /// Bind a platform connector: the connection id is supplied as the
    /// `connectionId` global value and hidden from every signature
    pub fn add_platform_action_connector(
        &mut self,
        namespace: &str,
        document: Option<&ApiDocument>,
        connection_id: &str,
    ) -> Result<Vec<Arc<FunctionDescriptor>>> {
        let mut globals = GlobalValues::new();
        globals.insert(CONNECTION_ID.to_string(), Val::from(connection_id));
        self.add_action_connector_in(namespace, document, Some(globals))
    }
}

/// Descriptors for every operation, in document order
pub(crate) fn describe_document(
    document: &ApiDocument,
    settings: Arc<FunctionSettings>,
    globals: Arc<GlobalValues>,
) -> Vec<Arc<FunctionDescriptor>> {
    document
        .operations()
        .iter()
        .map(|op| Arc::new(describe_operation(document, op, &settings, &globals)))
        .collect()
}

/// A parameter callers see, before argument positions are assigned
struct Visible {
    param: ParamDescriptor,
    wire_name: String,
    placement: Placement,
}

fn describe_operation(
    document: &ApiDocument,
    op: &Operation,
    settings: &Arc<FunctionSettings>,
    globals: &Arc<GlobalValues>,
) -> FunctionDescriptor {
    let policy = settings.number_policy();
    let mut types = TypeBuilder::new(document, policy);
    let mut slots = Vec::new();
    let mut visible = Vec::new();

    for param in &op.parameters {
        let placement = match param.location {
            ParameterLocation::Path => Placement::Path,
            ParameterLocation::Query => Placement::Query,
            ParameterLocation::Header => Placement::Header,
        };

        if let Some(value) = globals.get(&param.name) {
            slots.push(Slot {
                name: param.name.clone(),
                placement,
                source: SlotSource::Global(value.clone()),
            });
            continue;
        }

        if param.internal {
            match &param.default {
                Some(default) => {
                    slots.push(Slot {
                        name: param.name.clone(),
                        placement,
                        source: SlotSource::Default(response::literal(default, policy)),
                    });
                    continue;
                }
                // Nothing to send on the caller's behalf
                None if !param.required => continue,
                None => {}
            }
        }

        visible.push(Visible {
            param: ParamDescriptor {
                name: param.name.clone(),
                ty: types.to_type(&param.schema),
                required: param.required,
                description: param.description.clone(),
            },
            wire_name: param.name.clone(),
            placement,
        });
    }

    if let Some(body) = &op.body {
        let schema = types.resolve(&body.schema).cloned().unwrap_or_else(|| body.schema.clone());

        if schema.properties.is_empty() {
            visible.push(Visible {
                param: ParamDescriptor {
                    name: body.name.clone(),
                    ty: types.to_type(&body.schema),
                    required: body.required,
                    description: schema.description.clone(),
                },
                wire_name: body.name.clone(),
                placement: Placement::Body,
            });
        } else {
            // Object bodies are flattened: each property is its own parameter
            for (name, prop) in &schema.properties {
                if let Some(value) = globals.get(name) {
                    slots.push(Slot {
                        name: name.clone(),
                        placement: Placement::BodyProperty,
                        source: SlotSource::Global(value.clone()),
                    });
                    continue;
                }
                if let (true, Some(default)) = (prop.is_internal(), &prop.default) {
                    slots.push(Slot {
                        name: name.clone(),
                        placement: Placement::BodyProperty,
                        source: SlotSource::Default(response::literal(default, policy)),
                    });
                    continue;
                }

                visible.push(Visible {
                    param: ParamDescriptor {
                        name: name.clone(),
                        ty: types.to_type(prop),
                        required: body.required && schema.required.contains(name),
                        description: prop.description.clone(),
                    },
                    wire_name: name.clone(),
                    placement: Placement::BodyProperty,
                });
            }
        }
    }

    // Required parameters first, each group in declaration order
    visible.sort_by_key(|v| !v.param.required);

    let mut params = Vec::with_capacity(visible.len());
    for (index, v) in visible.into_iter().enumerate() {
        slots.push(Slot {
            name: v.wire_name,
            placement: v.placement,
            source: SlotSource::Argument(index),
        });
        params.push(v.param);
    }

    FunctionDescriptor {
        namespace: settings.namespace().to_string(),
        name: op.name.clone(),
        qualified_name: format!("{}.{}", settings.namespace(), op.name),
        description: op.summary.clone().or_else(|| op.description.clone()),
        deprecated: op.deprecated,
        params,
        return_type: types.return_type(op.response.as_ref()),
        operation: OperationMeta {
            operation_id: op.name.clone(),
            method: op.method,
            base_path: document.base_path().to_string(),
            path: op.path.clone(),
            slots,
        },
        settings: settings.clone(),
        globals: globals.clone(),
    }
}
