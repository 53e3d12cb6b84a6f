//! Wire shapes of Swagger 2.0 / OpenAPI 3.x documents and their lowering
//! into the version-neutral model

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{
    synthesize_name, ApiDocument, Operation, Parameter, ParameterLocation, RequestBody, Schema,
    SpecVersion,
};
use crate::capabilities::HttpMethod;
use crate::error::{ConnectorError, Result};

#[derive(Debug, Deserialize)]
pub(super) struct RawDocument {
    // YAML documents often leave `swagger: 2.0` unquoted
    swagger: Option<JsonValue>,
    openapi: Option<JsonValue>,
    info: Option<RawInfo>,
    #[serde(rename = "basePath")]
    base_path: Option<String>,
    #[serde(default)]
    servers: Vec<RawServer>,
    /// Kept as a map so operations come out in document order
    #[serde(default)]
    paths: Map<String, JsonValue>,
    #[serde(default)]
    definitions: BTreeMap<String, Schema>,
    #[serde(default)]
    parameters: BTreeMap<String, RawParameter>,
    components: Option<RawComponents>,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawComponents {
    #[serde(default)]
    schemas: BTreeMap<String, Schema>,
    #[serde(default)]
    parameters: BTreeMap<String, RawParameter>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPathItem {
    #[serde(default)]
    parameters: Vec<RawParameter>,
    /// Operations keyed by method, in document order
    #[serde(flatten)]
    methods: Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawOperation {
    #[serde(rename = "operationId")]
    operation_id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    parameters: Vec<RawParameter>,
    #[serde(rename = "requestBody")]
    request_body: Option<RawRequestBody>,
    #[serde(default)]
    responses: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawParameter {
    #[serde(rename = "$ref")]
    reference: Option<String>,
    name: Option<String>,
    #[serde(rename = "in")]
    location: Option<String>,
    #[serde(default)]
    required: bool,
    schema: Option<Schema>,
    // Swagger 2.0 puts the type of non-body parameters inline
    #[serde(rename = "type")]
    param_type: Option<String>,
    format: Option<String>,
    items: Option<Box<Schema>>,
    default: Option<JsonValue>,
    description: Option<String>,
    #[serde(rename = "x-ms-visibility")]
    visibility: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRequestBody {
    #[serde(default)]
    required: bool,
    #[serde(default)]
    content: Map<String, JsonValue>,
    #[serde(rename = "x-bodyName")]
    body_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResponse {
    schema: Option<Schema>,
    #[serde(default)]
    content: Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawMediaType {
    schema: Option<Schema>,
}

/* ===================== Lowering ===================== */

impl RawDocument {
    pub(super) fn into_document(self) -> Result<ApiDocument> {
        let swagger = self.swagger.as_ref().map(version_text);
        let openapi = self.openapi.as_ref().map(version_text);
        let version = match (&swagger, &openapi) {
            (Some(v), _) if v.starts_with('2') => SpecVersion::Swagger2,
            (_, Some(v)) if v.starts_with('3') => SpecVersion::OpenApi3,
            (swagger, openapi) => {
                return Err(ConnectorError::invalid_argument(format!(
                    "unsupported document version (swagger: {:?}, openapi: {:?})",
                    swagger, openapi
                )))
            }
        };

        let base_path = match version {
            SpecVersion::Swagger2 => self.base_path.clone().unwrap_or_default(),
            SpecVersion::OpenApi3 => self
                .servers
                .first()
                .map(|server| server_path(&server.url))
                .unwrap_or_default(),
        };
        let base_path = base_path.trim_end_matches('/').to_string();

        let components = self.components.unwrap_or_default();
        let mut schemas = self.definitions;
        schemas.extend(components.schemas);
        let mut shared_params = self.parameters;
        shared_params.extend(components.parameters);

        let lowering = Lowering {
            version,
            shared_params: &shared_params,
        };

        let mut operations = Vec::new();
        for (path, item) in self.paths {
            if path.starts_with("x-") {
                continue;
            }
            let item: RawPathItem = serde_json::from_value(item).map_err(|e| {
                ConnectorError::invalid_argument(format!("malformed path item '{}': {}", path, e))
            })?;

            for (key, value) in item.methods {
                // Extensions, `summary`, `servers` and the like sit next to the methods
                let Some(method) = HttpMethod::from_key(&key) else {
                    continue;
                };
                let raw_op: RawOperation = serde_json::from_value(value).map_err(|e| {
                    ConnectorError::invalid_argument(format!(
                        "malformed operation '{} {}': {}",
                        method, path, e
                    ))
                })?;
                operations.push(lowering.operation(&path, method, &item.parameters, raw_op)?);
            }
        }

        debug!(
            version = ?version,
            operations = operations.len(),
            base_path = %base_path,
            "parsed API document"
        );

        ApiDocument::new(
            version,
            self.info.and_then(|i| i.title),
            base_path,
            schemas,
            operations,
        )
    }
}

fn version_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Path portion of a server URL; relative URLs are already paths
fn server_path(server: &str) -> String {
    match url::Url::parse(server) {
        Ok(url) => url.path().to_string(),
        Err(_) if server.starts_with('/') => server.to_string(),
        Err(_) => String::new(),
    }
}

struct Lowering<'a> {
    version: SpecVersion,
    shared_params: &'a BTreeMap<String, RawParameter>,
}

impl Lowering<'_> {
    fn operation(
        &self,
        path: &str,
        method: HttpMethod,
        path_params: &[RawParameter],
        raw: RawOperation,
    ) -> Result<Operation> {
        let name = raw
            .operation_id
            .clone()
            .unwrap_or_else(|| synthesize_name(method, path));

        // Operation-level parameters override path-level ones of the same name
        let mut merged: Vec<RawParameter> = Vec::new();
        for param in path_params.iter().chain(raw.parameters.iter()) {
            let param = self.deref_param(param)?;
            merged.retain(|p| !(p.name == param.name && p.location == param.location));
            merged.push(param);
        }

        let mut parameters = Vec::new();
        let mut body = None;
        for param in merged {
            let param_name = param.name.clone().unwrap_or_default();
            match param.location.as_deref() {
                Some("body") => {
                    body = Some(RequestBody {
                        name: param_name,
                        required: param.required,
                        schema: param.schema.unwrap_or_default(),
                    });
                }
                Some(location) => match parse_location(location) {
                    Some(location) => parameters.push(lower_param(param_name, location, param)),
                    None => warn!(
                        operation = %name,
                        parameter = %param_name,
                        location,
                        "skipping parameter with unsupported location"
                    ),
                },
                None => warn!(operation = %name, parameter = %param_name, "parameter without location"),
            }
        }

        if let Some(request_body) = raw.request_body {
            if let Some(schema) = pick_content_schema(&request_body.content) {
                body = Some(RequestBody {
                    name: request_body.body_name.unwrap_or_else(|| "body".to_string()),
                    required: request_body.required,
                    schema,
                });
            }
        }

        let response = self.success_response(&raw.responses);

        Ok(Operation {
            name,
            method,
            path: path.to_string(),
            summary: raw.summary,
            description: raw.description,
            deprecated: raw.deprecated,
            parameters,
            body,
            response,
        })
    }

    fn deref_param(&self, param: &RawParameter) -> Result<RawParameter> {
        let Some(reference) = &param.reference else {
            return Ok(param.clone());
        };

        let key = reference
            .strip_prefix("#/parameters/")
            .or_else(|| reference.strip_prefix("#/components/parameters/"))
            .unwrap_or(reference);
        self.shared_params.get(key).cloned().ok_or_else(|| {
            ConnectorError::invalid_argument(format!("unresolved parameter reference '{}'", reference))
        })
    }

    /// First 2xx response in document order, else `default`
    fn success_response(&self, responses: &Map<String, JsonValue>) -> Option<Schema> {
        let chosen = responses
            .iter()
            .find(|(code, _)| code.starts_with('2'))
            .or_else(|| responses.iter().find(|(code, _)| code.as_str() == "default"))?;

        let raw: RawResponse = match serde_json::from_value(chosen.1.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(status = %chosen.0, error = %e, "ignoring malformed response");
                return None;
            }
        };

        match self.version {
            SpecVersion::Swagger2 => raw.schema,
            SpecVersion::OpenApi3 => pick_content_schema(&raw.content),
        }
    }
}

fn parse_location(location: &str) -> Option<ParameterLocation> {
    match location {
        "path" => Some(ParameterLocation::Path),
        "query" => Some(ParameterLocation::Query),
        "header" => Some(ParameterLocation::Header),
        _ => None,
    }
}

fn lower_param(name: String, location: ParameterLocation, raw: RawParameter) -> Parameter {
    let schema = match raw.schema {
        Some(schema) => schema,
        None => {
            let mut schema = Schema::of_type(raw.param_type.as_deref().unwrap_or("string"));
            schema.format = raw.format;
            schema.items = raw.items;
            schema
        }
    };
    let default = raw.default.or_else(|| schema.default.clone());
    let internal = raw.visibility.as_deref() == Some("internal") || schema.is_internal();

    Parameter {
        name,
        location,
        // Path parameters are always required
        required: raw.required || location == ParameterLocation::Path,
        schema,
        default,
        internal,
        description: raw.description,
    }
}

/// The JSON media type's schema, else the first media type that has one
fn pick_content_schema(content: &Map<String, JsonValue>) -> Option<Schema> {
    let media = |value: &JsonValue| -> Option<Schema> {
        serde_json::from_value::<RawMediaType>(value.clone())
            .ok()
            .and_then(|m| m.schema)
    };

    content
        .get("application/json")
        .and_then(media)
        .or_else(|| content.values().find_map(media))
}
