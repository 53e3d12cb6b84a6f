//! API description documents
//!
//! Parses Swagger 2.0 and OpenAPI 3.x documents (JSON or YAML) into one
//! version-neutral model: a base path, named schemas, and operations in
//! document order. Everything the binder needs to build a function lives on
//! [`Operation`]; version differences (body parameters vs. `requestBody`,
//! `schema` vs. `content`, `definitions` vs. `components`) are flattened
//! away here.

mod raw;
pub mod schema;

pub use schema::{DynamicParameter, DynamicSchemaRef, Schema};

use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::capabilities::HttpMethod;
use crate::error::{ConnectorError, Result};

/// Which description format the document was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger2,
    OpenApi3,
}

/// Where a parameter travels in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
    pub default: Option<JsonValue>,
    /// `x-ms-visibility: internal`: hidden from callers, sent with its default
    pub internal: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    /// Name the body is exposed under when it is not flattened
    pub name: String,
    pub required: bool,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub parameters: Vec<Parameter>,
    pub body: Option<RequestBody>,
    /// Schema of the success response, `None` when the response has no body
    pub response: Option<Schema>,
}

/// A parsed API description
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDocument {
    version: SpecVersion,
    title: Option<String>,
    base_path: String,
    schemas: BTreeMap<String, Schema>,
    operations: Vec<Operation>,
}

impl ApiDocument {
    /// Parse JSON or YAML, picking by the first non-blank character
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim_start().starts_with('{') {
            Self::from_json(text)
        } else {
            Self::from_yaml(text)
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| ConnectorError::invalid_argument(format!("document is not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(text)
            .map_err(|e| ConnectorError::invalid_argument(format!("document is not valid YAML: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: JsonValue) -> Result<Self> {
        let raw: raw::RawDocument = serde_json::from_value(value)
            .map_err(|e| ConnectorError::invalid_argument(format!("malformed API document: {}", e)))?;
        raw.into_document()
    }

    pub fn version(&self) -> SpecVersion {
        self.version
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Path prefix every operation path is appended to (no trailing `/`)
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Look up a local reference such as `#/definitions/Item` or
    /// `#/components/schemas/Item`
    pub fn resolve_ref(&self, reference: &str) -> Option<&Schema> {
        let name = reference
            .strip_prefix("#/definitions/")
            .or_else(|| reference.strip_prefix("#/components/schemas/"))?;
        self.schemas.get(name)
    }

    pub(crate) fn new(
        version: SpecVersion,
        title: Option<String>,
        base_path: String,
        schemas: BTreeMap<String, Schema>,
        operations: Vec<Operation>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for op in &operations {
            if !seen.insert(op.name.as_str()) {
                return Err(ConnectorError::invalid_argument(format!(
                    "duplicate operation name '{}'",
                    op.name
                )));
            }
        }

        if operations.is_empty() {
            warn!("API document declares no operations");
        }

        Ok(Self {
            version,
            title,
            base_path,
            schemas,
            operations,
        })
    }
}

/// Name for an operation that has no `operationId`: `get_items_id` for `GET /items/{id}`
pub(crate) fn synthesize_name(method: HttpMethod, path: &str) -> String {
    let mut name = method.as_str().to_lowercase();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        name.push('_');
        name.extend(
            segment
                .chars()
                .filter(|c| !matches!(c, '{' | '}'))
                .map(|c| if c.is_alphanumeric() { c } else { '_' }),
        );
    }
    name
}
