//! JSON schemas and their conversion to [`FormulaType`]

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::warn;

use super::ApiDocument;
use crate::config::NumberPolicy;
use crate::types::{FormulaType, PendingReturn, RecordType, ReturnType};

/// The subset of JSON Schema that API documents use to describe payloads
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Schema {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,

    #[serde(rename = "type")]
    schema_type: Option<SchemaType>,

    pub format: Option<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, Schema>,

    pub items: Option<Box<Schema>>,

    #[serde(default, deserialize_with = "lenient_names")]
    pub required: Vec<String>,

    #[serde(default, rename = "allOf")]
    pub all_of: Vec<Schema>,

    pub default: Option<JsonValue>,

    pub description: Option<String>,

    #[serde(rename = "x-ms-visibility")]
    pub visibility: Option<String>,

    #[serde(rename = "x-ms-dynamic-schema")]
    pub dynamic_schema: Option<DynamicSchemaRef>,

    #[serde(rename = "x-ms-dynamic-properties")]
    pub dynamic_properties: Option<DynamicSchemaRef>,
}

/// `type` is a string, or a list in newer documents (`["string", "null"]`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum SchemaType {
    One(String),
    Many(Vec<String>),
}

/// `required` should be a list of names; some documents put a bool there
fn lenient_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    })
}

impl Schema {
    /// A schema with only a `type`
    pub fn of_type(ty: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::One(ty.to_string())),
            ..Self::default()
        }
    }

    /// The declared type, ignoring `"null"` in type lists
    pub fn primary_type(&self) -> Option<&str> {
        match self.schema_type.as_ref()? {
            SchemaType::One(ty) => Some(ty),
            SchemaType::Many(types) => types.iter().map(String::as_str).find(|t| *t != "null"),
        }
    }

    pub fn is_internal(&self) -> bool {
        self.visibility.as_deref() == Some("internal")
    }

    /// Dynamic schema reference, from either extension
    pub fn dynamic(&self) -> Option<&DynamicSchemaRef> {
        self.dynamic_schema
            .as_ref()
            .or(self.dynamic_properties.as_ref())
    }

    pub fn is_object(&self) -> bool {
        self.primary_type() == Some("object") || !self.properties.is_empty()
    }
}

/// Pointer to the operation that describes another operation's shape
/// (`x-ms-dynamic-schema` / `x-ms-dynamic-properties`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DynamicSchemaRef {
    #[serde(rename = "operationId")]
    pub operation_id: String,

    #[serde(default)]
    pub parameters: BTreeMap<String, DynamicParameter>,

    /// Slash-separated path to the schema inside the response
    #[serde(rename = "value-path", alias = "itemValuePath")]
    pub value_path: Option<String>,
}

/// How to fill one parameter of the schema operation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DynamicParameter {
    /// Take the value of another parameter of the same name
    Reference { parameter: String },
    Literal { value: JsonValue },
    Bare(JsonValue),
}

/* ===================== Schema -> FormulaType ===================== */

/// Converts schemas to types, resolving `$ref`s against a document.
///
/// Recursive references are cut off: the second visit to a schema name
/// yields `Untyped`.
pub(crate) struct TypeBuilder<'a> {
    document: Option<&'a ApiDocument>,
    policy: NumberPolicy,
    visiting: Vec<String>,
}

impl<'a> TypeBuilder<'a> {
    pub fn new(document: &'a ApiDocument, policy: NumberPolicy) -> Self {
        Self {
            document: Some(document),
            policy,
            visiting: Vec::new(),
        }
    }

    /// For schemas that arrive without a document (dynamic schema responses)
    pub fn standalone(policy: NumberPolicy) -> Self {
        Self {
            document: None,
            policy,
            visiting: Vec::new(),
        }
    }

    /// Follow `$ref` (once) to the schema it names
    pub fn resolve<'s>(&self, schema: &'s Schema) -> Option<&'s Schema>
    where
        'a: 's,
    {
        match &schema.reference {
            None => Some(schema),
            Some(reference) => self.document.and_then(|doc| doc.resolve_ref(reference)),
        }
    }

    pub fn to_type(&mut self, schema: &Schema) -> FormulaType {
        if let Some(reference) = &schema.reference {
            return self.follow_ref(reference);
        }

        if !schema.all_of.is_empty() {
            return self.merge_all_of(schema);
        }

        match schema.primary_type() {
            Some("boolean") => FormulaType::Boolean,
            Some("integer") | Some("number") => FormulaType::number(self.policy),
            Some("string") => match schema.format.as_deref() {
                Some("date-time") | Some("date") | Some("date-no-tz") => FormulaType::DateTime,
                _ => FormulaType::Text,
            },
            Some("null") => FormulaType::Blank,
            Some("array") => match &schema.items {
                Some(items) => FormulaType::Table(self.row_type(items)),
                None => FormulaType::Table(RecordType::new()),
            },
            _ if schema.is_object() => FormulaType::Record(self.record_type(schema)),
            _ => FormulaType::Untyped,
        }
    }

    /// Shape of an operation's result.
    ///
    /// Dynamic-schema extensions, and schemas too vague to name their fields,
    /// leave the result pending.
    pub fn return_type(&mut self, response: Option<&Schema>) -> ReturnType {
        let Some(schema) = response else {
            return ReturnType::Resolved(FormulaType::Blank);
        };

        let target = self.resolve(schema).unwrap_or(schema);
        let dynamic = target
            .dynamic()
            .or_else(|| target.items.as_deref().and_then(|items| items.dynamic()));
        if let Some(dynamic) = dynamic {
            return ReturnType::Pending(PendingReturn::Dynamic(dynamic.clone()));
        }

        let ty = self.to_type(schema);
        if is_fully_specified(&ty) {
            ReturnType::Resolved(ty)
        } else {
            ReturnType::Pending(PendingReturn::Sample)
        }
    }

    fn follow_ref(&mut self, reference: &str) -> FormulaType {
        if self.visiting.iter().any(|r| r == reference) {
            return FormulaType::Untyped;
        }

        let Some(target) = self.document.and_then(|doc| doc.resolve_ref(reference)) else {
            warn!(reference, "unresolved schema reference");
            return FormulaType::Untyped;
        };

        self.visiting.push(reference.to_string());
        let ty = self.to_type(target);
        self.visiting.pop();
        ty
    }

    fn record_type(&mut self, schema: &Schema) -> RecordType {
        schema
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), self.to_type(prop)))
            .collect()
    }

    fn row_type(&mut self, items: &Schema) -> RecordType {
        match self.to_type(items) {
            FormulaType::Record(row) => row,
            FormulaType::Untyped => RecordType::new(),
            scalar => RecordType::new().add("Value", scalar),
        }
    }

    fn merge_all_of(&mut self, schema: &Schema) -> FormulaType {
        let mut fields: Vec<(String, FormulaType)> = Vec::new();
        let own = Schema {
            all_of: Vec::new(),
            ..schema.clone()
        };
        let parts = schema.all_of.iter().chain(std::iter::once(&own));

        for part in parts {
            if let FormulaType::Record(record) = self.to_type(part) {
                fields.extend(record.fields().map(|(k, v)| (k.to_string(), v.clone())));
            }
        }

        FormulaType::Record(fields.into_iter().collect())
    }
}

/// Whether a type names enough structure to be used without sampling
fn is_fully_specified(ty: &FormulaType) -> bool {
    match ty {
        FormulaType::Untyped => false,
        FormulaType::Record(record) | FormulaType::Table(record) => !record.is_empty(),
        _ => true,
    }
}
