//! Resolved types
//!
//! [`FormulaType`] is the structured type a connector function accepts or
//! returns: primitives, records of named fields, and tables of records.
//! Types come either straight from the API document or from inference over a
//! sample response (see [`FormulaType::infer`]).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::NumberPolicy;
use crate::openapi::DynamicSchemaRef;
use crate::values::Val;

/// A structured type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum FormulaType {
    Blank,
    Boolean,
    Number,
    Decimal,
    Text,
    DateTime,
    Record(RecordType),
    Table(RecordType),
    /// Shape not described; values pass through as inferred from JSON
    Untyped,
}

/// Named, typed fields, ordered by name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordType {
    fields: BTreeMap<String, FormulaType>,
}

impl RecordType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, name: impl Into<String>, ty: FormulaType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FormulaType> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FormulaType)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FormulaType)> for RecordType {
    fn from_iter<T: IntoIterator<Item = (String, FormulaType)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl FormulaType {
    /// The number type selected by a policy
    pub fn number(policy: NumberPolicy) -> FormulaType {
        match policy {
            NumberPolicy::Float => FormulaType::Number,
            NumberPolicy::Decimal => FormulaType::Decimal,
        }
    }

    pub fn as_record(&self) -> Option<&RecordType> {
        match self {
            FormulaType::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Infer a type from a sample JSON value.
    ///
    /// Arrays become tables whose row type merges the fields of every
    /// object element; scalars inside an array are wrapped as a `Value`
    /// column.
    pub fn infer(json: &JsonValue, policy: NumberPolicy) -> FormulaType {
        match json {
            JsonValue::Null => FormulaType::Blank,
            JsonValue::Bool(_) => FormulaType::Boolean,
            JsonValue::Number(_) => FormulaType::number(policy),
            JsonValue::String(_) => FormulaType::Text,
            JsonValue::Object(map) => FormulaType::Record(
                map.iter()
                    .map(|(k, v)| (k.clone(), FormulaType::infer(v, policy)))
                    .collect(),
            ),
            JsonValue::Array(items) => {
                let mut fields = BTreeMap::new();
                for item in items {
                    match FormulaType::infer(item, policy) {
                        FormulaType::Record(row) => {
                            for (name, ty) in row.fields {
                                let slot = fields.entry(name).or_insert(FormulaType::Blank);
                                if *slot == FormulaType::Blank {
                                    *slot = ty;
                                }
                            }
                        }
                        FormulaType::Blank => {}
                        scalar => {
                            fields.entry("Value".to_string()).or_insert(scalar);
                        }
                    }
                }
                FormulaType::Table(RecordType { fields })
            }
        }
    }

    /// Whether a runtime value is acceptable where this type is expected
    pub fn accepts(&self, val: &Val) -> bool {
        match (self, val) {
            (_, Val::Null) | (FormulaType::Untyped, _) => true,
            (FormulaType::Boolean, Val::Bool(_)) => true,
            (FormulaType::Number | FormulaType::Decimal, Val::Num(_) | Val::Dec(_)) => true,
            (FormulaType::Text, Val::Str(_)) => true,
            (FormulaType::DateTime, Val::DateTime(_) | Val::Str(_)) => true,
            (FormulaType::Record(record), Val::Obj(map)) => map.iter().all(|(name, v)| {
                record.get(name).map(|ty| ty.accepts(v)).unwrap_or(true)
            }),
            (FormulaType::Table(row), Val::List(rows)) => {
                let row = FormulaType::Record(row.clone());
                rows.iter().all(|r| row.accepts(r))
            }
            _ => false,
        }
    }

    /// Whether an argument of type `other` can be passed where `self` is expected
    pub fn accepts_type(&self, other: &FormulaType) -> bool {
        match (self, other) {
            (_, FormulaType::Blank) | (FormulaType::Untyped, _) | (_, FormulaType::Untyped) => true,
            (FormulaType::Number | FormulaType::Decimal, FormulaType::Number | FormulaType::Decimal) => {
                true
            }
            (FormulaType::DateTime, FormulaType::Text) => true,
            (FormulaType::Record(expected), FormulaType::Record(provided))
            | (FormulaType::Table(expected), FormulaType::Table(provided)) => {
                provided.fields().all(|(name, ty)| {
                    expected.get(name).map(|e| e.accepts_type(ty)).unwrap_or(true)
                })
            }
            (a, b) => a == b,
        }
    }
}

/// A function's result type, possibly not known until the connector is asked
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnType {
    Resolved(FormulaType),
    Pending(PendingReturn),
}

/// How a pending result type gets resolved
#[derive(Debug, Clone, PartialEq)]
pub enum PendingReturn {
    /// Ask another operation for the schema
    Dynamic(DynamicSchemaRef),
    /// Call the operation itself and infer from the response
    Sample,
}

impl ReturnType {
    pub fn resolved(&self) -> Option<&FormulaType> {
        match self {
            ReturnType::Resolved(ty) => Some(ty),
            ReturnType::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ReturnType::Pending(_))
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Resolved(ty) => write!(f, "{}", ty),
            ReturnType::Pending(_) => write!(f, "?"),
        }
    }
}

impl fmt::Display for FormulaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaType::Blank => write!(f, "Blank"),
            FormulaType::Boolean => write!(f, "Boolean"),
            FormulaType::Number => write!(f, "Number"),
            FormulaType::Decimal => write!(f, "Decimal"),
            FormulaType::Text => write!(f, "Text"),
            FormulaType::DateTime => write!(f, "DateTime"),
            FormulaType::Untyped => write!(f, "Untyped"),
            FormulaType::Record(record) => write!(f, "{}", RecordDisplay("!", record)),
            FormulaType::Table(record) => write!(f, "{}", RecordDisplay("*", record)),
        }
    }
}

/// `![a:Number, b:Text]` for records, `*[...]` for tables
struct RecordDisplay<'a>(&'static str, &'a RecordType);

impl fmt::Display for RecordDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.0)?;
        for (i, (name, ty)) in self.1.fields().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", name, ty)?;
        }
        write!(f, "]")
    }
}
