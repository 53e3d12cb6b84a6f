//! Runtime value types

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runtime value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Dec(Decimal),
    Str(String),
    DateTime(DateTime<FixedOffset>),
    /// Record: named fields
    Obj(BTreeMap<String, Val>),
    /// Table: ordered rows (usually records)
    List(Vec<Val>),
}

impl Val {
    /// Name of the value's kind, for messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Val::Null => "Blank",
            Val::Bool(_) => "Boolean",
            Val::Num(_) => "Number",
            Val::Dec(_) => "Decimal",
            Val::Str(_) => "Text",
            Val::DateTime(_) => "DateTime",
            Val::Obj(_) => "Record",
            Val::List(_) => "Table",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<&BTreeMap<String, Val>> {
        match self {
            Val::Obj(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Val]> {
        match self {
            Val::List(rows) => Some(rows),
            _ => None,
        }
    }

    /// Render a scalar the way it appears in a URL path, query or header
    pub fn to_text(&self) -> Option<String> {
        match self {
            Val::Null => Some(String::new()),
            Val::Bool(b) => Some(b.to_string()),
            Val::Num(n) => Some(format_number(*n)),
            Val::Dec(d) => Some(d.normalize().to_string()),
            Val::Str(s) => Some(s.clone()),
            Val::DateTime(dt) => Some(dt.to_rfc3339()),
            Val::Obj(_) | Val::List(_) => None,
        }
    }

    /// Convert to JSON for a request body
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as JsonValue;

        match self {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(*b),
            Val::Num(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Val::Dec(d) => serde_json::from_str(&d.normalize().to_string())
                .unwrap_or_else(|_| JsonValue::String(d.to_string())),
            Val::Str(s) => JsonValue::String(s.clone()),
            Val::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            Val::Obj(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Val::List(rows) => JsonValue::Array(rows.iter().map(Val::to_json).collect()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<i64> for Val {
    fn from(n: i64) -> Self {
        Val::Num(n as f64)
    }
}

impl From<Decimal> for Val {
    fn from(d: Decimal) -> Self {
        Val::Dec(d)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s)
    }
}

impl From<DateTime<FixedOffset>> for Val {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Val::DateTime(dt)
    }
}
