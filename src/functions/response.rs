//! JSON responses to runtime values

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value as JsonValue};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

use crate::config::{FunctionSettings, NumberPolicy};
use crate::types::{FormulaType, ReturnType};
use crate::values::Val;

/// Convert a success response body.
///
/// An empty body is `Null` and a body that is not JSON comes back as text.
/// Table results are cut to the settings' `max_rows`.
pub(crate) fn convert_body(
    body: &[u8],
    return_type: &ReturnType,
    settings: &FunctionSettings,
    tz: FixedOffset,
) -> Val {
    let text = String::from_utf8_lossy(body);
    if text.trim().is_empty() {
        return Val::Null;
    }

    let json: JsonValue = match serde_json::from_str(&text) {
        Ok(json) => json,
        Err(_) => return Val::Str(text.into_owned()),
    };

    let converter = Converter {
        policy: settings.number_policy(),
        tz,
    };
    match converter.to_val(&json, return_type.resolved()) {
        Val::List(mut rows) => {
            if rows.len() > settings.max_rows() {
                warn!(
                    rows = rows.len(),
                    max_rows = settings.max_rows(),
                    "truncating table result"
                );
                rows.truncate(settings.max_rows());
            }
            Val::List(rows)
        }
        other => other,
    }
}

/// Convert a JSON literal (parameter defaults, dynamic-schema literals)
pub(crate) fn literal(json: &JsonValue, policy: NumberPolicy) -> Val {
    Converter {
        policy,
        tz: Utc.fix(),
    }
    .to_val(json, None)
}

struct Converter {
    policy: NumberPolicy,
    tz: FixedOffset,
}

impl Converter {
    /// Type-directed where a type is known, shape-directed otherwise
    fn to_val(&self, json: &JsonValue, ty: Option<&FormulaType>) -> Val {
        match json {
            JsonValue::Null => Val::Null,
            JsonValue::Bool(b) => Val::Bool(*b),
            JsonValue::Number(n) => self.number(n, ty),
            JsonValue::String(s) => match ty {
                Some(FormulaType::DateTime) => self
                    .date_time(s)
                    .map(Val::DateTime)
                    .unwrap_or_else(|| Val::Str(s.clone())),
                _ => Val::Str(s.clone()),
            },
            JsonValue::Array(items) => {
                let row_ty = match ty {
                    Some(FormulaType::Table(row)) => Some(FormulaType::Record(row.clone())),
                    _ => None,
                };
                Val::List(
                    items
                        .iter()
                        .map(|item| self.row(item, row_ty.as_ref()))
                        .collect(),
                )
            }
            JsonValue::Object(map) => {
                // Collection endpoints wrap their rows as `{ "value": [...] }`
                if let (Some(FormulaType::Table(_)), Some(rows @ JsonValue::Array(_))) =
                    (ty, map.get("value"))
                {
                    return self.to_val(rows, ty);
                }

                let record = ty.and_then(FormulaType::as_record);
                Val::Obj(
                    map.iter()
                        .map(|(name, value)| {
                            let field_ty = record.and_then(|r| r.get(name));
                            (name.clone(), self.to_val(value, field_ty))
                        })
                        .collect(),
                )
            }
        }
    }

    /// Table rows are records; scalars are wrapped in a `Value` column
    fn row(&self, item: &JsonValue, row_ty: Option<&FormulaType>) -> Val {
        match item {
            JsonValue::Object(_) | JsonValue::Null => self.to_val(item, row_ty),
            scalar => {
                let value_ty = row_ty
                    .and_then(FormulaType::as_record)
                    .and_then(|r| r.get("Value"));
                let mut row = BTreeMap::new();
                row.insert("Value".to_string(), self.to_val(scalar, value_ty));
                Val::Obj(row)
            }
        }
    }

    fn number(&self, n: &Number, ty: Option<&FormulaType>) -> Val {
        let policy = match ty {
            Some(FormulaType::Decimal) => NumberPolicy::Decimal,
            Some(FormulaType::Number) => NumberPolicy::Float,
            _ => self.policy,
        };

        let float = n.as_f64().unwrap_or(f64::NAN);
        match policy {
            NumberPolicy::Float => Val::Num(float),
            NumberPolicy::Decimal => Decimal::from_str(&n.to_string())
                .ok()
                .or_else(|| Decimal::from_f64(float))
                .map(Val::Dec)
                .unwrap_or(Val::Num(float)),
        }
    }

    /// RFC 3339, then zone-less date-times and plain dates (taken as UTC),
    /// shifted into the context time zone
    fn date_time(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&self.tz));
        }

        let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;
        Some(Utc.from_utc_datetime(&naive).with_timezone(&self.tz))
    }
}
