//! Turning a call's arguments into an [`HttpRequest`]

use serde_json::{Map, Value as JsonValue};
use url::Url;

use super::descriptor::{FunctionDescriptor, Placement, SlotSource};
use crate::capabilities::HttpRequest;
use crate::error::{ConnectorError, Result};
use crate::values::Val;

/// Only the path and query of this URL are ever used
const PLACEHOLDER_ORIGIN: &str = "http://connector.invalid/";

/// Validate `args` against the descriptor's parameters.
///
/// Optional trailing arguments may be omitted; a `Null` argument is accepted
/// for any type and means "not supplied".
pub(crate) fn check_args(desc: &FunctionDescriptor, args: &[Val]) -> Result<()> {
    let min = desc.required_count();
    let max = desc.params().len();
    if args.len() < min || args.len() > max {
        return Err(ConnectorError::invalid_argument(format!(
            "{} expects {} to {} arguments, got {}",
            desc.qualified_name(),
            min,
            max,
            args.len()
        )));
    }

    for (param, arg) in desc.params().iter().zip(args) {
        if param.required && arg.is_null() {
            return Err(ConnectorError::invalid_argument(format!(
                "{}: required parameter '{}' is blank",
                desc.qualified_name(),
                param.name
            )));
        }
        if !param.ty.accepts(arg) {
            return Err(ConnectorError::invalid_argument(format!(
                "{}: parameter '{}' expects {}, got {}",
                desc.qualified_name(),
                param.name,
                param.ty,
                arg.kind_name()
            )));
        }
    }

    Ok(())
}

/// Build the request for a call; arguments are checked first
pub(crate) fn build_request(desc: &FunctionDescriptor, args: &[Val]) -> Result<HttpRequest> {
    check_args(desc, args)?;

    let op = desc.operation();
    let mut path_values: Vec<(&str, String)> = Vec::new();
    let mut query: Vec<(&str, String)> = Vec::new();
    let mut headers = Vec::new();
    let mut body: Option<JsonValue> = None;
    let mut body_props = Map::new();

    for slot in &op.slots {
        let value = match &slot.source {
            SlotSource::Argument(index) => args.get(*index).unwrap_or(&Val::Null),
            SlotSource::Global(value) | SlotSource::Default(value) => value,
        };

        match slot.placement {
            Placement::Path => {
                if value.is_null() {
                    return Err(ConnectorError::invalid_argument(format!(
                        "{}: no value for path parameter '{}'",
                        desc.qualified_name(),
                        slot.name
                    )));
                }
                path_values.push((slot.name.as_str(), scalar_text(desc, &slot.name, value)?));
            }
            Placement::Query if !value.is_null() => {
                query.push((slot.name.as_str(), scalar_text(desc, &slot.name, value)?));
            }
            Placement::Header if !value.is_null() => {
                headers.push((slot.name.clone(), scalar_text(desc, &slot.name, value)?));
            }
            Placement::Body if !value.is_null() => body = Some(value.to_json()),
            Placement::BodyProperty if !value.is_null() => {
                body_props.insert(slot.name.clone(), value.to_json());
            }
            _ => {}
        }
    }

    let has_body_props = op
        .slots
        .iter()
        .any(|s| s.placement == Placement::BodyProperty);
    if body.is_none() && has_body_props {
        body = Some(JsonValue::Object(body_props));
    }

    Ok(HttpRequest {
        method: op.method,
        path_and_query: render_path(&op.base_path, &op.path, &path_values, &query)?,
        headers,
        body,
    })
}

fn scalar_text(desc: &FunctionDescriptor, name: &str, value: &Val) -> Result<String> {
    value.to_text().ok_or_else(|| {
        ConnectorError::invalid_argument(format!(
            "{}: parameter '{}' cannot be sent as text ({})",
            desc.qualified_name(),
            name,
            value.kind_name()
        ))
    })
}

/// Expand the path template and append the query, percent-encoding both
fn render_path(
    base_path: &str,
    template: &str,
    values: &[(&str, String)],
    query: &[(&str, String)],
) -> Result<String> {
    let mut url = Url::parse(PLACEHOLDER_ORIGIN)
        .map_err(|e| ConnectorError::invalid_argument(e.to_string()))?;

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ConnectorError::invalid_argument("URL cannot carry a path"))?;
        segments.clear();
        for segment in base_path.split('/').filter(|s| !s.is_empty()) {
            segments.push(segment);
        }
        for segment in template.split('/').filter(|s| !s.is_empty()) {
            segments.push(&fill_segment(segment, values));
        }
    }

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }

    let mut rendered = url.path().to_string();
    if let Some(q) = url.query() {
        rendered.push('?');
        rendered.push_str(q);
    }
    Ok(rendered)
}

/// Replace every `{name}` in one segment; unknown placeholders are kept as-is.
///
/// Only the template is scanned, so substituted values are never expanded again.
fn fill_segment(segment: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = &rest[open + 1..close];
        match values.iter().find(|(n, _)| *n == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..=close]),
        }
        rest = &rest[close + 1..];
    }

    out.push_str(rest);
    out
}
