//! Message keys and their default (English) templates
//!
//! Templates use positional placeholders `{0}`, `{1}`, ... filled from the
//! diagnostic's arguments. Localized catalogs are loaded by the host; this
//! table is what renders when nothing else is supplied.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a message template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKey(pub &'static str);

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub const ERR_BAD_ARITY: MessageKey = MessageKey("ErrBadArity_Min_Max");
pub const ERR_BAD_TYPE: MessageKey = MessageKey("ErrBadType_ExpectedType_ProvidedType");
pub const ERR_UNKNOWN_FUNCTION: MessageKey = MessageKey("ErrUnknownFunction_Name");
pub const ERR_PENDING_RETURN_TYPE: MessageKey = MessageKey("ErrPendingReturnType_Name");
pub const ERR_AMBIGUOUS_ITEM_FETCH: MessageKey = MessageKey("ErrAmbiguousItemFetch_Names");

/// Default template for a key, if one is known
pub fn template(key: MessageKey) -> Option<&'static str> {
    let text = match key.0 {
        "ErrBadArity_Min_Max" => "Invalid number of arguments: received {0}, expected {1} to {2}.",
        "ErrBadType_ExpectedType_ProvidedType" => {
            "Invalid argument type. Expecting a {0} value, but received a {1} value."
        }
        "ErrUnknownFunction_Name" => "'{0}' is an unknown or unsupported function.",
        "ErrPendingReturnType_Name" => {
            "The result type of '{0}' is not known until the connector is queried."
        }
        "ErrAmbiguousItemFetch_Names" => "More than one item-fetch operation matched: {0}.",
        _ => return None,
    };
    Some(text)
}

/// Render `key` with `args`; unknown keys render as the key followed by its arguments
pub fn render(key: MessageKey, args: &[String]) -> String {
    match template(key) {
        Some(text) => substitute(text, args),
        None if args.is_empty() => key.0.to_string(),
        None => format!("{} ({})", key.0, args.join(", ")),
    }
}

fn substitute(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => match after[..close].parse::<usize>() {
                Ok(index) => {
                    out.push_str(args.get(index).map(String::as_str).unwrap_or(""));
                    rest = &after[close + 1..];
                }
                Err(_) => {
                    out.push('{');
                    rest = after;
                }
            },
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
