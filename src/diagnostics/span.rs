//! Source locations consumed from the expression front end

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open character range `[min, lim)` into a source text.
///
/// `base_index` is the offset of the text the span was computed against,
/// non-zero when an expression is embedded in a larger document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub min: usize,
    pub lim: usize,
    #[serde(default)]
    pub base_index: usize,
}

impl Span {
    pub fn new(min: usize, lim: usize) -> Self {
        Self {
            min,
            lim,
            base_index: 0,
        }
    }

    pub fn with_base(min: usize, lim: usize, base_index: usize) -> Self {
        Self {
            min,
            lim,
            base_index,
        }
    }

    pub fn len(&self) -> usize {
        self.lim.saturating_sub(self.min)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a span that covers both self and other
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            min: self.min.min(other.min),
            lim: self.lim.max(other.lim),
            base_index: self.base_index,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.min, self.lim)
    }
}

/// A lexical token: its source text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }

    /// Same token text, re-anchored at `span`
    pub fn with_span(&self, span: Span) -> Token {
        Token {
            text: self.text.clone(),
            span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// An AST node as seen by this crate.
///
/// The parser lives elsewhere; all we need is the node's primary token, the
/// full extent it covers, and a textual rendering for error messages.
pub trait SyntaxNode {
    /// The token the node was built around (operator, identifier, ...)
    fn token(&self) -> &Token;

    /// Source range covered by the whole node
    fn text_span(&self) -> Span {
        self.token().span
    }

    /// Textual form used when formatting diagnostics
    fn render(&self) -> String;
}
