//! Span-anchored diagnostics
//!
//! A [`Diagnostic`] records *where* a problem was found (the originating token
//! and, when available, the AST node) and *what* it is (a message key plus
//! arguments). Rendering the message is deferred to formatting time so the
//! same record can be re-anchored with [`Diagnostic::clone_at`] when a shared
//! sub-expression is reported at each of its occurrences.
//!
//! # Example
//!
//! ```
//! use rhythm_connectors::diagnostics::{messages, Diagnostic, Severity, Span, Token};
//!
//! let tok = Token::new("Foo", Span::new(0, 3));
//! let diag = Diagnostic::from_token(&tok, Severity::Error, messages::ERR_UNKNOWN_FUNCTION, vec!["Foo".into()]);
//! assert_eq!(diag.to_string(), "[0,3] Foo : 'Foo' is an unknown or unsupported function.");
//! ```

pub mod messages;
mod span;

pub use messages::MessageKey;
pub use span::{Span, SyntaxNode, Token};

use std::fmt;

/// Severity levels for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Must be fixed - the expression cannot be bound or run
    Error,
    /// Should probably be fixed
    Warning,
    /// Suggestion for improvement
    Hint,
}

/// A diagnostic produced while binding or analysing an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    severity: Severity,
    key: MessageKey,
    args: Vec<String>,
    token: Token,
    /// Rendered form of the originating node, when built from one
    node: Option<String>,
    text_span: Span,
    sink_types: Vec<String>,
}

impl Diagnostic {
    pub fn from_token(token: &Token, severity: Severity, key: MessageKey, args: Vec<String>) -> Self {
        Self {
            severity,
            key,
            args,
            token: token.clone(),
            node: None,
            text_span: token.span,
            sink_types: Vec::new(),
        }
    }

    pub fn from_node(
        node: &dyn SyntaxNode,
        severity: Severity,
        key: MessageKey,
        args: Vec<String>,
    ) -> Self {
        Self {
            severity,
            key,
            args,
            token: node.token().clone(),
            node: Some(node.render()),
            text_span: node.text_span(),
            sink_types: Vec::new(),
        }
    }

    /// Create a new error anchored at a node
    pub fn error(node: &dyn SyntaxNode, key: MessageKey, args: Vec<String>) -> Self {
        Self::from_node(node, Severity::Error, key, args)
    }

    /// Create a new warning anchored at a node
    pub fn warning(node: &dyn SyntaxNode, key: MessageKey, args: Vec<String>) -> Self {
        Self::from_node(node, Severity::Warning, key, args)
    }

    /// The same diagnostic re-reported at `span`.
    ///
    /// Key, arguments, severity and the node rendering carry over, so the
    /// formatted text changes only in its span. Sink-type tags are collected
    /// per occurrence and start out empty.
    pub fn clone_at(&self, span: Span) -> Diagnostic {
        let token = self.token.with_span(span);
        Diagnostic {
            severity: self.severity,
            key: self.key,
            args: self.args.clone(),
            text_span: token.span,
            token,
            node: self.node.clone(),
            sink_types: Vec::new(),
        }
    }

    /// Tag this diagnostic as affecting the sink `name`.
    ///
    /// # Panics
    ///
    /// If `name` was already recorded. Callers track which sinks they have
    /// visited; a repeat is a bug in the calling pass.
    pub fn mark_sink_type(&mut self, name: impl Into<String>) {
        let name = name.into();
        assert!(!name.is_empty(), "sink type name must not be empty");
        assert!(
            !self.sink_types.contains(&name),
            "sink type '{}' already recorded on this diagnostic",
            name
        );
        self.sink_types.push(name);
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn key(&self) -> MessageKey {
        self.key
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn node_text(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// Full range of the originating node (or the token when built from one)
    pub fn text_span(&self) -> Span {
        self.text_span
    }

    pub fn sink_types(&self) -> &[String] {
        &self.sink_types
    }

    /// Check if this is an error (not a warning or hint)
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    /// The rendered message without location
    pub fn message(&self) -> String {
        messages::render(self.key, &self.args)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.token.span)?;
        match &self.node {
            Some(node) => write!(f, "{}", node)?,
            None => write!(f, "{}", self.token)?,
        }
        write!(f, " : {}", self.message())
    }
}

/// Check if any diagnostic in the list is an error (not just warnings).
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
