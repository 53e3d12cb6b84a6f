//! Static argument checks for a call site

use super::AsyncFunction;
use crate::diagnostics::{messages, Diagnostic, SyntaxNode};
use crate::types::FormulaType;

/// One argument at a call site: its node and the type the binder gave it
pub struct CallArg<'a> {
    pub node: &'a dyn SyntaxNode,
    pub ty: FormulaType,
}

impl<'a> CallArg<'a> {
    pub fn new(node: &'a dyn SyntaxNode, ty: FormulaType) -> Self {
        Self { node, ty }
    }
}

/// Check a call against a function's signature.
///
/// Arity problems are reported at the call node, type problems at the
/// offending argument. A result type that is still pending is a warning:
/// the call is fine, but nothing downstream can be checked against it.
pub fn check_call(function: &dyn AsyncFunction, call: &dyn SyntaxNode, args: &[CallArg<'_>]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let params = function.params();
    let min = params.iter().filter(|p| p.required).count();
    let max = params.len();

    if args.len() < min || args.len() > max {
        diagnostics.push(Diagnostic::error(
            call,
            messages::ERR_BAD_ARITY,
            vec![args.len().to_string(), min.to_string(), max.to_string()],
        ));
    }

    for (param, arg) in params.iter().zip(args) {
        if !param.ty.accepts_type(&arg.ty) {
            diagnostics.push(Diagnostic::error(
                arg.node,
                messages::ERR_BAD_TYPE,
                vec![param.ty.to_string(), arg.ty.to_string()],
            ));
        }
    }

    if function.return_type().is_pending() {
        diagnostics.push(Diagnostic::warning(
            call,
            messages::ERR_PENDING_RETURN_TYPE,
            vec![function.qualified_name().to_string()],
        ));
    }

    diagnostics
}
