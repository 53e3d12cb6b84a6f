//! Function namespace
//!
//! The registry owned by one engine instance. Functions are keyed by
//! qualified name and kept in registration order; adding a function whose
//! name is already taken replaces it in place.

use std::collections::HashMap;
use std::sync::Arc;

use crate::diagnostics::{messages, Diagnostic, SyntaxNode};
use crate::error::{ConnectorError, Result};
use crate::functions::{self, AsyncFunction, CallArg};
use crate::invoke::InvocationContext;
use crate::values::Val;

#[derive(Default)]
pub struct FunctionRegistry {
    functions: Vec<Arc<dyn AsyncFunction>>,
    index: HashMap<String, usize>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function`, returning the one it replaced
    pub fn add_function(&mut self, function: Arc<dyn AsyncFunction>) -> Option<Arc<dyn AsyncFunction>> {
        let name = function.qualified_name().to_string();
        match self.index.get(&name) {
            Some(&slot) => Some(std::mem::replace(&mut self.functions[slot], function)),
            None => {
                self.index.insert(name, self.functions.len());
                self.functions.push(function);
                None
            }
        }
    }

    pub fn get(&self, qualified_name: &str) -> Option<&Arc<dyn AsyncFunction>> {
        self.index.get(qualified_name).map(|&slot| &self.functions[slot])
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.index.contains_key(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Functions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AsyncFunction>> {
        self.functions.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.qualified_name()).collect()
    }

    /// Check a call site against the named function's signature
    pub fn check_call(
        &self,
        qualified_name: &str,
        call: &dyn SyntaxNode,
        args: &[CallArg<'_>],
    ) -> Vec<Diagnostic> {
        match self.get(qualified_name) {
            Some(function) => functions::check_call(&**function, call, args),
            None => vec![Diagnostic::error(
                call,
                messages::ERR_UNKNOWN_FUNCTION,
                vec![qualified_name.to_string()],
            )],
        }
    }

    /// Look up and call a function
    pub async fn invoke(&self, qualified_name: &str, ctx: &InvocationContext, args: Vec<Val>) -> Result<Val> {
        let function = self.get(qualified_name).ok_or_else(|| {
            ConnectorError::invalid_argument(format!("unknown function '{}'", qualified_name))
        })?;
        function.invoke(ctx, args).await
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Severity, Span, Token};
    use crate::functions::ParamDescriptor;
    use crate::types::{FormulaType, ReturnType};
    use async_trait::async_trait;

    struct Constant {
        name: &'static str,
        value: f64,
        params: Vec<ParamDescriptor>,
        ret: ReturnType,
    }

    impl Constant {
        fn new(name: &'static str, value: f64) -> Arc<Self> {
            Arc::new(Self {
                name,
                value,
                params: vec![ParamDescriptor {
                    name: "x".into(),
                    ty: FormulaType::Number,
                    required: true,
                    description: None,
                }],
                ret: ReturnType::Resolved(FormulaType::Number),
            })
        }
    }

    #[async_trait]
    impl AsyncFunction for Constant {
        fn qualified_name(&self) -> &str {
            self.name
        }

        fn params(&self) -> &[ParamDescriptor] {
            &self.params
        }

        fn return_type(&self) -> &ReturnType {
            &self.ret
        }

        async fn invoke(&self, _ctx: &InvocationContext, _args: Vec<Val>) -> Result<Val> {
            Ok(Val::Num(self.value))
        }
    }

    struct Ident(Token);

    impl SyntaxNode for Ident {
        fn token(&self) -> &Token {
            &self.0
        }

        fn render(&self) -> String {
            self.0.text.clone()
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new(Arc::default())
    }

    #[tokio::test]
    async fn test_add_function_overwrites_in_place() {
        let mut registry = FunctionRegistry::new();
        assert!(registry.add_function(Constant::new("A.one", 1.0)).is_none());
        registry.add_function(Constant::new("A.two", 2.0));
        let replaced = registry.add_function(Constant::new("A.one", 10.0));

        assert!(replaced.is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["A.one", "A.two"]);
        assert_eq!(
            registry.invoke("A.one", &ctx(), vec![Val::Num(0.0)]).await.unwrap(),
            Val::Num(10.0)
        );
    }

    #[tokio::test]
    async fn test_invoke_unknown_function() {
        let registry = FunctionRegistry::new();
        let err = registry.invoke("Nope.x", &ctx(), vec![]).await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidArgument(_)));
    }

    #[test]
    fn test_check_call_unknown_function() {
        let registry = FunctionRegistry::new();
        let call = Ident(Token::new("Nope.x", Span::new(4, 10)));

        let diagnostics = registry.check_call("Nope.x", &call, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].key(), messages::ERR_UNKNOWN_FUNCTION);
        assert_eq!(
            diagnostics[0].to_string(),
            "[4,10] Nope.x : 'Nope.x' is an unknown or unsupported function."
        );
    }

    #[test]
    fn test_check_call_reports_at_argument() {
        let mut registry = FunctionRegistry::new();
        registry.add_function(Constant::new("A.one", 1.0));
        let call = Ident(Token::new("A.one", Span::new(0, 5)));
        let arg = Ident(Token::new("\"x\"", Span::new(6, 9)));

        let diagnostics = registry.check_call("A.one", &call, &[CallArg::new(&arg, FormulaType::Text)]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity(), Severity::Error);
        assert_eq!(diagnostics[0].text_span(), Span::new(6, 9));
        assert_eq!(diagnostics[0].args(), ["Number".to_string(), "Text".to_string()]);
    }
}
