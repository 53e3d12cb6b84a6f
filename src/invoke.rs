//! Async invocation engine
//!
//! Runs one bound call: build the request, hand it to the namespace's
//! invoker, convert the response. The only suspension point is the
//! transport call, which is raced against the cancellation token. A
//! cancelled call yields [`ConnectorError::Cancelled`] and nothing else;
//! nothing here retries.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capabilities::{
    CapabilityProvider, ConnectorContext, HttpResponse, ProviderConnectorContext, TransportError,
};
use crate::error::{ConnectorError, Result};
use crate::functions::{request, response, FunctionDescriptor};
use crate::values::Val;

/// Longest slice of an error body quoted in a transport failure
const ERROR_BODY_PREVIEW: usize = 256;

/// What a registered function receives when called
#[derive(Clone)]
pub struct InvocationContext {
    services: Arc<CapabilityProvider>,
    cancel: CancellationToken,
}

impl InvocationContext {
    pub fn new(services: Arc<CapabilityProvider>) -> Self {
        Self {
            services,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn services(&self) -> &Arc<CapabilityProvider> {
        &self.services
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The registered connector context, else one reading the provider directly
    pub fn connector_context(&self) -> Arc<dyn ConnectorContext> {
        self.services
            .connector_context()
            .unwrap_or_else(|| Arc::new(ProviderConnectorContext::new(self.services.clone())))
    }
}

/// Call `desc` with `args` and convert the result to a runtime value
pub async fn invoke(
    desc: &FunctionDescriptor,
    ctx: &dyn ConnectorContext,
    args: &[Val],
    cancel: &CancellationToken,
) -> Result<Val> {
    let response = send(desc, ctx, args, cancel).await?;
    Ok(response::convert_body(
        &response.body,
        desc.return_type(),
        desc.settings(),
        ctx.time_zone(),
    ))
}

/// Call `desc` and return the raw success response.
///
/// Non-2xx statuses become [`ConnectorError::TransportFailure`].
pub async fn send(
    desc: &FunctionDescriptor,
    ctx: &dyn ConnectorContext,
    args: &[Val],
    cancel: &CancellationToken,
) -> Result<HttpResponse> {
    let request = request::build_request(desc, args)?;
    let invoker = ctx.invoker(desc.namespace()).ok_or_else(|| {
        ConnectorError::invalid_argument(format!(
            "no invoker registered for namespace '{}'",
            desc.namespace()
        ))
    })?;

    if cancel.is_cancelled() {
        info!(function = %desc.qualified_name(), "call cancelled before sending");
        return Err(ConnectorError::Cancelled);
    }

    debug!(
        function = %desc.qualified_name(),
        method = %request.method,
        path = %request.path_and_query,
        "sending request"
    );

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(function = %desc.qualified_name(), "call cancelled in flight");
            return Err(ConnectorError::Cancelled);
        }
        outcome = invoker.send(request, cancel) => outcome,
    };

    match outcome {
        Err(TransportError::Cancelled) => Err(ConnectorError::Cancelled),
        Err(TransportError::Failed(message)) => Err(ConnectorError::transport(None, message)),
        Ok(response) if !response.is_success() => {
            let body = String::from_utf8_lossy(&response.body);
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            debug!(function = %desc.qualified_name(), status = response.status, "request failed");
            Err(ConnectorError::transport(
                Some(response.status),
                format!("{} returned {}: {}", desc.qualified_name(), response.status, preview),
            ))
        }
        Ok(response) => {
            debug!(
                function = %desc.qualified_name(),
                status = response.status,
                bytes = response.body.len(),
                "request completed"
            );
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{HttpMethod, TempConnectorContext};
    use crate::config::FunctionSettings;
    use crate::functions::{OperationMeta, ParamDescriptor, Placement, Slot, SlotSource};
    use crate::testing::ScriptedInvoker;
    use crate::types::{FormulaType, RecordType, ReturnType};
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready};

    fn list_items(return_type: ReturnType) -> FunctionDescriptor {
        FunctionDescriptor {
            namespace: "Crm".into(),
            name: "ListItems".into(),
            qualified_name: "Crm.ListItems".into(),
            description: None,
            deprecated: false,
            params: vec![ParamDescriptor {
                name: "top".into(),
                ty: FormulaType::Number,
                required: false,
                description: None,
            }],
            return_type,
            operation: OperationMeta {
                operation_id: "ListItems".into(),
                method: HttpMethod::Get,
                base_path: "/api".into(),
                path: "/items".into(),
                slots: vec![Slot {
                    name: "$top".into(),
                    placement: Placement::Query,
                    source: SlotSource::Argument(0),
                }],
            },
            settings: Arc::new(FunctionSettings::new("Crm").with_max_rows(2)),
            globals: Arc::default(),
        }
    }

    fn rows() -> ReturnType {
        ReturnType::Resolved(FormulaType::Table(
            RecordType::new().add("id", FormulaType::Number),
        ))
    }

    #[tokio::test]
    async fn test_invoke_converts_and_truncates() {
        let invoker = ScriptedInvoker::new()
            .json(json!({ "value": [{ "id": 1 }, { "id": 2 }, { "id": 3 }] }))
            .shared();
        let ctx = TempConnectorContext::new(invoker.clone());

        let val = invoke(&list_items(rows()), &ctx, &[Val::from(5i64)], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(val.as_list().map(<[Val]>::len), Some(2));
        let sent = invoker.requests();
        assert_eq!(sent[0].path_and_query, "/api/items?%24top=5");
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_failure() {
        let invoker = ScriptedInvoker::new().status(503, "busy").shared();
        let ctx = TempConnectorContext::new(invoker);

        let err = invoke(&list_items(rows()), &ctx, &[], &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ConnectorError::TransportFailure { status, message } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("busy"));
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_sending() {
        let invoker = ScriptedInvoker::new().json(json!([])).shared();
        let ctx = TempConnectorContext::new(invoker.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = invoke(&list_items(rows()), &ctx, &[], &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(invoker.requests().is_empty());
    }

    #[test]
    fn test_cancelled_while_in_flight() {
        let invoker = ScriptedInvoker::new().hang().shared();
        let ctx = TempConnectorContext::new(invoker.clone());
        let desc = list_items(rows());
        let cancel = CancellationToken::new();

        let mut call = tokio_test::task::spawn(invoke(&desc, &ctx, &[], &cancel));
        assert_pending!(call.poll());
        assert_eq!(invoker.requests().len(), 1);

        cancel.cancel();
        assert!(call.is_woken());
        let result = assert_ready!(call.poll());
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_transport_error() {
        let invoker = ScriptedInvoker::new()
            .reply(crate::testing::Reply::Fail("connection refused".into()))
            .shared();
        let ctx = TempConnectorContext::new(invoker);

        let err = invoke(&list_items(rows()), &ctx, &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::TransportFailure { status: None, .. }));
    }

    #[tokio::test]
    async fn test_missing_invoker_is_invalid_argument() {
        let ctx = ProviderConnectorContext::new(Arc::new(CapabilityProvider::new()));

        let err = invoke(&list_items(rows()), &ctx, &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_invocation_context_uses_registered_connector_context() {
        let invoker = ScriptedInvoker::new().json(json!([{ "id": 7 }])).shared();
        let mut provider = CapabilityProvider::new();
        provider.add_runtime_context(Arc::new(TempConnectorContext::new(invoker.clone())));
        let ctx = InvocationContext::new(Arc::new(provider));

        let connector = ctx.connector_context();
        let val = invoke(&list_items(rows()), connector.as_ref(), &[], ctx.cancel())
            .await
            .unwrap();

        assert_eq!(val.as_list().map(<[Val]>::len), Some(1));
        assert_eq!(invoker.requests().len(), 1);
    }
}
