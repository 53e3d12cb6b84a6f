//! Connector runtime contexts

use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;

use super::{CapabilityProvider, HttpInvoker};

/// What a connector call needs from its host: a transport per namespace and
/// the time zone used to interpret date-times.
pub trait ConnectorContext: Send + Sync {
    fn time_zone(&self) -> FixedOffset;

    fn invoker(&self, namespace: &str) -> Option<Arc<dyn HttpInvoker>>;
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Short-lived context for schema discovery: one invoker for every
/// namespace, always UTC.
pub struct TempConnectorContext {
    invoker: Arc<dyn HttpInvoker>,
}

impl TempConnectorContext {
    pub fn new(invoker: Arc<dyn HttpInvoker>) -> Self {
        Self { invoker }
    }
}

impl ConnectorContext for TempConnectorContext {
    fn time_zone(&self) -> FixedOffset {
        utc()
    }

    fn invoker(&self, _namespace: &str) -> Option<Arc<dyn HttpInvoker>> {
        Some(self.invoker.clone())
    }
}

/// Context answering from a capability provider: namespace invoker, then the
/// default invoker; the registered time zone, else UTC.
pub struct ProviderConnectorContext {
    provider: Arc<CapabilityProvider>,
}

impl ProviderConnectorContext {
    pub fn new(provider: Arc<CapabilityProvider>) -> Self {
        Self { provider }
    }
}

impl ConnectorContext for ProviderConnectorContext {
    fn time_zone(&self) -> FixedOffset {
        self.provider.time_zone().unwrap_or_else(utc)
    }

    fn invoker(&self, namespace: &str) -> Option<Arc<dyn HttpInvoker>> {
        self.provider.invoker(namespace)
    }
}
