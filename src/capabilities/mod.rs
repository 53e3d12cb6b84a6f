//! Capability lookup
//!
//! Runtime capabilities (the transport invoker for a namespace, the time
//! zone, a connector runtime context) are looked up by [`CapabilityKey`]
//! through a [`CapabilityProvider`]. Providers chain: a provider answers from
//! its own map first and otherwise asks its fallbacks in construction order.
//! A missing capability is `None`, never an error; the consumer decides
//! whether absence is fatal.
//!
//! # Usage contract
//!
//! Providers are built then frozen. Register everything while you own the
//! provider exclusively (`&mut`), then share it as `Arc<CapabilityProvider>`.
//! Shared providers are only ever read, so concurrent lookups from many
//! invocations need no locking.
//!
//! ```
//! use std::sync::Arc;
//! use chrono::FixedOffset;
//! use rhythm_connectors::capabilities::{CapabilityKey, CapabilityProvider, CapabilitySource};
//!
//! let mut base = CapabilityProvider::new();
//! base.add_time_zone(FixedOffset::east_opt(3600).unwrap());
//!
//! let parent: Arc<dyn CapabilitySource> = Arc::new(base);
//! let child = CapabilityProvider::with_fallbacks(vec![None, Some(parent)]);
//! assert!(child.lookup(&CapabilityKey::time_zone()).is_some());
//! ```

mod context;
mod invoker;

pub use context::{ConnectorContext, ProviderConnectorContext, TempConnectorContext};
pub use invoker::{HttpInvoker, HttpMethod, HttpRequest, HttpResponse, TransportError};

use chrono::FixedOffset;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConnectorError, Result};

/* ===================== Capability Keys ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    TimeZone,
    Invoker,
    ConnectorContext,
}

impl CapabilityKind {
    pub fn name(&self) -> &'static str {
        match self {
            CapabilityKind::TimeZone => "TimeZone",
            CapabilityKind::Invoker => "Invoker",
            CapabilityKind::ConnectorContext => "ConnectorContext",
        }
    }
}

/// Kind plus an optional namespace qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityKey {
    pub kind: CapabilityKind,
    pub namespace: Option<String>,
}

impl CapabilityKey {
    pub fn new(kind: CapabilityKind, namespace: Option<&str>) -> Self {
        Self {
            kind,
            namespace: namespace.map(str::to_string),
        }
    }

    pub fn time_zone() -> Self {
        Self::new(CapabilityKind::TimeZone, None)
    }

    /// Invoker for `namespace`, or the default invoker when `None`
    pub fn invoker(namespace: Option<&str>) -> Self {
        Self::new(CapabilityKind::Invoker, namespace)
    }

    pub fn connector_context() -> Self {
        Self::new(CapabilityKind::ConnectorContext, None)
    }
}

/* ===================== Capability Instances ===================== */

#[derive(Clone)]
pub enum Capability {
    TimeZone(FixedOffset),
    Invoker(Arc<dyn HttpInvoker>),
    ConnectorContext(Arc<dyn ConnectorContext>),
}

impl Capability {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::TimeZone(_) => CapabilityKind::TimeZone,
            Capability::Invoker(_) => CapabilityKind::Invoker,
            Capability::ConnectorContext(_) => CapabilityKind::ConnectorContext,
        }
    }

    pub fn as_time_zone(&self) -> Option<FixedOffset> {
        match self {
            Capability::TimeZone(tz) => Some(*tz),
            _ => None,
        }
    }

    pub fn as_invoker(&self) -> Option<Arc<dyn HttpInvoker>> {
        match self {
            Capability::Invoker(invoker) => Some(invoker.clone()),
            _ => None,
        }
    }

    pub fn as_connector_context(&self) -> Option<Arc<dyn ConnectorContext>> {
        match self {
            Capability::ConnectorContext(ctx) => Some(ctx.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::TimeZone(tz) => f.debug_tuple("TimeZone").field(tz).finish(),
            Capability::Invoker(_) => f.write_str("Invoker(..)"),
            Capability::ConnectorContext(_) => f.write_str("ConnectorContext(..)"),
        }
    }
}

/* ===================== Provider Chain ===================== */

/// Anything that can answer a capability lookup
pub trait CapabilitySource: Send + Sync {
    fn lookup(&self, key: &CapabilityKey) -> Option<Capability>;
}

/// Local capabilities plus an ordered list of fallbacks
#[derive(Default)]
pub struct CapabilityProvider {
    services: HashMap<CapabilityKey, Capability>,
    inners: Vec<Arc<dyn CapabilitySource>>,
}

impl CapabilityProvider {
    /// A provider with no capabilities and no fallbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that falls back to `inners`, in order.
    ///
    /// Missing entries are skipped; an empty or all-`None` list simply means
    /// no fallbacks.
    pub fn with_fallbacks<I>(inners: I) -> Self
    where
        I: IntoIterator<Item = Option<Arc<dyn CapabilitySource>>>,
    {
        Self {
            services: HashMap::new(),
            inners: inners.into_iter().flatten().collect(),
        }
    }

    /// Register `capability` under `key`, replacing any previous local entry.
    ///
    /// Fails with `TypeMismatch` when the instance is not of the key's kind;
    /// the existing registration is then left as it was.
    pub fn add_capability(&mut self, key: CapabilityKey, capability: Capability) -> Result<&mut Self> {
        if capability.kind() != key.kind {
            return Err(ConnectorError::TypeMismatch {
                expected: key.kind.name(),
                actual: capability.kind().name(),
            });
        }

        self.services.insert(key, capability);
        Ok(self)
    }

    pub fn add_time_zone(&mut self, tz: FixedOffset) -> &mut Self {
        self.services
            .insert(CapabilityKey::time_zone(), Capability::TimeZone(tz));
        self
    }

    /// Register an invoker for `namespace` (or the default one with `None`)
    pub fn add_invoker(&mut self, namespace: Option<&str>, invoker: Arc<dyn HttpInvoker>) -> &mut Self {
        self.services
            .insert(CapabilityKey::invoker(namespace), Capability::Invoker(invoker));
        self
    }

    pub fn add_runtime_context(&mut self, context: Arc<dyn ConnectorContext>) -> &mut Self {
        self.services.insert(
            CapabilityKey::connector_context(),
            Capability::ConnectorContext(context),
        );
        self
    }

    /// Local entry first, then each fallback in order; `None` if nobody has it
    pub fn lookup(&self, key: &CapabilityKey) -> Option<Capability> {
        if let Some(capability) = self.services.get(key) {
            return Some(capability.clone());
        }

        self.inners.iter().find_map(|inner| inner.lookup(key))
    }

    pub fn time_zone(&self) -> Option<FixedOffset> {
        self.lookup(&CapabilityKey::time_zone())
            .and_then(|c| c.as_time_zone())
    }

    /// The invoker for `namespace`, falling back to the default invoker
    pub fn invoker(&self, namespace: &str) -> Option<Arc<dyn HttpInvoker>> {
        self.lookup(&CapabilityKey::invoker(Some(namespace)))
            .or_else(|| self.lookup(&CapabilityKey::invoker(None)))
            .and_then(|c| c.as_invoker())
    }

    pub fn connector_context(&self) -> Option<Arc<dyn ConnectorContext>> {
        self.lookup(&CapabilityKey::connector_context())
            .and_then(|c| c.as_connector_context())
    }

    pub fn fallback_count(&self) -> usize {
        self.inners.len()
    }
}

impl CapabilitySource for CapabilityProvider {
    fn lookup(&self, key: &CapabilityKey) -> Option<Capability> {
        CapabilityProvider::lookup(self, key)
    }
}

impl fmt::Debug for CapabilityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProvider")
            .field("services", &self.services)
            .field("fallbacks", &self.inners.len())
            .finish()
    }
}
