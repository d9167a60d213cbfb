//! Print backends
//!
//! A backend discovers printers and accepts jobs for them. The core only
//! talks to backends through [`Backend`] and [`BackendRegistry`]:
//! - [`MemoryBackend`]: in-process backend, scriptable (tests, demos)
//! - [`SpoolBackend`]: writes finished jobs into a spool directory

mod listing;
mod memory;
mod spool;

pub use listing::{BackendEvent, ListingEvent, ListingSnapshot, PrinterListing, WatchId};
pub use memory::{DeliveredJob, MemoryBackend};
pub use spool::SpoolBackend;

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::PrintResult;
use crate::job::{JobProgress, JobTicket};

/// Spool stream a job-backed surface writes into
pub type SpoolWriter = Box<dyn Write + Send>;

/// Trait for print backends
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Backend name, copied into every printer it discovers
    fn name(&self) -> &str;

    /// Discovery state (known printers, listing-complete, listeners)
    fn listing(&self) -> &PrinterListing;

    /// Open the spool stream for a job
    ///
    /// Fails with a backend error when the device or spooler is unreachable.
    fn open_spool(&self, ticket: &JobTicket) -> PrintResult<SpoolWriter>;

    /// Send a finished spool to the printer
    ///
    /// Status changes are reported through `progress` while sending.
    async fn send(&self, ticket: &JobTicket, progress: JobProgress) -> PrintResult<()>;

    /// Drop the spool of a job that will never be sent
    fn discard(&self, _ticket: &JobTicket) {}

    /// A resolution request stopped listening to this backend
    fn release(&self) {}
}

/// Source of the currently registered backends
pub trait BackendRegistry: Send + Sync {
    fn load_backends(&self) -> Vec<Arc<dyn Backend>>;
}

/// Registry over a fixed, growable set of backends
#[derive(Debug, Default)]
pub struct StaticRegistry {
    backends: RwLock<Vec<Arc<dyn Backend>>>,
}

impl StaticRegistry {
    pub fn new(backends: Vec<Arc<dyn Backend>>) -> Self {
        Self {
            backends: RwLock::new(backends),
        }
    }

    pub fn register(&self, backend: Arc<dyn Backend>) {
        tracing::debug!(backend = backend.name(), "Backend registered");
        self.backends.write().push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.read().is_empty()
    }
}

impl BackendRegistry for StaticRegistry {
    fn load_backends(&self) -> Vec<Arc<dyn Backend>> {
        self.backends.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_registry_register() {
        let registry = StaticRegistry::default();
        assert!(registry.is_empty());

        registry.register(Arc::new(MemoryBackend::new("local")));
        registry.register(Arc::new(MemoryBackend::new("remote")));

        let names: Vec<_> = registry
            .load_backends()
            .iter()
            .map(|b| b.name().to_string())
            .collect();
        assert_eq!(names, ["local", "remote"]);
    }
}
