//! Printer resolution
//!
//! Picks exactly one printer (or none) out of every registered backend:
//! 1. exact name match with the requested printer (ends discovery early)
//! 2. first default printer (ends discovery early when nothing was requested)
//! 3. first printer seen, as a last resort
//!
//! Virtual printers (export-to-file targets) are skipped at every step.
//!
//! Discovery is event driven. Each backend's already-known printers are
//! examined first; then the resolver listens until every backend reported
//! listing-complete or an early match happened. The result callback runs
//! exactly once, from a spawned task, even when no backend exists.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use shared::Printer;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::backend::{Backend, BackendEvent, BackendRegistry, ListingEvent, WatchId};
use crate::latch::Latch;

/// A chosen printer together with the backend that serves it
#[derive(Debug, Clone)]
pub struct ResolvedPrinter {
    pub printer: Printer,
    pub backend: Arc<dyn Backend>,
}

impl ResolvedPrinter {
    pub fn name(&self) -> &str {
        &self.printer.name
    }
}

/// Candidate bookkeeping of one resolution request
///
/// Each request owns its candidates; backends only share listeners.
#[derive(Debug, Default)]
pub struct ResolutionRequest {
    requested: Option<String>,
    matched: Option<(Printer, usize)>,
    default_candidate: Option<(Printer, usize)>,
    first_candidate: Option<(Printer, usize)>,
    found: bool,
}

impl ResolutionRequest {
    pub fn new(requested: Option<&str>) -> Self {
        Self {
            requested: requested.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    /// Consider a printer from backend slot `backend`
    ///
    /// Returns `true` once resolution can stop.
    pub fn offer(&mut self, printer: &Printer, backend: usize) -> bool {
        if self.found {
            return true;
        }

        // Export-style targets are never picked, not even by name
        if printer.is_virtual {
            return false;
        }

        if self.requested.as_deref() == Some(printer.name.as_str()) {
            self.matched = Some((printer.clone(), backend));
            self.found = true;
        } else if self.default_candidate.is_none() && printer.is_default {
            self.default_candidate = Some((printer.clone(), backend));
            if self.requested.is_none() {
                self.found = true;
            }
        } else if self.first_candidate.is_none() {
            self.first_candidate = Some((printer.clone(), backend));
        }

        self.found
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    /// Final answer: matched > default > first > none
    pub fn best(&self) -> Option<&(Printer, usize)> {
        self.matched
            .as_ref()
            .or(self.default_candidate.as_ref())
            .or(self.first_candidate.as_ref())
    }

    pub fn into_best(self) -> Option<(Printer, usize)> {
        self.matched.or(self.default_candidate).or(self.first_candidate)
    }
}

/// Resolves printers against a backend registry
#[derive(Clone)]
pub struct PrinterResolver {
    registry: Arc<dyn BackendRegistry>,
    discovery_timeout: Option<Duration>,
}

impl PrinterResolver {
    pub fn new(registry: Arc<dyn BackendRegistry>) -> Self {
        Self {
            registry,
            discovery_timeout: None,
        }
    }

    /// Give up waiting on slow backends after `timeout`
    ///
    /// The best candidate seen so far is used.
    pub fn with_discovery_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<dyn BackendRegistry> {
        &self.registry
    }

    /// Start resolution; `on_resolved` runs exactly once
    ///
    /// Must be called inside a tokio runtime.
    pub fn resolve<F>(&self, requested: Option<&str>, on_resolved: F) -> JoinHandle<()>
    where
        F: FnOnce(Option<ResolvedPrinter>) + Send + 'static,
    {
        let latch = Latch::new(on_resolved);
        let backends = self.registry.load_backends();
        let requested = requested.map(str::to_string);
        let timeout = self.discovery_timeout;

        tokio::spawn(async move {
            let resolved = discover(backends, requested, timeout).await;
            latch.fire(resolved);
        })
    }

    /// Resolve and await the result
    pub async fn find(&self, requested: Option<&str>) -> Option<ResolvedPrinter> {
        let (tx, rx) = oneshot::channel();
        self.resolve(requested, move |resolved| {
            let _ = tx.send(resolved);
        });
        rx.await.ok().flatten()
    }

    /// Printers every backend currently knows, without waiting on discovery
    pub fn known_printers(&self) -> Vec<Printer> {
        self.registry
            .load_backends()
            .iter()
            .flat_map(|backend| backend.listing().printers())
            .collect()
    }

    /// Re-attach a printer picked elsewhere (e.g. in a dialog) to its backend
    pub fn backend_for(&self, printer: &Printer) -> Option<ResolvedPrinter> {
        self.registry
            .load_backends()
            .into_iter()
            .find(|backend| {
                backend.name() == printer.backend
                    && backend
                        .listing()
                        .printers()
                        .iter()
                        .any(|p| p.name == printer.name)
            })
            .map(|backend| ResolvedPrinter {
                printer: printer.clone(),
                backend,
            })
    }
}

impl std::fmt::Debug for PrinterResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrinterResolver")
            .field("discovery_timeout", &self.discovery_timeout)
            .finish()
    }
}

/// Per-request attachment to the loaded backends
struct Attachments {
    backends: Vec<Arc<dyn Backend>>,
    watching: HashMap<usize, WatchId>,
    released: Vec<bool>,
}

impl Attachments {
    fn new(backends: Vec<Arc<dyn Backend>>) -> Self {
        let released = vec![false; backends.len()];
        Self {
            backends,
            watching: HashMap::new(),
            released,
        }
    }

    fn release(&mut self, slot: usize) {
        if let Some(id) = self.watching.remove(&slot) {
            self.backends[slot].listing().unwatch(id);
        }
        if !self.released[slot] {
            self.released[slot] = true;
            self.backends[slot].release();
        }
    }

    fn release_all(&mut self) {
        for slot in 0..self.backends.len() {
            self.release(slot);
        }
    }
}

#[instrument(skip(backends, timeout), fields(backends = backends.len()))]
async fn discover(
    backends: Vec<Arc<dyn Backend>>,
    requested: Option<String>,
    timeout: Option<Duration>,
) -> Option<ResolvedPrinter> {
    if backends.is_empty() {
        debug!("No print backends registered");
        return None;
    }

    let mut request = ResolutionRequest::new(requested.as_deref());
    let mut attachments = Attachments::new(backends);
    let (tx, mut rx) = mpsc::unbounded_channel();

    for slot in 0..attachments.backends.len() {
        if request.is_found() {
            break;
        }
        let snapshot = attachments.backends[slot].listing().watch(slot, tx.clone());
        if let Some(id) = snapshot.watch {
            attachments.watching.insert(slot, id);
        }
        for printer in &snapshot.printers {
            if request.offer(printer, slot) {
                break;
            }
        }
        if snapshot.done {
            attachments.release(slot);
        }
    }
    drop(tx);

    let listen = async {
        while !request.is_found() && !attachments.watching.is_empty() {
            let Some(BackendEvent { backend, event }) = rx.recv().await else {
                break;
            };
            if !attachments.watching.contains_key(&backend) {
                continue;
            }
            match event {
                ListingEvent::PrinterAdded(printer) => {
                    request.offer(&printer, backend);
                }
                ListingEvent::ListingDone => attachments.release(backend),
            }
        }
    };

    match timeout {
        Some(limit) => {
            if tokio::time::timeout(limit, listen).await.is_err() {
                warn!(
                    timeout_ms = limit.as_millis() as u64,
                    pending = attachments.watching.len(),
                    "Printer discovery timed out"
                );
            }
        }
        None => listen.await,
    }

    attachments.release_all();

    let resolved = request.into_best().map(|(printer, slot)| ResolvedPrinter {
        printer,
        backend: attachments.backends[slot].clone(),
    });
    match &resolved {
        Some(r) => info!(printer = %r.printer.name, backend = %r.backend.name(), "Printer resolved"),
        None => info!("No printer found"),
    }
    resolved
}
