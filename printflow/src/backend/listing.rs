//! Printer discovery bookkeeping shared by all backends
//!
//! A backend records discovered printers and the end of its listing here.
//! Resolution requests attach listeners with [`PrinterListing::watch`], which
//! returns the already-known printers and registers the listener under one
//! lock, so no printer is seen twice or missed.

use parking_lot::Mutex;
use shared::Printer;
use tokio::sync::mpsc;

/// Listener registration handle
pub type WatchId = u64;

/// Discovery event emitted by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum ListingEvent {
    PrinterAdded(Printer),
    ListingDone,
}

/// Event tagged with the listener's backend slot
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    pub backend: usize,
    pub event: ListingEvent,
}

/// State returned when attaching to a listing
#[derive(Debug, Clone)]
pub struct ListingSnapshot {
    pub printers: Vec<Printer>,
    pub done: bool,
    /// `None` when the listing was already complete and nothing was attached
    pub watch: Option<WatchId>,
}

struct Watcher {
    id: WatchId,
    tag: usize,
    tx: mpsc::UnboundedSender<BackendEvent>,
}

#[derive(Default)]
struct ListingState {
    printers: Vec<Printer>,
    done: bool,
    watchers: Vec<Watcher>,
    next_id: WatchId,
}

impl ListingState {
    fn broadcast(&mut self, event: ListingEvent) {
        // Receivers dropped without unwatch are pruned here
        self.watchers.retain(|w| {
            w.tx
                .send(BackendEvent {
                    backend: w.tag,
                    event: event.clone(),
                })
                .is_ok()
        });
    }
}

/// Known printers, listing-complete flag and attached listeners of a backend
#[derive(Default)]
pub struct PrinterListing {
    state: Mutex<ListingState>,
}

impl PrinterListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discovered printer and notify listeners
    ///
    /// Returns `false` when a printer with the same name is already known.
    pub fn add(&self, printer: Printer) -> bool {
        let mut state = self.state.lock();
        if state.printers.iter().any(|p| p.name == printer.name) {
            return false;
        }
        state.printers.push(printer.clone());
        state.broadcast(ListingEvent::PrinterAdded(printer));
        true
    }

    /// Signal listing-complete; later calls are ignored
    pub fn finish(&self) {
        let mut state = self.state.lock();
        if state.done {
            return;
        }
        state.done = true;
        state.broadcast(ListingEvent::ListingDone);
    }

    pub fn printers(&self) -> Vec<Printer> {
        self.state.lock().printers.clone()
    }

    pub fn is_done(&self) -> bool {
        self.state.lock().done
    }

    /// Snapshot the known printers and, if still listing, attach `tx`
    pub fn watch(&self, tag: usize, tx: mpsc::UnboundedSender<BackendEvent>) -> ListingSnapshot {
        let mut state = self.state.lock();
        let watch = if state.done {
            None
        } else {
            let id = state.next_id;
            state.next_id += 1;
            state.watchers.push(Watcher { id, tag, tx });
            Some(id)
        };
        ListingSnapshot {
            printers: state.printers.clone(),
            done: state.done,
            watch,
        }
    }

    pub fn unwatch(&self, id: WatchId) {
        self.state.lock().watchers.retain(|w| w.id != id);
    }

    pub fn watcher_count(&self) -> usize {
        self.state.lock().watchers.len()
    }
}

impl std::fmt::Debug for PrinterListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PrinterListing")
            .field("printers", &state.printers.len())
            .field("done", &state.done)
            .field("watchers", &state.watchers.len())
            .finish()
    }
}
