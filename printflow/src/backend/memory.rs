//! In-process backend
//!
//! Keeps spooled documents in memory. Discovery, surface failures, send
//! failures and send timing can be scripted, which makes it the backend of
//! choice for tests and demos.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::Printer;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Backend, PrinterListing, SpoolWriter};
use crate::error::{PrintError, PrintResult};
use crate::job::{JobProgress, JobStatus, JobTicket};

#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A job the backend finished sending
#[derive(Debug, Clone)]
pub struct DeliveredJob {
    pub ticket: JobTicket,
    pub data: Vec<u8>,
}

/// In-memory print backend
#[derive(Debug)]
pub struct MemoryBackend {
    name: String,
    listing: PrinterListing,
    spools: Mutex<HashMap<Uuid, SharedBuffer>>,
    delivered: Mutex<Vec<DeliveredJob>>,
    open_failure: Mutex<Option<String>>,
    send_failure: Mutex<Option<String>>,
    /// `true` while sends may proceed
    send_gate: watch::Sender<bool>,
    releases: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        let (send_gate, _) = watch::channel(true);
        Self {
            name: name.into(),
            listing: PrinterListing::new(),
            spools: Mutex::new(HashMap::new()),
            delivered: Mutex::new(Vec::new()),
            open_failure: Mutex::new(None),
            send_failure: Mutex::new(None),
            send_gate,
            releases: AtomicUsize::new(0),
        }
    }

    /// Backend whose listing already contains `printers`
    pub fn with_printers(name: impl Into<String>, printers: Vec<Printer>, done: bool) -> Self {
        let backend = Self::new(name);
        for printer in printers {
            backend.add_printer(printer);
        }
        if done {
            backend.finish_listing();
        }
        backend
    }

    /// Discover a printer (stamped with this backend's name)
    pub fn add_printer(&self, printer: Printer) {
        let printer = printer.with_backend(self.name.clone());
        debug!(backend = %self.name, printer = %printer.name, "Printer discovered");
        self.listing.add(printer);
    }

    pub fn finish_listing(&self) {
        debug!(backend = %self.name, "Printer listing complete");
        self.listing.finish();
    }

    /// Make every following `open_spool` fail with `message`
    pub fn fail_open(&self, message: impl Into<String>) {
        *self.open_failure.lock() = Some(message.into());
    }

    /// Make every following `send` fail with `message`
    pub fn fail_send(&self, message: impl Into<String>) {
        *self.send_failure.lock() = Some(message.into());
    }

    /// Park sends until [`MemoryBackend::release_sends`]
    pub fn hold_sends(&self) {
        self.send_gate.send_replace(false);
    }

    pub fn release_sends(&self) {
        self.send_gate.send_replace(true);
    }

    pub fn delivered(&self) -> Vec<DeliveredJob> {
        self.delivered.lock().clone()
    }

    /// How many times a resolution request released this backend
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn open_spools(&self) -> usize {
        self.spools.lock().len()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn listing(&self) -> &PrinterListing {
        &self.listing
    }

    fn open_spool(&self, ticket: &JobTicket) -> PrintResult<SpoolWriter> {
        if let Some(message) = self.open_failure.lock().clone() {
            return Err(PrintError::Backend(message));
        }
        let buffer = SharedBuffer::default();
        self.spools.lock().insert(ticket.id, buffer.clone());
        Ok(Box::new(buffer))
    }

    async fn send(&self, ticket: &JobTicket, progress: JobProgress) -> PrintResult<()> {
        let mut gate = self.send_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        progress.set_status(JobStatus::Active);

        if let Some(message) = self.send_failure.lock().clone() {
            return Err(PrintError::Backend(message));
        }

        let buffer = self
            .spools
            .lock()
            .remove(&ticket.id)
            .ok_or_else(|| PrintError::Backend(format!("No spool for job {}", ticket.id)))?;
        let data = buffer.0.lock().clone();

        info!(
            backend = %self.name,
            printer = %ticket.printer.name,
            job_id = %ticket.id,
            bytes = data.len(),
            "Job delivered"
        );
        self.delivered.lock().push(DeliveredJob {
            ticket: ticket.clone(),
            data,
        });
        Ok(())
    }

    fn discard(&self, ticket: &JobTicket) {
        if self.spools.lock().remove(&ticket.id).is_some() {
            debug!(backend = %self.name, job_id = %ticket.id, "Spool discarded");
        }
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{PageSetup, PrintSettings};

    fn ticket() -> JobTicket {
        JobTicket::new(
            "doc",
            Printer::new("Laser"),
            PrintSettings::default(),
            PageSetup::default(),
        )
    }

    #[test]
    fn test_printers_are_stamped_with_backend() {
        let backend = MemoryBackend::with_printers("cups", vec![Printer::new("Laser")], true);
        let printers = backend.listing().printers();
        assert_eq!(printers[0].backend, "cups");
        assert!(backend.listing().is_done());
    }

    #[test]
    fn test_open_failure() {
        let backend = MemoryBackend::new("cups");
        backend.fail_open("spooler unreachable");
        let err = backend.open_spool(&ticket()).err().unwrap();
        assert_eq!(err, PrintError::Backend("spooler unreachable".into()));
    }

    #[tokio::test]
    async fn test_discarded_spool_cannot_be_sent() {
        let backend = MemoryBackend::new("cups");
        let ticket = ticket();
        drop(backend.open_spool(&ticket).unwrap());
        assert_eq!(backend.open_spools(), 1);

        backend.discard(&ticket);
        assert_eq!(backend.open_spools(), 0);
        let result = backend.send(&ticket, JobProgress::new(ticket.id)).await;
        assert!(matches!(result, Err(PrintError::Backend(_))));
    }

    #[tokio::test]
    async fn test_send_without_spool_fails() {
        let backend = MemoryBackend::new("cups");
        let ticket = ticket();
        let result = backend.send(&ticket, JobProgress::new(ticket.id)).await;
        assert!(matches!(result, Err(PrintError::Backend(_))));
    }
}
