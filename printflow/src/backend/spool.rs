//! Spool-directory backend
//!
//! Jobs are spooled into `<root>/.incoming/<job-id>.prn` and moved to
//! `<root>/<printer>/<job-name>-<job-id>.prn` when sent. Useful as a
//! file-drop target for print servers that watch a directory.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::Printer;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{Backend, PrinterListing, SpoolWriter};
use crate::error::{PrintError, PrintResult};
use crate::job::{JobProgress, JobStatus, JobTicket};

const INCOMING_DIR: &str = ".incoming";

/// Backend that delivers jobs as files in a directory tree
#[derive(Debug)]
pub struct SpoolBackend {
    name: String,
    root: PathBuf,
    listing: PrinterListing,
    spools: Mutex<HashMap<Uuid, PathBuf>>,
}

impl SpoolBackend {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            listing: PrinterListing::new(),
            spools: Mutex::new(HashMap::new()),
        }
    }

    /// Backend with a fixed printer list, listing already complete
    pub fn with_printers(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        printers: Vec<Printer>,
    ) -> Self {
        let backend = Self::new(name, root);
        for printer in printers {
            backend.add_printer(printer);
        }
        backend.listing.finish();
        backend
    }

    pub fn add_printer(&self, printer: Printer) {
        self.listing.add(printer.with_backend(self.name.clone()));
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of a delivered job
    pub fn delivery_path(&self, ticket: &JobTicket) -> PathBuf {
        self.root
            .join(sanitize(&ticket.printer.name))
            .join(format!("{}-{}.prn", sanitize(&ticket.name), ticket.id))
    }
}

/// Keep file names portable
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "job".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl Backend for SpoolBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn listing(&self) -> &PrinterListing {
        &self.listing
    }

    fn open_spool(&self, ticket: &JobTicket) -> PrintResult<SpoolWriter> {
        let incoming = self.root.join(INCOMING_DIR);
        fs::create_dir_all(&incoming)
            .map_err(|e| PrintError::Backend(format!("{}: {}", incoming.display(), e)))?;

        let path = incoming.join(format!("{}.prn", ticket.id));
        let file = File::create(&path)
            .map_err(|e| PrintError::Backend(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Spool opened");

        self.spools.lock().insert(ticket.id, path);
        Ok(Box::new(BufWriter::new(file)))
    }

    #[instrument(skip(self, ticket, progress), fields(job_id = %ticket.id, printer = %ticket.printer.name))]
    async fn send(&self, ticket: &JobTicket, progress: JobProgress) -> PrintResult<()> {
        let spool = self
            .spools
            .lock()
            .remove(&ticket.id)
            .ok_or_else(|| PrintError::Backend(format!("No spool for job {}", ticket.id)))?;

        progress.set_status(JobStatus::Active);

        let target = self.delivery_path(ticket);
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PrintError::Backend(format!("{}: {}", dir.display(), e)))?;
        }
        tokio::fs::rename(&spool, &target)
            .await
            .map_err(|e| PrintError::Backend(format!("{}: {}", target.display(), e)))?;

        info!(path = %target.display(), "Job delivered to spool directory");
        Ok(())
    }

    fn discard(&self, ticket: &JobTicket) {
        let Some(spool) = self.spools.lock().remove(&ticket.id) else {
            return;
        };
        match fs::remove_file(&spool) {
            Ok(()) => debug!(job_id = %ticket.id, path = %spool.display(), "Spool discarded"),
            Err(e) => warn!(
                job_id = %ticket.id,
                path = %spool.display(),
                error = %e,
                "Failed to remove spool"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{PageSetup, PrintSettings};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Office Laser/2"), "Office_Laser_2");
        assert_eq!(sanitize("report-v1.txt"), "report-v1.txt");
        assert_eq!(sanitize(""), "job");
    }

    #[tokio::test]
    async fn test_spool_and_send() {
        let dir = TempDir::new().unwrap();
        let backend = SpoolBackend::with_printers("files", dir.path(), vec![Printer::new("Office")]);
        let ticket = JobTicket::new(
            "Quarterly report",
            backend.listing().printers()[0].clone(),
            PrintSettings::default(),
            PageSetup::default(),
        );

        {
            let mut spool = backend.open_spool(&ticket).unwrap();
            spool.write_all(b"%!printflow-pages 1\n").unwrap();
            spool.flush().unwrap();
        }

        let progress = JobProgress::new(ticket.id);
        backend.send(&ticket, progress.clone()).await.unwrap();

        let delivered = backend.delivery_path(&ticket);
        assert!(delivered.starts_with(dir.path().join("Office")));
        assert_eq!(fs::read(&delivered).unwrap(), b"%!printflow-pages 1\n");
        assert_eq!(progress.status(), JobStatus::Active);
    }

    #[test]
    fn test_discard_removes_spool_file() {
        let dir = TempDir::new().unwrap();
        let backend = SpoolBackend::with_printers("files", dir.path(), vec![Printer::new("Office")]);
        let ticket = JobTicket::new(
            "draft",
            backend.listing().printers()[0].clone(),
            PrintSettings::default(),
            PageSetup::default(),
        );

        drop(backend.open_spool(&ticket).unwrap());
        let incoming = dir.path().join(INCOMING_DIR);
        assert_eq!(fs::read_dir(&incoming).unwrap().count(), 1);

        backend.discard(&ticket);
        assert_eq!(fs::read_dir(&incoming).unwrap().count(), 0);
        assert!(backend.spools.lock().is_empty());

        // A second discard is a no-op
        backend.discard(&ticket);
    }

    #[test]
    fn test_open_spool_on_unwritable_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();

        let backend = SpoolBackend::new("files", &file);
        let ticket = JobTicket::new(
            "doc",
            Printer::new("Office"),
            PrintSettings::default(),
            PageSetup::default(),
        );
        assert!(matches!(
            backend.open_spool(&ticket),
            Err(PrintError::Backend(_))
        ));
    }
}
