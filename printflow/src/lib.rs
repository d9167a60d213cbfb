//! # printflow
//!
//! Print operation control layer: printer resolution, output surfaces, job
//! submission and the operation state machine that ties them together.
//!
//! ## Scope
//!
//! This crate decides WHERE and WHEN to print:
//! - Printer resolution across backends (requested > default > first)
//! - Preview documents and backend spool streams with N-up page breaks
//! - Job submission and completion waiting
//! - Dialog, renderer and preview-viewer seams
//!
//! WHAT to print stays in application code behind [`PageRenderer`].
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use printflow::{
//!     Collaborators, MemoryBackend, OperationAction, OperationConfig, PrintOperation,
//!     StaticRegistry,
//! };
//! use shared::Printer;
//!
//! let registry = Arc::new(StaticRegistry::default());
//! registry.register(Arc::new(MemoryBackend::with_printers(
//!     "local",
//!     vec![Printer::new("Office").default_printer()],
//!     true,
//! )));
//!
//! let mut collaborators = Collaborators::new(my_renderer);
//! let report = PrintOperation::new(OperationConfig::default(), registry)
//!     .run(OperationAction::Print, &mut collaborators)
//!     .await;
//! assert!(report.is_applied());
//! ```

mod backend;
mod config;
mod dialog;
mod error;
mod job;
mod latch;
mod operation;
mod preview;
mod render;
mod resolver;
mod sequence;
mod surface;

// Re-exports
pub use backend::{
    Backend, BackendEvent, BackendRegistry, DeliveredJob, ListingEvent, ListingSnapshot,
    MemoryBackend, PrinterListing, SpoolBackend, SpoolWriter, StaticRegistry, WatchId,
};
pub use config::OperationConfig;
pub use dialog::{
    DialogRequest, DialogResponse, PageSetupDialog, PrintDialog, run_page_setup_dialog,
    run_page_setup_dialog_blocking,
};
pub use error::{FirstError, PrintError, PrintResult};
pub use job::{JobProgress, JobStatus, JobTicket, JobTracker, PrintJob};
pub use latch::Latch;
pub use operation::{
    Collaborators, OperationAction, OperationPhase, OperationReport, OperationResult,
    PrintOperation, effective_hard_margins,
};
pub use preview::{
    CommandViewer, PreviewDecision, PreviewViewer, Substitution, substitute_preview_command,
};
pub use render::{PageContext, PageRenderer};
pub use resolver::{PrinterResolver, ResolutionRequest, ResolvedPrinter};
pub use sequence::PagePlan;
pub use surface::{
    FinishedSurface, OutputSurface, SurfaceMode, SurfaceProvisioner, is_first_of_physical_page,
    is_last_of_physical_page,
};
