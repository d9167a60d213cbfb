//! Print operation controller
//!
//! Ties resolution, dialogs, surfaces, rendering and job submission into one
//! flow:
//!
//! ```text
//! Idle -> ResolvingPrinter | AwaitingDialog -> Provisioning -> Rendering
//!      -> Submitting -> AwaitingCompletion -> Done
//! ```
//!
//! Every stage returns a [`PrintResult`]; the first error short-circuits the
//! rest. An open surface is always finished, also on the error and cancel
//! paths. [`PrintOperation::run`], [`PrintOperation::spawn`] and
//! [`PrintOperation::run_blocking`] share one implementation and differ only
//! in how the caller resumes.

use std::path::PathBuf;
use std::sync::Arc;

use shared::{Margins, PageSetup, PrintSettings, Printer};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::backend::BackendRegistry;
use crate::config::OperationConfig;
use crate::dialog::{DialogRequest, DialogResponse, PrintDialog};
use crate::error::{PrintError, PrintResult};
use crate::job::{JobProgress, JobStatus, JobTracker, PrintJob};
use crate::preview::{PreviewDecision, PreviewViewer};
use crate::render::{PageContext, PageRenderer};
use crate::resolver::{PrinterResolver, ResolvedPrinter};
use crate::sequence::PagePlan;
use crate::surface::{FinishedSurface, OutputSurface, SurfaceMode, SurfaceProvisioner};

/// What the caller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationAction {
    /// Print to the configured (or resolved) printer without a dialog
    Print,
    /// Render a preview document without a dialog
    Preview,
    /// Let the user decide through the print dialog
    PrintDialog,
}

/// Terminal outcome of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Applied,
    Cancelled,
    Error,
    /// Job submitted, completion not awaited
    InProgress,
}

/// Controller states, recorded in order of entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    Idle,
    ResolvingPrinter,
    AwaitingDialog,
    Provisioning,
    Rendering,
    Submitting,
    AwaitingCompletion,
    Done(OperationResult),
}

/// Everything the caller learns about a finished run
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub result: OperationResult,
    /// First error; never set for cancellations
    pub error: Option<PrintError>,
    pub phases: Vec<OperationPhase>,
    pub printer: Option<Printer>,
    pub settings: PrintSettings,
    pub page_setup: PageSetup,
    /// Default page setup after the run (updated by dialogs)
    pub default_page_setup: Option<PageSetup>,
    /// Preview document left on disk for the caller or viewer
    pub preview_path: Option<PathBuf>,
    pub preview_decision: Option<PreviewDecision>,
    /// Job status when the run ended
    pub job_status: Option<JobStatus>,
    /// Progress handle of the submitted job, for callers that did not wait
    pub job: Option<JobProgress>,
    /// Plan positions rendered
    pub pages_printed: usize,
}

impl OperationReport {
    pub fn is_applied(&self) -> bool {
        self.result == OperationResult::Applied
    }

    /// Last phase entered
    pub fn final_phase(&self) -> Option<OperationPhase> {
        self.phases.last().copied()
    }
}

/// Application-side collaborators of one operation
pub struct Collaborators {
    pub renderer: Box<dyn PageRenderer>,
    pub dialog: Option<Box<dyn PrintDialog>>,
    pub viewer: Option<Box<dyn PreviewViewer>>,
}

impl Collaborators {
    pub fn new(renderer: impl PageRenderer + 'static) -> Self {
        Self {
            renderer: Box::new(renderer),
            dialog: None,
            viewer: None,
        }
    }

    pub fn with_dialog(mut self, dialog: impl PrintDialog + 'static) -> Self {
        self.dialog = Some(Box::new(dialog));
        self
    }

    pub fn with_viewer(mut self, viewer: impl PreviewViewer + 'static) -> Self {
        self.viewer = Some(Box::new(viewer));
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("dialog", &self.dialog.is_some())
            .field("viewer", &self.viewer.is_some())
            .finish()
    }
}

/// Hard margins exposed to the renderer
///
/// N-up sheets are laid out by the operation, so the printer's unprintable
/// area does not apply to individual logical pages.
pub fn effective_hard_margins(
    printer: Option<&Printer>,
    settings: &PrintSettings,
    page_setup: &PageSetup,
) -> Margins {
    if settings.number_up() >= 2 {
        return Margins::zero();
    }
    printer
        .and_then(|p| p.hard_margins_for(&page_setup.paper))
        .unwrap_or_default()
}

/// Mutable record of one run; owned by the run future
struct OperationState {
    phases: Vec<OperationPhase>,
    printer: Option<ResolvedPrinter>,
    settings: PrintSettings,
    page_setup: PageSetup,
    default_page_setup: Option<PageSetup>,
    pages_to_print: usize,
    page_position: usize,
    preview_path: Option<PathBuf>,
    preview_decision: Option<PreviewDecision>,
    job: Option<JobProgress>,
}

impl OperationState {
    fn new(settings: PrintSettings, default_page_setup: Option<PageSetup>) -> Self {
        Self {
            phases: vec![OperationPhase::Idle],
            printer: None,
            settings,
            page_setup: default_page_setup.clone().unwrap_or_default(),
            default_page_setup,
            pages_to_print: 0,
            page_position: 0,
            preview_path: None,
            preview_decision: None,
            job: None,
        }
    }

    fn enter(&mut self, phase: OperationPhase) {
        debug!(phase = ?phase, "Operation phase");
        self.phases.push(phase);
    }

    /// A dialog-chosen page setup becomes the default when there was none
    /// or the user set it explicitly
    fn apply_page_setup(&mut self, page_setup: PageSetup, page_setup_set: bool) {
        if self.default_page_setup.is_none() || page_setup_set {
            self.default_page_setup = Some(page_setup.clone());
        }
        self.page_setup = page_setup;
    }

    fn into_report(mut self, outcome: PrintResult<OperationResult>) -> OperationReport {
        let (result, error) = match outcome {
            Ok(result) => (result, None),
            Err(err) if err.is_cancelled() => (OperationResult::Cancelled, None),
            Err(err) => (OperationResult::Error, Some(err)),
        };
        self.enter(OperationPhase::Done(result));

        match &error {
            Some(err) => warn!(error = %err, "Print operation failed"),
            None => info!(result = ?result, pages = self.page_position, "Print operation done"),
        }

        OperationReport {
            result,
            error,
            phases: self.phases,
            printer: self.printer.map(|r| r.printer),
            settings: self.settings,
            page_setup: self.page_setup,
            default_page_setup: self.default_page_setup,
            preview_path: self.preview_path,
            preview_decision: self.preview_decision,
            job_status: self.job.as_ref().map(JobProgress::status),
            job: self.job,
            pages_printed: self.page_position,
        }
    }
}

/// One print or preview run
#[derive(Debug)]
pub struct PrintOperation {
    config: OperationConfig,
    resolver: PrinterResolver,
    provisioner: SurfaceProvisioner,
    settings: PrintSettings,
    default_page_setup: Option<PageSetup>,
    cancel: CancellationToken,
}

impl PrintOperation {
    pub fn new(config: OperationConfig, registry: Arc<dyn BackendRegistry>) -> Self {
        let resolver =
            PrinterResolver::new(registry).with_discovery_timeout(config.discovery_timeout);
        let provisioner = match &config.preview_dir {
            Some(dir) => SurfaceProvisioner::new().with_preview_dir(dir),
            None => SurfaceProvisioner::new(),
        };
        Self {
            config,
            resolver,
            provisioner,
            settings: PrintSettings::default(),
            default_page_setup: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Initial settings; `settings.printer` is the printer to look for
    pub fn with_settings(mut self, settings: PrintSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_default_page_setup(mut self, page_setup: PageSetup) -> Self {
        self.default_page_setup = Some(page_setup);
        self
    }

    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    /// Token that cancels the run before submission
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run to completion
    #[instrument(skip_all, fields(job = %self.config.job_name, action = ?action))]
    pub async fn run(
        self,
        action: OperationAction,
        collaborators: &mut Collaborators,
    ) -> OperationReport {
        let mut state = OperationState::new(self.settings.clone(), self.default_page_setup.clone());
        let outcome = self.drive(action, collaborators, &mut state).await;
        state.into_report(outcome)
    }

    /// Run on the runtime and hand the report (and the collaborators) to `on_done`
    pub fn spawn<F>(
        self,
        action: OperationAction,
        mut collaborators: Collaborators,
        on_done: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(OperationReport, Collaborators) + Send + 'static,
    {
        tokio::spawn(async move {
            let report = self.run(action, &mut collaborators).await;
            on_done(report, collaborators);
        })
    }

    /// Block the calling thread until the run is done
    ///
    /// `runtime` must be a multi-threaded runtime; must not be called from
    /// inside an async task.
    pub fn run_blocking(
        self,
        runtime: &Handle,
        action: OperationAction,
        collaborators: &mut Collaborators,
    ) -> OperationReport {
        runtime.block_on(self.run(action, collaborators))
    }

    async fn drive(
        &self,
        action: OperationAction,
        collaborators: &mut Collaborators,
        state: &mut OperationState,
    ) -> PrintResult<OperationResult> {
        let mode = match action {
            OperationAction::Print => self.resolve_printer(SurfaceMode::Print, state).await?,
            OperationAction::Preview => self.resolve_printer(SurfaceMode::Preview, state).await?,
            OperationAction::PrintDialog => match collaborators.dialog.as_mut() {
                Some(dialog) => self.run_dialog(dialog.as_mut(), state).await?,
                None => {
                    warn!("No print dialog available, printing to the resolved printer");
                    self.resolve_printer(SurfaceMode::Print, state).await?
                }
            },
        };
        let Some(mode) = mode else {
            return Ok(OperationResult::Cancelled);
        };

        state.enter(OperationPhase::Provisioning);
        let job = match mode {
            SurfaceMode::Print => {
                let resolved = state
                    .printer
                    .as_ref()
                    .ok_or(PrintError::ResolutionExhausted)?;
                Some(PrintJob::new(
                    self.config.job_name.clone(),
                    resolved,
                    state.settings.clone(),
                    state.page_setup.clone(),
                ))
            }
            SurfaceMode::Preview => None,
        };
        let mut surface =
            self.provisioner
                .provision(mode, job.as_ref(), &state.settings, &state.page_setup)?;

        state.enter(OperationPhase::Rendering);
        let rendered = self.render(collaborators.renderer.as_mut(), &mut surface, state);
        collaborators.renderer.end_print();
        // The surface is finished on every path; a render error takes precedence
        let finished = match (rendered, surface.finish()) {
            (Ok(()), Ok(finished)) => finished,
            (Err(err), _) | (Ok(()), Err(err)) => {
                if let Some(job) = &job {
                    job.discard();
                }
                return Err(err);
            }
        };

        match job {
            None => self.present_preview(collaborators, state, finished).await,
            Some(job) => self.submit(job, state).await,
        }
    }

    async fn resolve_printer(
        &self,
        mode: SurfaceMode,
        state: &mut OperationState,
    ) -> PrintResult<Option<SurfaceMode>> {
        state.enter(OperationPhase::ResolvingPrinter);
        let requested = state.settings.printer.clone();

        let resolved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PrintError::UserCancelled),
            resolved = self.resolver.find(requested.as_deref()) => resolved,
        };

        match resolved {
            Some(resolved) => {
                state.settings.printer = Some(resolved.name().to_string());
                state.printer = Some(resolved);
            }
            None if mode == SurfaceMode::Preview => {
                debug!("No printer found, previewing without one");
            }
            None if self.config.require_printer => return Err(PrintError::ResolutionExhausted),
            None => {
                info!(requested = ?requested, "No printer found, cancelling");
                return Ok(None);
            }
        }
        state.apply_page_setup(state.page_setup.clone(), false);
        Ok(Some(mode))
    }

    async fn run_dialog(
        &self,
        dialog: &mut dyn PrintDialog,
        state: &mut OperationState,
    ) -> PrintResult<Option<SurfaceMode>> {
        state.enter(OperationPhase::AwaitingDialog);
        let request = DialogRequest {
            job_name: self.config.job_name.clone(),
            settings: state.settings.clone(),
            page_setup: state.default_page_setup.clone(),
            printers: self.resolver.known_printers(),
        };

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PrintError::UserCancelled),
            response = dialog.run(request) => response,
        };

        match response {
            DialogResponse::Cancel => {
                info!("Print dialog cancelled");
                Ok(None)
            }
            DialogResponse::ApplyPrint {
                printer,
                settings,
                page_setup,
                page_setup_set,
            } => {
                let resolved = self.resolver.backend_for(&printer).ok_or_else(|| {
                    warn!(printer = %printer.name, "Chosen printer is no longer available");
                    PrintError::ResolutionExhausted
                })?;
                state.settings = settings;
                state.settings.printer = Some(printer.name.clone());
                state.apply_page_setup(page_setup, page_setup_set);
                state.printer = Some(resolved);
                Ok(Some(SurfaceMode::Print))
            }
            DialogResponse::ApplyPreview {
                settings,
                page_setup,
                page_setup_set,
            } => {
                state.printer = settings.printer.as_deref().and_then(|name| {
                    self.resolver
                        .known_printers()
                        .into_iter()
                        .find(|p| p.name == name)
                        .and_then(|p| self.resolver.backend_for(&p))
                });
                state.settings = settings;
                state.apply_page_setup(page_setup, page_setup_set);
                Ok(Some(SurfaceMode::Preview))
            }
        }
    }

    fn render(
        &self,
        renderer: &mut dyn PageRenderer,
        surface: &mut OutputSurface,
        state: &mut OperationState,
    ) -> PrintResult<()> {
        let page_count = renderer.page_count(&state.page_setup);
        let plan = PagePlan::new(page_count, &state.settings);
        surface.set_pages_to_print(plan.len());
        state.pages_to_print = plan.len();
        debug!(pages = page_count, positions = plan.len(), "Page plan ready");

        let printer = state.printer.as_ref().map(|r| &r.printer);
        for (position, page) in plan.iter() {
            if self.cancel.is_cancelled() {
                info!(position, "Rendering cancelled");
                return Err(PrintError::UserCancelled);
            }

            let page_setup = renderer.page_setup_for(page, &state.page_setup);
            let hard_margins = effective_hard_margins(printer, &state.settings, &page_setup);

            surface.begin_page(&page_setup, position)?;
            let mut ctx = PageContext::new(
                surface,
                &page_setup,
                hard_margins,
                state.settings.scale,
                state.settings.number_up_layout,
                position,
            );
            renderer.draw_page(&mut ctx, page)?;
            surface.end_page(position)?;
            state.page_position = position + 1;
        }
        Ok(())
    }

    async fn present_preview(
        &self,
        collaborators: &mut Collaborators,
        state: &mut OperationState,
        finished: FinishedSurface,
    ) -> PrintResult<OperationResult> {
        let path = finished
            .preview_path()
            .map(PathBuf::from)
            .ok_or_else(|| PrintError::SurfaceCreation("Preview produced no document".into()))?;
        state.preview_path = Some(path.clone());

        match collaborators.viewer.as_mut() {
            Some(viewer) => {
                let decision = viewer.present(&path, &state.settings).await?;
                info!(decision = ?decision, "Preview closed");
                state.preview_decision = Some(decision);
            }
            None => info!(path = %path.display(), "Preview ready"),
        }
        Ok(OperationResult::Applied)
    }

    async fn submit(
        &self,
        job: PrintJob,
        state: &mut OperationState,
    ) -> PrintResult<OperationResult> {
        if self.cancel.is_cancelled() {
            info!(job_id = %job.ticket().id, "Cancelled before submission");
            job.discard();
            return Err(PrintError::UserCancelled);
        }

        state.enter(OperationPhase::Submitting);
        let mut tracker = JobTracker::new(job);
        tracker.submit();
        state.job = Some(tracker.job().progress().clone());

        if !self.config.wait_for_completion {
            return Ok(OperationResult::InProgress);
        }

        state.enter(OperationPhase::AwaitingCompletion);
        tracker.wait().await;
        match tracker.job().error() {
            Some(err) => Err(err),
            None => Ok(OperationResult::Applied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PaperSize;

    #[test]
    fn test_hard_margins_for_single_page_layout() {
        let printer = Printer::new("Laser")
            .with_hard_margins(Margins::uniform(12.0))
            .with_paper_margins("na_letter", Margins::uniform(18.0));

        let letter = PageSetup::new(PaperSize::letter());
        let a4 = PageSetup::new(PaperSize::a4());
        let settings = PrintSettings::default();

        assert_eq!(
            effective_hard_margins(Some(&printer), &settings, &letter),
            Margins::uniform(18.0)
        );
        assert_eq!(
            effective_hard_margins(Some(&printer), &settings, &a4),
            Margins::uniform(12.0)
        );
        assert_eq!(effective_hard_margins(None, &settings, &a4), Margins::zero());
    }

    #[test]
    fn test_hard_margins_zero_for_number_up() {
        let printer = Printer::new("Laser").with_hard_margins(Margins::uniform(12.0));
        let settings = PrintSettings::default().with_number_up(2);
        assert_eq!(
            effective_hard_margins(Some(&printer), &settings, &PageSetup::default()),
            Margins::zero()
        );
    }

    #[test]
    fn test_dialog_page_setup_becomes_default() {
        let mut state = OperationState::new(PrintSettings::default(), None);
        let a5 = PageSetup::new(PaperSize::a5());
        state.apply_page_setup(a5.clone(), false);
        assert_eq!(state.default_page_setup, Some(a5.clone()));

        // An existing default is only replaced when the user set the page setup
        let letter = PageSetup::new(PaperSize::letter());
        state.apply_page_setup(letter.clone(), false);
        assert_eq!(state.default_page_setup, Some(a5));
        assert_eq!(state.page_setup, letter);

        state.apply_page_setup(letter.clone(), true);
        assert_eq!(state.default_page_setup, Some(letter));
    }

    #[test]
    fn test_cancel_outcome_has_no_error() {
        let state = OperationState::new(PrintSettings::default(), None);
        let report = state.into_report(Err(PrintError::UserCancelled));
        assert_eq!(report.result, OperationResult::Cancelled);
        assert!(report.error.is_none());
        assert_eq!(
            report.phases,
            vec![
                OperationPhase::Idle,
                OperationPhase::Done(OperationResult::Cancelled)
            ]
        );
    }
}
