//! Output surfaces
//!
//! A surface is either a preview document on disk or the spool stream of a
//! print job. Both write the same line-oriented document stream:
//!
//! ```text
//! %!printflow-pages 1
//! %%Page: 1
//! %%PageSize: 595.28 841.89
//! %%PageOrientation: Portrait      (job surfaces only)
//! ...renderer content...
//! %%ShowPage
//! %%Pages: 1
//! %%EOF
//! ```
//!
//! With N-up printing several logical pages share one physical sheet, so
//! sheets only start and end at the positions given by
//! [`is_first_of_physical_page`] and [`is_last_of_physical_page`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use shared::{PageSetup, PrintSettings, REFERENCE_DPI};
use tracing::{debug, info, warn};

use crate::backend::SpoolWriter;
use crate::error::{PrintError, PrintResult};
use crate::job::PrintJob;

const DOCUMENT_HEADER: &str = "%!printflow-pages 1";
const PREVIEW_PREFIX: &str = "preview";
const PREVIEW_SUFFIX: &str = ".prn";

/// What the operation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    Print,
    Preview,
}

/// `true` when `position` starts a physical sheet
pub fn is_first_of_physical_page(position: usize, number_up: usize) -> bool {
    number_up < 2 || position % number_up == 0
}

/// `true` when a physical page break follows `position`
pub fn is_last_of_physical_page(position: usize, number_up: usize, last_position: usize) -> bool {
    number_up < 2 || (position + 1) % number_up == 0 || position == last_position
}

/// Lengths are written with at most two decimals, trailing zeros removed
fn format_length(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone)]
enum SurfaceKind {
    Preview { path: PathBuf },
    Job { job_id: uuid::Uuid },
}

/// Result of [`OutputSurface::finish`]
#[derive(Debug, Clone, PartialEq)]
pub enum FinishedSurface {
    /// Preview document, left on disk for the viewer
    Preview { path: PathBuf, sheets: usize },
    /// Spool stream handed back to the job's backend
    Job { sheets: usize },
}

impl FinishedSurface {
    pub fn preview_path(&self) -> Option<&Path> {
        match self {
            FinishedSurface::Preview { path, .. } => Some(path),
            FinishedSurface::Job { .. } => None,
        }
    }

    pub fn sheets(&self) -> usize {
        match self {
            FinishedSurface::Preview { sheets, .. } | FinishedSurface::Job { sheets } => *sheets,
        }
    }
}

/// Paginated output target
///
/// [`OutputSurface::finish`] consumes the surface. Dropping an unfinished
/// surface closes its stream without a trailer.
pub struct OutputSurface {
    kind: SurfaceKind,
    writer: Option<SpoolWriter>,
    dpi: f64,
    number_up: usize,
    pages_to_print: usize,
    size: (f64, f64),
    sheets: usize,
    sheet_open: bool,
}

impl OutputSurface {
    fn new(kind: SurfaceKind, writer: SpoolWriter, dpi: f64, number_up: usize) -> Self {
        Self {
            kind,
            writer: Some(writer),
            dpi,
            number_up,
            pages_to_print: 0,
            size: (0.0, 0.0),
            sheets: 0,
            sheet_open: false,
        }
    }

    pub fn mode(&self) -> SurfaceMode {
        match self.kind {
            SurfaceKind::Preview { .. } => SurfaceMode::Preview,
            SurfaceKind::Job { .. } => SurfaceMode::Print,
        }
    }

    /// Units per inch of this surface
    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    pub fn number_up(&self) -> usize {
        self.number_up
    }

    /// Current physical sheet size in surface units
    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    /// Physical sheets started so far
    pub fn sheets(&self) -> usize {
        self.sheets
    }

    pub fn pages_to_print(&self) -> usize {
        self.pages_to_print
    }

    /// Number of plan positions; the last one always ends a sheet
    pub fn set_pages_to_print(&mut self, pages: usize) {
        self.pages_to_print = pages;
    }

    fn physical_size(&self, page_setup: &PageSetup) -> (f64, f64) {
        let scale = self.dpi / REFERENCE_DPI;
        match self.kind {
            SurfaceKind::Preview { .. } => (
                page_setup.paper_width() * scale,
                page_setup.paper_height() * scale,
            ),
            // Jobs keep the paper upright and carry the rotation separately
            SurfaceKind::Job { .. } => (
                page_setup.paper.width * scale,
                page_setup.paper.height * scale,
            ),
        }
    }

    fn emit(&mut self, line: &str) -> PrintResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PrintError::Io("Surface stream is closed".into()))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn emit_size(&mut self) -> PrintResult<()> {
        let line = format!(
            "%%PageSize: {} {}",
            format_length(self.size.0),
            format_length(self.size.1)
        );
        self.emit(&line)
    }

    /// Start the logical page at plan `position`
    pub fn begin_page(&mut self, page_setup: &PageSetup, position: usize) -> PrintResult<()> {
        if !is_first_of_physical_page(position, self.number_up) {
            return Ok(());
        }
        if self.sheet_open {
            self.emit("%%ShowPage")?;
        }

        self.sheets += 1;
        self.sheet_open = true;
        self.size = self.physical_size(page_setup);

        let header = format!("%%Page: {}", self.sheets);
        self.emit(&header)?;
        self.emit_size()?;
        if let SurfaceKind::Job { .. } = self.kind {
            let orientation = format!("%%PageOrientation: {}", page_setup.orientation.dsc_label());
            self.emit(&orientation)?;
        }
        Ok(())
    }

    /// End the logical page at plan `position`
    pub fn end_page(&mut self, position: usize) -> PrintResult<()> {
        let last = self.pages_to_print.saturating_sub(1);
        if self.sheet_open && is_last_of_physical_page(position, self.number_up, last) {
            self.emit("%%ShowPage")?;
            self.sheet_open = false;
        }
        Ok(())
    }

    /// Change the sheet size in place (preview only)
    pub fn resize(&mut self, page_setup: &PageSetup) -> PrintResult<()> {
        match self.kind {
            SurfaceKind::Preview { .. } => {
                self.size = self.physical_size(page_setup);
                if self.sheet_open {
                    self.emit_size()?;
                }
                Ok(())
            }
            SurfaceKind::Job { .. } => Err(PrintError::Unsupported(
                "Job surfaces cannot be resized".into(),
            )),
        }
    }

    /// Renderer content for the current sheet
    pub fn write_content(&mut self, content: &[u8]) -> PrintResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PrintError::Io("Surface stream is closed".into()))?;
        writer.write_all(content)?;
        Ok(())
    }

    /// Close any open sheet, write the trailer and close the stream
    pub fn finish(mut self) -> PrintResult<FinishedSurface> {
        if self.sheet_open {
            self.emit("%%ShowPage")?;
            self.sheet_open = false;
        }
        let trailer = format!("%%Pages: {}", self.sheets);
        self.emit(&trailer)?;
        self.emit("%%EOF")?;

        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let finished = match &self.kind {
            SurfaceKind::Preview { path } => FinishedSurface::Preview {
                path: path.clone(),
                sheets: self.sheets,
            },
            SurfaceKind::Job { job_id } => {
                debug!(job_id = %job_id, sheets = self.sheets, "Job spool finished");
                FinishedSurface::Job {
                    sheets: self.sheets,
                }
            }
        };
        Ok(finished)
    }
}

impl Drop for OutputSurface {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            warn!(kind = ?self.kind, "Output surface dropped before finish");
            let _ = writer.flush();
        }
    }
}

impl std::fmt::Debug for OutputSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSurface")
            .field("kind", &self.kind)
            .field("dpi", &self.dpi)
            .field("number_up", &self.number_up)
            .field("sheets", &self.sheets)
            .field("open", &self.writer.is_some())
            .finish()
    }
}

/// Creates output surfaces for an operation
#[derive(Debug, Clone, Default)]
pub struct SurfaceProvisioner {
    preview_dir: Option<PathBuf>,
}

impl SurfaceProvisioner {
    /// Preview documents go to the system temp directory
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preview_dir = Some(dir.into());
        self
    }

    pub fn preview_dir(&self) -> Option<&Path> {
        self.preview_dir.as_deref()
    }

    /// Open a surface for `mode`; print mode needs the job to spool into
    pub fn provision(
        &self,
        mode: SurfaceMode,
        job: Option<&PrintJob>,
        settings: &PrintSettings,
        page_setup: &PageSetup,
    ) -> PrintResult<OutputSurface> {
        let number_up = settings.number_up() as usize;
        let mut surface = match mode {
            SurfaceMode::Preview => {
                let (file, path) = self.create_preview_file()?;
                info!(path = %path.display(), "Preview surface created");
                OutputSurface::new(
                    SurfaceKind::Preview { path },
                    Box::new(BufWriter::new(file)),
                    page_setup.resolution(),
                    number_up,
                )
            }
            SurfaceMode::Print => {
                let job = job.ok_or_else(|| {
                    PrintError::SurfaceCreation("No print job to spool into".into())
                })?;
                let writer = job
                    .backend()
                    .open_spool(job.ticket())
                    .map_err(|e| PrintError::SurfaceCreation(e.into_message()))?;
                info!(job_id = %job.ticket().id, printer = %job.ticket().printer.name, "Job surface created");
                OutputSurface::new(
                    SurfaceKind::Job {
                        job_id: job.ticket().id,
                    },
                    writer,
                    REFERENCE_DPI,
                    number_up,
                )
            }
        };

        surface.size = surface.physical_size(page_setup);
        surface.emit(DOCUMENT_HEADER)?;
        Ok(surface)
    }

    fn create_preview_file(&self) -> PrintResult<(File, PathBuf)> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREVIEW_PREFIX).suffix(PREVIEW_SUFFIX);
        let temp = match &self.preview_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| PrintError::SurfaceCreation(format!("Preview file: {}", e)))?;

        temp.keep()
            .map_err(|e| PrintError::SurfaceCreation(format!("Preview file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};
    use crate::resolver::ResolvedPrinter;
    use shared::{Orientation, PaperSize, Printer};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn preview(dir: &TempDir, settings: &PrintSettings, setup: &PageSetup) -> OutputSurface {
        SurfaceProvisioner::new()
            .with_preview_dir(dir.path())
            .provision(SurfaceMode::Preview, None, settings, setup)
            .unwrap()
    }

    fn render(surface: &mut OutputSurface, setup: &PageSetup, pages: usize) {
        surface.set_pages_to_print(pages);
        for position in 0..pages {
            surface.begin_page(setup, position).unwrap();
            surface
                .write_content(format!("page {}\n", position).as_bytes())
                .unwrap();
            surface.end_page(position).unwrap();
        }
    }

    #[test]
    fn test_break_rules() {
        assert!(is_first_of_physical_page(5, 1));
        assert!(is_first_of_physical_page(4, 4));
        assert!(!is_first_of_physical_page(5, 4));

        let breaks: Vec<usize> = (0..10)
            .filter(|&p| is_last_of_physical_page(p, 4, 9))
            .collect();
        assert_eq!(breaks, vec![3, 7, 9]);
    }

    #[test]
    fn test_format_length() {
        assert_eq!(format_length(612.0), "612");
        assert_eq!(format_length(595.2755), "595.28");
        assert_eq!(format_length(841.5), "841.5");
    }

    #[test]
    fn test_preview_three_pages() {
        let dir = TempDir::new().unwrap();
        let setup = PageSetup::new(PaperSize::letter());
        let mut surface = preview(&dir, &PrintSettings::default(), &setup);
        assert_eq!(surface.dpi(), 72.0);
        render(&mut surface, &setup, 3);

        let finished = surface.finish().unwrap();
        let path = finished.preview_path().unwrap().to_path_buf();
        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("preview") && name.ends_with(".prn"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("%!printflow-pages 1\n"));
        assert_eq!(text.matches("%%PageSize: 612 792").count(), 3);
        assert_eq!(text.matches("%%ShowPage").count(), 3);
        assert!(text.ends_with("%%Pages: 3\n%%EOF\n"));
        assert!(!text.contains("%%PageOrientation"));
    }

    #[test]
    fn test_preview_landscape_with_dpi_override() {
        let dir = TempDir::new().unwrap();
        let setup = PageSetup::new(PaperSize::letter())
            .with_orientation(Orientation::Landscape)
            .with_dpi(144.0);
        let mut surface = preview(&dir, &PrintSettings::default(), &setup);
        render(&mut surface, &setup, 1);

        let finished = surface.finish().unwrap();
        let text = std::fs::read_to_string(finished.preview_path().unwrap()).unwrap();
        assert!(text.contains("%%PageSize: 1584 1224\n"));
    }

    #[test]
    fn test_number_up_breaks() {
        let dir = TempDir::new().unwrap();
        let setup = PageSetup::new(PaperSize::letter());
        let settings = PrintSettings::default().with_number_up(4);
        let mut surface = preview(&dir, &settings, &setup);
        render(&mut surface, &setup, 10);

        let finished = surface.finish().unwrap();
        assert_eq!(finished.sheets(), 3);
        let text = std::fs::read_to_string(finished.preview_path().unwrap()).unwrap();

        // Sheet breaks follow positions 3, 7 and the last position
        let lines: Vec<&str> = text.lines().collect();
        let after: Vec<&str> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| **line == "%%ShowPage")
            .map(|(i, _)| lines[i - 1])
            .collect();
        assert_eq!(after, vec!["page 3", "page 7", "page 9"]);
    }

    #[test]
    fn test_finish_output_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let setup = PageSetup::default();
        let read = |surface: OutputSurface| {
            let finished = surface.finish().unwrap();
            std::fs::read(finished.preview_path().unwrap()).unwrap()
        };

        let mut first = preview(&dir, &PrintSettings::default(), &setup);
        render(&mut first, &setup, 2);
        let mut second = preview(&dir, &PrintSettings::default(), &setup);
        render(&mut second, &setup, 2);

        assert_eq!(read(first), read(second));
    }

    #[test]
    fn test_finish_closes_open_sheet() {
        let dir = TempDir::new().unwrap();
        let setup = PageSetup::default();
        let mut surface = preview(&dir, &PrintSettings::default(), &setup);
        surface.set_pages_to_print(2);
        surface.begin_page(&setup, 0).unwrap();

        let finished = surface.finish().unwrap();
        let text = std::fs::read_to_string(finished.preview_path().unwrap()).unwrap();
        assert!(text.ends_with("%%ShowPage\n%%Pages: 1\n%%EOF\n"));
    }

    #[test]
    fn test_preview_dir_missing() {
        let dir = TempDir::new().unwrap();
        let result = SurfaceProvisioner::new()
            .with_preview_dir(dir.path().join("missing"))
            .provision(
                SurfaceMode::Preview,
                None,
                &PrintSettings::default(),
                &PageSetup::default(),
            );
        assert!(matches!(result, Err(PrintError::SurfaceCreation(_))));
    }

    fn job_for(backend: Arc<MemoryBackend>) -> PrintJob {
        let resolved = ResolvedPrinter {
            printer: Printer::new("Laser").with_backend("mem"),
            backend,
        };
        PrintJob::new("doc", &resolved, PrintSettings::default(), PageSetup::default())
    }

    #[test]
    fn test_job_surface_keeps_paper_upright() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let job = job_for(backend.clone());
        let setup = PageSetup::new(PaperSize::letter())
            .with_orientation(Orientation::Landscape)
            .with_dpi(300.0);

        let mut surface = SurfaceProvisioner::new()
            .provision(SurfaceMode::Print, Some(&job), &PrintSettings::default(), &setup)
            .unwrap();
        assert_eq!(surface.dpi(), 72.0);
        assert_eq!(surface.mode(), SurfaceMode::Print);
        assert!(matches!(
            surface.resize(&setup),
            Err(PrintError::Unsupported(_))
        ));
        render(&mut surface, &setup, 1);
        assert_eq!(surface.finish().unwrap(), FinishedSurface::Job { sheets: 1 });
        assert_eq!(backend.open_spools(), 1);
    }

    #[test]
    fn test_job_surface_open_failure() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        backend.fail_open("queue paused");
        let job = job_for(backend.clone());

        let result = SurfaceProvisioner::new().provision(
            SurfaceMode::Print,
            Some(&job),
            &PrintSettings::default(),
            &PageSetup::default(),
        );
        assert_eq!(
            result.err(),
            Some(PrintError::SurfaceCreation("queue paused".into()))
        );
        assert!(backend.listing().printers().is_empty());
    }
}
