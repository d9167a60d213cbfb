//! Document renderer seam
//!
//! The operation drives pages; the application draws them.

use shared::{Margins, NumberUpLayout, PageSetup};

use crate::error::PrintResult;
use crate::surface::OutputSurface;

/// Application-side document renderer
pub trait PageRenderer: Send {
    /// Number of logical pages for the given page setup
    fn page_count(&mut self, page_setup: &PageSetup) -> usize;

    /// Page setup for a single page; the operation's page setup by default
    fn page_setup_for(&mut self, _page: usize, default: &PageSetup) -> PageSetup {
        default.clone()
    }

    /// Draw one logical page
    fn draw_page(&mut self, ctx: &mut PageContext<'_>, page: usize) -> PrintResult<()>;

    /// Called once after the last page, also when rendering failed
    fn end_print(&mut self) {}
}

/// Geometry and output access for one logical page
pub struct PageContext<'a> {
    surface: &'a mut OutputSurface,
    page_setup: &'a PageSetup,
    hard_margins: Margins,
    scale: f64,
    layout: NumberUpLayout,
    position: usize,
}

impl<'a> PageContext<'a> {
    pub(crate) fn new(
        surface: &'a mut OutputSurface,
        page_setup: &'a PageSetup,
        hard_margins: Margins,
        scale: f64,
        layout: NumberUpLayout,
        position: usize,
    ) -> Self {
        Self {
            surface,
            page_setup,
            hard_margins,
            scale,
            layout,
            position,
        }
    }

    pub fn page_setup(&self) -> &PageSetup {
        self.page_setup
    }

    /// Unprintable area of the printer; zero for N-up and previews without a printer
    pub fn hard_margins(&self) -> Margins {
        self.hard_margins
    }

    /// Scale factor (1.0 = 100 %)
    pub fn scale(&self) -> f64 {
        self.scale / 100.0
    }

    /// Units per inch of the underlying surface
    pub fn dpi(&self) -> f64 {
        self.surface.dpi()
    }

    /// Position in the page plan
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn number_up(&self) -> usize {
        self.surface.number_up()
    }

    /// Slot of this page on its physical sheet
    pub fn number_up_slot(&self) -> usize {
        self.position % self.number_up().max(1)
    }

    pub fn number_up_layout(&self) -> NumberUpLayout {
        self.layout
    }

    /// Drawable width in points: page width minus the hard margins
    pub fn printable_width(&self) -> f64 {
        (self.page_setup.page_width() - self.hard_margins.left - self.hard_margins.right).max(0.0)
    }

    /// Drawable height in points: page height minus the hard margins
    pub fn printable_height(&self) -> f64 {
        (self.page_setup.page_height() - self.hard_margins.top - self.hard_margins.bottom).max(0.0)
    }

    /// Change the current sheet's paper size mid-page
    ///
    /// Preview surfaces only; job surfaces fail with `Unsupported`.
    pub fn resize(&mut self, page_setup: &PageSetup) -> PrintResult<()> {
        self.surface.resize(page_setup)
    }

    pub fn write(&mut self, content: &[u8]) -> PrintResult<()> {
        self.surface.write_content(content)
    }

    pub fn write_line(&mut self, line: &str) -> PrintResult<()> {
        self.surface.write_content(line.as_bytes())?;
        self.surface.write_content(b"\n")
    }
}

impl std::fmt::Debug for PageContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("position", &self.position)
            .field("hard_margins", &self.hard_margins)
            .field("scale", &self.scale)
            .finish()
    }
}
