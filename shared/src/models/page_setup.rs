//! Page Setup Model

use serde::{Deserialize, Serialize};

use super::paper::{Margins, Orientation, PaperSize, Unit};

/// Reference resolution of every output surface unless overridden
pub const REFERENCE_DPI: f64 = 72.0;

/// Page geometry chosen by the user or the application
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSetup {
    pub paper: PaperSize,
    #[serde(default)]
    pub orientation: Orientation,
    /// Manual (user) margins
    #[serde(default)]
    pub margins: Margins,
    /// Resolution override in units per inch
    #[serde(default)]
    pub dpi: Option<f64>,
}

impl PageSetup {
    pub fn new(paper: PaperSize) -> Self {
        Self {
            paper,
            ..Default::default()
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// Paper width as seen after rotation
    pub fn paper_width(&self) -> f64 {
        if self.orientation.is_landscape() {
            self.paper.height
        } else {
            self.paper.width
        }
    }

    /// Paper height as seen after rotation
    pub fn paper_height(&self) -> f64 {
        if self.orientation.is_landscape() {
            self.paper.width
        } else {
            self.paper.height
        }
    }

    pub fn paper_width_in(&self, unit: Unit) -> f64 {
        unit.from_points(self.paper_width())
    }

    pub fn paper_height_in(&self, unit: Unit) -> f64 {
        unit.from_points(self.paper_height())
    }

    /// Printable width inside the manual margins
    pub fn page_width(&self) -> f64 {
        (self.paper_width() - self.margins.left - self.margins.right).max(0.0)
    }

    /// Printable height inside the manual margins
    pub fn page_height(&self) -> f64 {
        (self.paper_height() - self.margins.top - self.margins.bottom).max(0.0)
    }

    pub fn resolution(&self) -> f64 {
        self.dpi.unwrap_or(REFERENCE_DPI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_swaps_dimensions() {
        let setup = PageSetup::new(PaperSize::letter()).with_orientation(Orientation::Landscape);
        assert_eq!(setup.paper_width(), 792.0);
        assert_eq!(setup.paper_height(), 612.0);
        // The paper itself keeps portrait dimensions
        assert_eq!(setup.paper.width, 612.0);
    }

    #[test]
    fn test_page_area_inside_margins() {
        let setup = PageSetup::new(PaperSize::letter()).with_margins(Margins::uniform(36.0));
        assert_eq!(setup.page_width(), 540.0);
        assert_eq!(setup.page_height(), 720.0);
    }

    #[test]
    fn test_default_resolution() {
        let setup = PageSetup::default();
        assert_eq!(setup.resolution(), REFERENCE_DPI);
        assert_eq!(setup.with_dpi(300.0).resolution(), 300.0);
    }
}
