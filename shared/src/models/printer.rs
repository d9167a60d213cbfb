//! Printer Model

use serde::{Deserialize, Serialize};

use super::paper::{Margins, PaperSize};

/// Hard margins that only apply to one paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMargins {
    /// Paper name (e.g. "iso_a4")
    pub paper: String,
    pub margins: Margins,
}

/// Printer snapshot as discovered by a backend
///
/// Identified by its unique `name`. Virtual printers (export-to-file style
/// targets) are never picked automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Printer {
    pub name: String,
    /// Name of the backend that discovered this printer
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_virtual: bool,
    /// Non-printable area for any paper
    #[serde(default)]
    pub hard_margins: Option<Margins>,
    #[serde(default)]
    pub paper_margins: Vec<PaperMargins>,
}

impl Printer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend: String::new(),
            description: None,
            is_default: false,
            is_virtual: false,
            hard_margins: None,
            paper_margins: Vec::new(),
        }
    }

    /// Mark as the system default printer
    pub fn default_printer(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Mark as a virtual (non-physical) target
    pub fn virtual_printer(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hard_margins(mut self, margins: Margins) -> Self {
        self.hard_margins = Some(margins);
        self
    }

    pub fn with_paper_margins(mut self, paper: impl Into<String>, margins: Margins) -> Self {
        self.paper_margins.push(PaperMargins {
            paper: paper.into(),
            margins,
        });
        self
    }

    /// Hard margins for a paper, falling back to the general ones
    pub fn hard_margins_for(&self, paper: &PaperSize) -> Option<Margins> {
        self.paper_margins
            .iter()
            .find(|m| m.paper == paper.name)
            .map(|m| m.margins)
            .or(self.hard_margins)
    }
}
