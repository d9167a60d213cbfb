//! Print Settings Model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which pages of the selection get printed (by 1-based page number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSet {
    #[default]
    All,
    Even,
    Odd,
}

/// Inclusive range of 0-based page indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(page: usize) -> Self {
        Self::new(page, page)
    }
}

/// Placement order of logical pages on an N-up sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberUpLayout {
    #[default]
    LeftToRightTopToBottom,
    TopToBottomLeftToRight,
    RightToLeftTopToBottom,
    BottomToTopLeftToRight,
}

/// User or application supplied print configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintSettings {
    /// Previously selected printer name
    #[serde(default)]
    pub printer: Option<String>,
    #[serde(default = "default_copies")]
    pub copies: u32,
    #[serde(default)]
    pub collate: bool,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub page_set: PageSet,
    /// Empty means every page
    #[serde(default)]
    pub page_ranges: Vec<PageRange>,
    #[serde(default = "default_number_up")]
    pub number_up: u32,
    #[serde(default)]
    pub number_up_layout: NumberUpLayout,
    /// Scale in percent
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Caller-defined fields, carried verbatim through dialogs
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

fn default_copies() -> u32 {
    1
}

fn default_number_up() -> u32 {
    1
}

fn default_scale() -> f64 {
    100.0
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            printer: None,
            copies: default_copies(),
            collate: false,
            reverse: false,
            page_set: PageSet::All,
            page_ranges: Vec::new(),
            number_up: default_number_up(),
            number_up_layout: NumberUpLayout::default(),
            scale: default_scale(),
            custom: BTreeMap::new(),
        }
    }
}

impl PrintSettings {
    pub fn with_printer(mut self, printer: impl Into<String>) -> Self {
        self.printer = Some(printer.into());
        self
    }

    pub fn with_copies(mut self, copies: u32, collate: bool) -> Self {
        self.copies = copies;
        self.collate = collate;
        self
    }

    pub fn with_number_up(mut self, number_up: u32) -> Self {
        self.number_up = number_up;
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Logical pages per physical sheet (never zero)
    pub fn number_up(&self) -> u32 {
        self.number_up.max(1)
    }

    pub fn copies(&self) -> u32 {
        self.copies.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PrintSettings::default();
        assert_eq!(settings.copies(), 1);
        assert_eq!(settings.number_up(), 1);
        assert_eq!(settings.scale, 100.0);
        assert!(settings.page_ranges.is_empty());
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let settings = PrintSettings::default()
            .with_number_up(0)
            .with_copies(0, true);
        assert_eq!(settings.number_up(), 1);
        assert_eq!(settings.copies(), 1);
    }

    #[test]
    fn test_custom_fields_roundtrip_json() {
        let settings = PrintSettings::default()
            .with_printer("Office")
            .with_custom("watermark", "DRAFT");
        let json = serde_json::to_string(&settings).unwrap();
        let back: PrintSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_deserialize_partial() {
        let settings: PrintSettings = serde_json::from_str(r#"{"copies":3}"#).unwrap();
        assert_eq!(settings.copies, 3);
        assert_eq!(settings.number_up, 1);
        assert_eq!(settings.scale, 100.0);
    }
}
