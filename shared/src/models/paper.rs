//! Paper Model

use serde::{Deserialize, Serialize};

const POINTS_PER_INCH: f64 = 72.0;
const MM_PER_INCH: f64 = 25.4;

/// Length unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Points,
    Inch,
    Mm,
}

impl Unit {
    /// Convert a length in points to this unit
    pub fn from_points(self, points: f64) -> f64 {
        match self {
            Unit::Points => points,
            Unit::Inch => points / POINTS_PER_INCH,
            Unit::Mm => points / POINTS_PER_INCH * MM_PER_INCH,
        }
    }

    /// Convert a length in this unit to points
    pub fn to_points(self, value: f64) -> f64 {
        match self {
            Unit::Points => value,
            Unit::Inch => value * POINTS_PER_INCH,
            Unit::Mm => value / MM_PER_INCH * POINTS_PER_INCH,
        }
    }
}

/// Physical paper size (portrait dimensions, in points)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSize {
    pub name: String,
    pub width: f64,
    pub height: f64,
}

impl PaperSize {
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    /// Create a paper size from millimetres
    pub fn from_mm(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self::new(name, Unit::Mm.to_points(width), Unit::Mm.to_points(height))
    }

    pub fn a4() -> Self {
        Self::from_mm("iso_a4", 210.0, 297.0)
    }

    pub fn a5() -> Self {
        Self::from_mm("iso_a5", 148.0, 210.0)
    }

    pub fn letter() -> Self {
        Self::new("na_letter", 612.0, 792.0)
    }

    pub fn legal() -> Self {
        Self::new("na_legal", 612.0, 1008.0)
    }

    /// Look up a well-known paper by name (`a4`, `iso_a4`, `letter`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "a4" | "iso_a4" => Some(Self::a4()),
            "a5" | "iso_a5" => Some(Self::a5()),
            "letter" | "na_letter" => Some(Self::letter()),
            "legal" | "na_legal" => Some(Self::legal()),
            _ => None,
        }
    }

    pub fn width_in(&self, unit: Unit) -> f64 {
        unit.from_points(self.width)
    }

    pub fn height_in(&self, unit: Unit) -> f64 {
        unit.from_points(self.height)
    }
}

impl Default for PaperSize {
    fn default() -> Self {
        Self::a4()
    }
}

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
    ReversePortrait,
    ReverseLandscape,
}

impl Orientation {
    pub fn is_landscape(self) -> bool {
        matches!(self, Orientation::Landscape | Orientation::ReverseLandscape)
    }

    /// Label used in `%%PageOrientation` comments
    pub fn dsc_label(self) -> &'static str {
        if self.is_landscape() {
            "Landscape"
        } else {
            "Portrait"
        }
    }
}

/// Page margins in points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Same margin on every side
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_in_points() {
        let a4 = PaperSize::a4();
        assert!((a4.width - 595.2756).abs() < 0.001);
        assert!((a4.height - 841.8898).abs() < 0.001);
        assert!((a4.width_in(Unit::Mm) - 210.0).abs() < 1e-9);
    }

    #[test]
    fn test_letter_in_inches() {
        let letter = PaperSize::letter();
        assert_eq!(letter.width_in(Unit::Inch), 8.5);
        assert_eq!(letter.height_in(Unit::Inch), 11.0);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(PaperSize::from_name("A4"), Some(PaperSize::a4()));
        assert_eq!(PaperSize::from_name("na_letter"), Some(PaperSize::letter()));
        assert!(PaperSize::from_name("tabloid").is_none());
    }

    #[test]
    fn test_orientation_label() {
        assert_eq!(Orientation::Portrait.dsc_label(), "Portrait");
        assert_eq!(Orientation::ReversePortrait.dsc_label(), "Portrait");
        assert_eq!(Orientation::ReverseLandscape.dsc_label(), "Landscape");
    }
}
