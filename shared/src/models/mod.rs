//! Data models
//!
//! All lengths are stored in PostScript points (1/72 inch).

pub mod page_setup;
pub mod paper;
pub mod printer;
pub mod settings;

// Re-exports
pub use page_setup::*;
pub use paper::*;
pub use printer::*;
pub use settings::*;
