//! Command-line tool configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | PRINTFLOW_SPOOL_DIR | ./spool | Root of the spool directory backend |
//! | PRINTFLOW_PRINTERS | Default:default | Printer list, see [`parse_printers`] |
//! | PRINTFLOW_PREVIEW_COMMAND | unset | Viewer command (`%f` document, `%s` settings file) |
//! | LOG_LEVEL | info | Log filter when `RUST_LOG` is unset |
//! | LOG_JSON | false | JSON log lines |
//!
//! Operation settings (`PRINTFLOW_JOB_NAME`, `PRINTFLOW_DISCOVERY_TIMEOUT_MS`, ...)
//! are read by `printflow::OperationConfig::from_env`.

use std::path::PathBuf;

use shared::{Margins, Printer, Unit};

const DEFAULT_SPOOL_DIR: &str = "./spool";
const DEFAULT_PRINTERS: &str = "Default:default";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub spool_dir: PathBuf,
    pub printers: Vec<Printer>,
    pub preview_command: Option<String>,
    pub log_level: String,
    pub log_json: bool,
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let printers = lookup("PRINTFLOW_PRINTERS").unwrap_or_else(|| DEFAULT_PRINTERS.into());
        Ok(Self {
            spool_dir: lookup("PRINTFLOW_SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPOOL_DIR)),
            printers: parse_printers(&printers)?,
            preview_command: lookup("PRINTFLOW_PREVIEW_COMMAND").filter(|c| !c.trim().is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: lookup("LOG_JSON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        })
    }
}

/// Parse a printer list such as `Office:default:margin=5,Draft,Export:virtual`
///
/// Flags after the name: `default`, `virtual`, `margin=<mm>` (uniform hard margin).
pub fn parse_printers(list: &str) -> anyhow::Result<Vec<Printer>> {
    let mut printers = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.split(':').map(str::trim);
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            anyhow::bail!("Printer entry without a name: {:?}", entry);
        }
        if printers.iter().any(|p: &Printer| p.name == name) {
            anyhow::bail!("Printer {:?} listed twice", name);
        }

        let mut printer = Printer::new(name);
        for flag in parts {
            printer = match flag {
                "default" => printer.default_printer(),
                "virtual" => printer.virtual_printer(),
                _ => match flag.strip_prefix("margin=") {
                    Some(mm) => {
                        let mm: f64 = mm
                            .parse()
                            .map_err(|_| anyhow::anyhow!("Invalid margin {:?} for {}", mm, name))?;
                        printer.with_hard_margins(Margins::uniform(Unit::Mm.to_points(mm)))
                    }
                    None => anyhow::bail!("Unknown printer flag {:?} for {}", flag, name),
                },
            };
        }
        printers.push(printer);
    }
    Ok(printers)
}
