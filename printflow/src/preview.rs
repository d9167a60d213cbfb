//! Preview viewers
//!
//! After a preview document is finished it is handed to a viewer exactly
//! once. The viewer owns its own lifetime; the operation only records the
//! decision it reports.

use std::path::Path;

use async_trait::async_trait;
use shared::PrintSettings;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// What the user chose in the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewDecision {
    Print,
    Cancel,
}

/// Shows a finished preview document
#[async_trait]
pub trait PreviewViewer: Send {
    async fn present(
        &mut self,
        document: &Path,
        settings: &PrintSettings,
    ) -> PrintResult<PreviewDecision>;
}

/// Outcome of [`substitute_preview_command`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub command: String,
    pub document_replaced: bool,
    pub settings_replaced: bool,
}

/// Expand `%f` (document), `%s` (settings file) and `%%` in a command line
///
/// Unknown escapes are kept as written.
pub fn substitute_preview_command(command: &str, document: &str, settings: &str) -> Substitution {
    let mut out = String::with_capacity(command.len() + document.len());
    let mut document_replaced = false;
    let mut settings_replaced = false;

    let mut chars = command.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('f') => {
                out.push_str(document);
                document_replaced = true;
            }
            Some('s') => {
                out.push_str(settings);
                settings_replaced = true;
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }

    Substitution {
        command: out,
        document_replaced,
        settings_replaced,
    }
}

/// POSIX shell single-quoting
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Viewer that runs an external command through `sh -c`
///
/// The print settings are written as JSON to a temp file available as `%s`.
/// The document path is appended when the command has no `%f`. External
/// viewers cannot report a print decision, so the result is always
/// [`PreviewDecision::Cancel`] once the command exits.
#[derive(Debug, Clone)]
pub struct CommandViewer {
    command: String,
}

impl CommandViewer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl PreviewViewer for CommandViewer {
    #[instrument(skip(self, settings), fields(document = %document.display()))]
    async fn present(
        &mut self,
        document: &Path,
        settings: &PrintSettings,
    ) -> PrintResult<PreviewDecision> {
        let json = serde_json::to_vec_pretty(settings)
            .map_err(|e| PrintError::Io(format!("Preview settings: {}", e)))?;
        let settings_file = tempfile::Builder::new()
            .prefix("settings")
            .suffix(".json")
            .tempfile()?;
        std::fs::write(settings_file.path(), json)?;

        let document_arg = shell_quote(&document.to_string_lossy());
        let settings_arg = shell_quote(&settings_file.path().to_string_lossy());
        let substituted = substitute_preview_command(&self.command, &document_arg, &settings_arg);
        let mut command_line = substituted.command;
        if !substituted.document_replaced {
            command_line.push(' ');
            command_line.push_str(&document_arg);
        }

        info!(command = %command_line, "Launching preview command");
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .status()
            .await
            .map_err(|e| PrintError::Io(format!("Preview command: {}", e)))?;

        if !status.success() {
            warn!(status = %status, "Preview command exited with failure");
        }
        // settings_file is removed here, after the command exited
        Ok(PreviewDecision::Cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_substitute_document_and_settings() {
        let s = substitute_preview_command("evince %f --settings=%s", "/tmp/a.prn", "/tmp/s.json");
        assert_eq!(s.command, "evince /tmp/a.prn --settings=/tmp/s.json");
        assert!(s.document_replaced);
        assert!(s.settings_replaced);
    }

    #[test]
    fn test_substitute_escapes() {
        let s = substitute_preview_command("echo 100%% %x trailing%", "doc", "set");
        assert_eq!(s.command, "echo 100% %x trailing%");
        assert!(!s.document_replaced);
        assert!(!s.settings_replaced);
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/tmp/it's.prn"), "'/tmp/it'\\''s.prn'");
    }

    #[tokio::test]
    async fn test_command_viewer_appends_document() {
        let dir = TempDir::new().unwrap();
        let document = dir.path().join("preview one.prn");
        std::fs::write(&document, b"%!printflow-pages 1\n").unwrap();
        let copy = dir.path().join("copy.prn");
        let script = dir.path().join("view.sh");
        std::fs::write(
            &script,
            format!("cp \"$1\" {}\n", shell_quote(&copy.to_string_lossy())),
        )
        .unwrap();

        let mut viewer = CommandViewer::new(format!("sh {}", shell_quote(&script.to_string_lossy())));
        let decision = viewer
            .present(&document, &PrintSettings::default())
            .await
            .unwrap();

        assert_eq!(decision, PreviewDecision::Cancel);
        assert_eq!(std::fs::read(&copy).unwrap(), b"%!printflow-pages 1\n");
    }

    #[tokio::test]
    async fn test_command_viewer_settings_file() {
        let dir = TempDir::new().unwrap();
        let document = dir.path().join("doc.prn");
        std::fs::write(&document, b"").unwrap();
        let captured = dir.path().join("settings.json");

        let mut viewer = CommandViewer::new(format!(
            "cp %s {} && test -f %f",
            shell_quote(&captured.to_string_lossy())
        ));
        let settings = PrintSettings::default().with_custom("tray", "manual");
        viewer.present(&document, &settings).await.unwrap();

        let json = std::fs::read_to_string(&captured).unwrap();
        let parsed: PrintSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.custom.get("tray").map(String::as_str), Some("manual"));
    }
}
