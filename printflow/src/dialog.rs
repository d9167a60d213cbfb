//! Dialog seams
//!
//! Dialog widgets live in the application. The operation only sees what the
//! user applied: a printer, settings (custom fields included, untouched) and
//! a page setup.

use async_trait::async_trait;
use shared::{PageSetup, PrintSettings, Printer};
use tracing::debug;

/// What the print dialog is opened with
#[derive(Debug, Clone)]
pub struct DialogRequest {
    pub job_name: String,
    pub settings: PrintSettings,
    /// Default page setup of the operation, if any
    pub page_setup: Option<PageSetup>,
    /// Printers known when the dialog opened
    pub printers: Vec<Printer>,
}

/// How the user closed the print dialog
#[derive(Debug, Clone, PartialEq)]
pub enum DialogResponse {
    ApplyPrint {
        printer: Printer,
        settings: PrintSettings,
        page_setup: PageSetup,
        /// The user changed the page setup explicitly
        page_setup_set: bool,
    },
    ApplyPreview {
        settings: PrintSettings,
        page_setup: PageSetup,
        page_setup_set: bool,
    },
    Cancel,
}

/// Interactive print configuration
#[async_trait]
pub trait PrintDialog: Send {
    async fn run(&mut self, request: DialogRequest) -> DialogResponse;
}

/// Interactive page setup; `None` when the user cancelled
#[async_trait]
pub trait PageSetupDialog: Send {
    async fn run(&mut self, page_setup: PageSetup, settings: &PrintSettings) -> Option<PageSetup>;
}

/// Run a page-setup dialog
///
/// A cancelled dialog yields a copy of `page_setup`, or a default page setup
/// when none was given.
pub async fn run_page_setup_dialog(
    dialog: &mut dyn PageSetupDialog,
    page_setup: Option<&PageSetup>,
    settings: &PrintSettings,
) -> PageSetup {
    let initial = page_setup.cloned().unwrap_or_default();
    match dialog.run(initial.clone(), settings).await {
        Some(chosen) => chosen,
        None => {
            debug!("Page setup dialog cancelled");
            initial
        }
    }
}

/// Blocking variant of [`run_page_setup_dialog`]
///
/// Must not be called from inside an async task.
pub fn run_page_setup_dialog_blocking(
    dialog: &mut dyn PageSetupDialog,
    page_setup: Option<&PageSetup>,
    settings: &PrintSettings,
) -> PageSetup {
    futures::executor::block_on(run_page_setup_dialog(dialog, page_setup, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Orientation, PaperSize};

    struct FixedPageSetup(Option<PageSetup>);

    #[async_trait]
    impl PageSetupDialog for FixedPageSetup {
        async fn run(&mut self, _page_setup: PageSetup, _settings: &PrintSettings) -> Option<PageSetup> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_page_setup_dialog_applied() {
        let chosen = PageSetup::new(PaperSize::a5()).with_orientation(Orientation::Landscape);
        let mut dialog = FixedPageSetup(Some(chosen.clone()));
        let result = run_page_setup_dialog(&mut dialog, None, &PrintSettings::default()).await;
        assert_eq!(result, chosen);
    }

    #[tokio::test]
    async fn test_page_setup_dialog_cancel_returns_input_copy() {
        let input = PageSetup::new(PaperSize::letter());
        let mut dialog = FixedPageSetup(None);
        let result =
            run_page_setup_dialog(&mut dialog, Some(&input), &PrintSettings::default()).await;
        assert_eq!(result, input);
    }

    #[test]
    fn test_page_setup_dialog_blocking_cancel_defaults() {
        let mut dialog = FixedPageSetup(None);
        let result = run_page_setup_dialog_blocking(&mut dialog, None, &PrintSettings::default());
        assert_eq!(result, PageSetup::default());
    }
}
