//! Plain-text document renderer

use printflow::{PageContext, PageRenderer, PrintResult};
use shared::PageSetup;

const FONT_SIZE: f64 = 10.0;
const LINE_SPACING: f64 = 1.2;
const TAB_WIDTH: usize = 4;

/// Lays out text lines top to bottom, one `text x y content` command per line
#[derive(Debug, Clone)]
pub struct TextRenderer {
    lines: Vec<String>,
    font_size: f64,
}

impl TextRenderer {
    pub fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|line| line.replace('\t', &" ".repeat(TAB_WIDTH)))
            .collect();
        Self {
            lines,
            font_size: FONT_SIZE,
        }
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size.max(1.0);
        self
    }

    fn line_height(&self) -> f64 {
        self.font_size * LINE_SPACING
    }

    fn lines_per_page(&self, page_setup: &PageSetup) -> usize {
        // Tolerate rounding in the line height product
        ((page_setup.page_height() / self.line_height() + 1e-9).floor() as usize).max(1)
    }
}

impl PageRenderer for TextRenderer {
    fn page_count(&mut self, page_setup: &PageSetup) -> usize {
        // An empty document still prints one blank page
        self.lines.len().div_ceil(self.lines_per_page(page_setup)).max(1)
    }

    fn draw_page(&mut self, ctx: &mut PageContext<'_>, page: usize) -> PrintResult<()> {
        let per_page = self.lines_per_page(ctx.page_setup());
        let line_height = self.line_height() * ctx.scale();

        let margins = ctx.page_setup().margins;
        let hard = ctx.hard_margins();
        let x = margins.left.max(hard.left);
        let top = margins.top.max(hard.top);

        let start = page * per_page;
        let end = (start + per_page).min(self.lines.len());
        for (row, line) in self.lines[start.min(end)..end].iter().enumerate() {
            let y = top + line_height * (row as f64 + 1.0);
            ctx.write_line(&format!("text {:.2} {:.2} {}", x, y, line))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printflow::{
        Collaborators, OperationAction, OperationConfig, OperationResult, PrintOperation,
        StaticRegistry,
    };
    use shared::{Margins, PaperSize};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_page_count() {
        // Letter without margins holds 66 lines at 12pt line height
        let setup = PageSetup::new(PaperSize::letter());
        let text = "line\n".repeat(130);
        assert_eq!(TextRenderer::new(&text).page_count(&setup), 2);
        assert_eq!(TextRenderer::new("").page_count(&setup), 1);

        let narrow = setup.with_margins(Margins::uniform(300.0));
        assert_eq!(TextRenderer::new(&text).page_count(&narrow), 9);
    }

    #[test]
    fn test_tabs_expanded() {
        let renderer = TextRenderer::new("a\tb");
        assert_eq!(renderer.lines, vec!["a    b"]);
    }

    #[tokio::test]
    async fn test_preview_contains_text_commands() {
        let dir = TempDir::new().unwrap();
        let renderer = TextRenderer::new("hello\nworld");
        let mut collaborators = Collaborators::new(renderer);

        let report = PrintOperation::new(
            OperationConfig::default().with_preview_dir(dir.path()),
            Arc::new(StaticRegistry::default()),
        )
        .with_default_page_setup(
            PageSetup::new(PaperSize::letter()).with_margins(Margins::uniform(36.0)),
        )
        .run(OperationAction::Preview, &mut collaborators)
        .await;

        assert_eq!(report.result, OperationResult::Applied);
        let text = std::fs::read_to_string(report.preview_path.unwrap()).unwrap();
        assert!(text.contains("text 36.00 48.00 hello\n"));
        assert!(text.contains("text 36.00 60.00 world\n"));
    }
}
