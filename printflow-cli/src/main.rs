mod config;
mod logger;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use printflow::{
    Backend, Collaborators, CommandViewer, OperationAction, OperationConfig, OperationResult,
    PrintOperation, SpoolBackend, StaticRegistry,
};
use shared::{Margins, Orientation, PageRange, PageSet, PageSetup, PaperSize, PrintSettings};

use config::Config;
use render::TextRenderer;

const BACKEND_NAME: &str = "spool";
/// Half an inch
const DEFAULT_MARGIN: f64 = 36.0;

#[derive(Parser)]
#[command(name = "printflow")]
#[command(author, version, about = "Print or preview text files through a spool directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print (or preview) a text file
    Print(PrintArgs),

    /// List the configured printers as JSON
    Printers,
}

#[derive(Args)]
struct PrintArgs {
    /// Text file to print
    file: PathBuf,

    /// Printer name (default printer when omitted)
    #[arg(short, long)]
    printer: Option<String>,

    /// Write a preview document instead of printing
    #[arg(long)]
    preview: bool,

    /// Number of copies
    #[arg(short = 'n', long, default_value_t = 1)]
    copies: u32,

    /// Collate copies
    #[arg(long)]
    collate: bool,

    /// Print pages in reverse order
    #[arg(long)]
    reverse: bool,

    /// Pages to print, 1-based (e.g. "1-3,5")
    #[arg(long, value_parser = parse_page_selection)]
    pages: Option<PageSelection>,

    /// Even or odd pages only
    #[arg(long, value_enum, default_value = "all")]
    page_set: PageSetArg,

    /// Logical pages per sheet
    #[arg(long, default_value_t = 1)]
    number_up: u32,

    /// Paper name (a4, a5, letter, legal)
    #[arg(long, default_value = "a4")]
    paper: String,

    #[arg(long)]
    landscape: bool,

    /// Scale in percent
    #[arg(long, default_value_t = 100.0)]
    scale: f64,

    /// Job name shown by the spooler (default: file name)
    #[arg(long, env = "PRINTFLOW_JOB_NAME")]
    job_name: Option<String>,

    /// Custom setting passed through untouched (key=value)
    #[arg(short = 'o', long = "option", value_parser = parse_key_value)]
    options: Vec<(String, String)>,

    /// Fail instead of cancelling when no printer is available
    #[arg(long)]
    require_printer: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PageSetArg {
    All,
    Even,
    Odd,
}

impl From<PageSetArg> for PageSet {
    fn from(arg: PageSetArg) -> Self {
        match arg {
            PageSetArg::All => PageSet::All,
            PageSetArg::Even => PageSet::Even,
            PageSetArg::Odd => PageSet::Odd,
        }
    }
}

#[derive(Debug, Clone)]
struct PageSelection(Vec<PageRange>);

/// `1-3,5` -> pages 0..=2 and 4
fn parse_page_ranges(list: &str) -> Result<Vec<PageRange>, String> {
    let parse = |n: &str| -> Result<usize, String> {
        match n.trim().parse::<usize>() {
            Ok(page) if page >= 1 => Ok(page - 1),
            _ => Err(format!("invalid page number {:?}", n.trim())),
        }
    };

    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(format!("range {:?} runs backwards", part));
                }
                Ok(PageRange::new(start, end))
            }
            None => parse(part).map(PageRange::single),
        })
        .collect()
}

fn parse_page_selection(list: &str) -> Result<PageSelection, String> {
    parse_page_ranges(list).map(PageSelection)
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got {:?}", s)),
    }
}

impl PrintArgs {
    fn page_setup(&self) -> Result<PageSetup> {
        let paper = PaperSize::from_name(&self.paper)
            .ok_or_else(|| anyhow!("Unknown paper size {:?}", self.paper))?;
        let orientation = if self.landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        Ok(PageSetup::new(paper)
            .with_orientation(orientation)
            .with_margins(Margins::uniform(DEFAULT_MARGIN)))
    }

    fn settings(&self) -> PrintSettings {
        let mut settings = PrintSettings {
            printer: self.printer.clone(),
            reverse: self.reverse,
            page_set: self.page_set.into(),
            page_ranges: self.pages.clone().map(|p| p.0).unwrap_or_default(),
            scale: self.scale,
            ..PrintSettings::default()
                .with_copies(self.copies, self.collate)
                .with_number_up(self.number_up)
        };
        settings.custom.extend(self.options.iter().cloned());
        settings
    }

    fn job_name(&self) -> String {
        self.job_name.clone().unwrap_or_else(|| {
            self.file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".into())
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    logger::init_logger(level, config.log_json)?;

    let backend = Arc::new(SpoolBackend::with_printers(
        BACKEND_NAME,
        &config.spool_dir,
        config.printers.clone(),
    ));

    match cli.command {
        Commands::Printers => {
            let printers = backend.listing().printers();
            println!("{}", serde_json::to_string_pretty(&printers)?);
        }
        Commands::Print(args) => {
            let registry = Arc::new(StaticRegistry::new(vec![backend as Arc<dyn Backend>]));
            print_file(args, &config, registry).await?;
        }
    }

    Ok(())
}

async fn print_file(args: PrintArgs, config: &Config, registry: Arc<StaticRegistry>) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let operation_config = OperationConfig::from_env()
        .with_job_name(args.job_name())
        .with_require_printer(args.require_printer);
    let operation = PrintOperation::new(operation_config, registry)
        .with_settings(args.settings())
        .with_default_page_setup(args.page_setup()?);

    let mut collaborators = Collaborators::new(TextRenderer::new(&text));
    let action = if args.preview {
        if let Some(command) = &config.preview_command {
            collaborators = collaborators.with_viewer(CommandViewer::new(command.clone()));
        }
        OperationAction::Preview
    } else {
        OperationAction::Print
    };

    let cancel = operation.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling print operation");
            cancel.cancel();
        }
    });

    let report = operation.run(action, &mut collaborators).await;
    match report.result {
        OperationResult::Applied => match &report.preview_path {
            Some(path) => println!("{}", path.display()),
            None => println!(
                "Printed {} page(s) on {}",
                report.pages_printed,
                report.printer.as_ref().map_or("?", |p| p.name.as_str())
            ),
        },
        OperationResult::InProgress => println!("Job submitted"),
        OperationResult::Cancelled => println!("Cancelled"),
        OperationResult::Error => {
            return Err(report
                .error
                .map(anyhow::Error::from)
                .unwrap_or_else(|| anyhow!("Print operation failed")));
        }
    }
    Ok(())
}
