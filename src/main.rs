//! mdocx - Markdown to DOCX converter

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::info;

use mdocx::util::decode_text;
use mdocx::{ConvertOptions, Converter, FsLoader, PageSize};

#[derive(Parser)]
#[command(name = "mdocx")]
#[command(version, about = "Markdown to Word converter", long_about = None)]
#[command(after_help = "EXAMPLES:
    mdocx notes.md                     Write notes.docx next to notes.md
    mdocx notes.md out.docx -t Notes   Set the document title
    mdocx big.md --report report.json  Save the conversion report")]
struct Cli {
    /// Input Markdown file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (defaults to INPUT with a .docx extension)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Document title (defaults to the input file stem)
    #[arg(short, long)]
    title: Option<String>,

    /// JSON file with conversion options
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Page size: a4, a5, a3, letter, legal or tabloid
    #[arg(long, value_name = "SIZE")]
    page_size: Option<String>,

    /// Body font family
    #[arg(long)]
    font: Option<String>,

    /// Body font size in points
    #[arg(long)]
    font_size: Option<f32>,

    /// Skip text normalization before parsing
    #[arg(long)]
    no_preprocess: bool,

    /// Parse inputs above this many bytes in chunks (0 disables chunking)
    #[arg(long, value_name = "BYTES")]
    chunk_threshold: Option<usize>,

    /// Insert the title as a level-1 heading
    #[arg(long)]
    title_heading: bool,

    /// Write the conversion report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,

    /// Log more (repeat for debug output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let options = build_options(cli)?;

    let bytes = std::fs::read(&cli.input)
        .map_err(|e| format!("cannot read {}: {e}", cli.input.display()))?;
    let text = decode_text(&bytes, None);

    let title = cli.title.clone().unwrap_or_else(|| {
        cli.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("docx"));
    let base_dir = cli
        .input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let converter = Converter::new(options).with_loader(FsLoader::new(base_dir));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string())?;
    let conversion = runtime
        .block_on(converter.convert(&text, &title))
        .map_err(|e| e.to_string())?;

    std::fs::write(&output, &conversion.bytes)
        .map_err(|e| format!("cannot write {}: {e}", output.display()))?;

    let report = &conversion.report;
    info!(
        "{} elements, {} images, {} footnotes",
        report.elements, report.images, report.footnotes
    );
    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(report).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    }

    if !cli.quiet {
        let degraded = report.degradations().len();
        if degraded > 0 {
            println!(
                "Wrote {} ({degraded} degraded element(s))",
                output.display()
            );
        } else {
            println!("Wrote {}", output.display());
        }
    }
    Ok(())
}

/// Start from the config file (or defaults) and apply flag overrides.
fn build_options(cli: &Cli) -> Result<ConvertOptions, String> {
    let mut options = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            ConvertOptions::from_json(&json).map_err(|e| e.to_string())?
        }
        None => ConvertOptions::default(),
    };

    if let Some(name) = &cli.page_size {
        let page_size =
            PageSize::from_name(name).ok_or_else(|| format!("unknown page size: {name}"))?;
        options = options.with_page_size(page_size);
    }
    if cli.font.is_some() || cli.font_size.is_some() {
        let family = cli.font.clone().unwrap_or_else(|| options.font_family.clone());
        let size = cli.font_size.unwrap_or(options.font_size);
        options = options.with_font(family, size);
    }
    if cli.no_preprocess {
        options = options.with_preprocessing(false);
    }
    if let Some(threshold) = cli.chunk_threshold {
        options = options.with_chunk_threshold(threshold);
    }
    if cli.title_heading {
        options = options.with_title_heading(true);
    }

    options.validate().map_err(|e| e.to_string())?;
    Ok(options)
}
