//! CLI entry point for `mailpdf`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailpdf::config::Config;
use mailpdf::model::attachment::AttachmentKind;
use mailpdf::pipeline::{self, AttachmentOutcome, Conversion, ConvertOptions, SkipReason};
use mailpdf::render::command::CommandRasterizer;
use mailpdf::store::reader::EmlStore;
use mailpdf::store::MailSource;

#[derive(Parser)]
#[command(
    name = "mailpdf",
    version,
    about = "Convert an email and its PDF and image attachments into a single PDF"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an .eml message into one PDF
    Convert {
        /// Message file (`-` for standard input)
        path: PathBuf,
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Output file name
        #[arg(long)]
        filename: Option<String>,
        /// Replace an existing output file
        #[arg(long)]
        overwrite: bool,
        /// HTML-to-image program used to render the body
        #[arg(long, value_name = "CMD", env = "MAILPDF_RASTERIZER")]
        rasterizer: Option<String>,
        /// Do not append attachments marked inline
        #[arg(long)]
        skip_inline: bool,
        /// Print the conversion report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List attachments and what would be done with each
    Inspect {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mailpdf::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Convert {
            path,
            output,
            filename,
            overwrite,
            rasterizer,
            skip_inline,
            json,
        } => {
            let mut config = config;
            if let Some(output) = output {
                config.export.output_dir = Some(output);
            }
            if let Some(filename) = filename {
                config.export.filename = filename;
            }
            if let Some(rasterizer) = rasterizer {
                config.render.command = rasterizer;
            }
            config.export.overwrite |= overwrite;
            if skip_inline {
                config.attachments.include_inline = false;
            }
            cmd_convert(&path, &config, json)
        }
        Commands::Inspect { path, json } => cmd_inspect(&path, &config, json),
        Commands::Config => cmd_config(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailpdf::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailpdf.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Run the full pipeline and write the PDF.
fn cmd_convert(path: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    config.validate()?;

    let store = EmlStore::open(path, config.attachments.inline_cid_images)?;
    let rasterizer = CommandRasterizer::from_config(&config.render);
    let options = ConvertOptions::from(config);

    let pb = ProgressBar::new(store.attachments().len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Assembling [{bar:40.cyan/blue}] {pos}/{len} attachments")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    if json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let conversion = pipeline::convert(
        &store,
        &rasterizer,
        &options,
        Some(&|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    )?;
    pb.finish_and_clear();

    let output_dir = config
        .export
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let written = mailpdf::export::pdf::export_pdf(
        &conversion.pdf,
        &output_dir,
        &config.export.filename,
        config.export.overwrite,
    )?;

    if json {
        print_conversion_json(&conversion, &written)?;
    } else {
        print_conversion_table(&conversion, &written);
    }
    Ok(())
}

/// Show the attachment plan for a message without rendering anything.
fn cmd_inspect(path: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let store = EmlStore::open(path, false)?;
    let options = ConvertOptions::from(config);
    let attachments = store.attachments();
    let has_body = store.body_html().is_ok_and(|html| !html.trim().is_empty());

    if json {
        let items: Vec<serde_json::Value> = attachments
            .iter()
            .map(|a| {
                serde_json::json!({
                    "id": a.id,
                    "filename": a.filename,
                    "content_type": a.content_type,
                    "size": a.size,
                    "inline": a.is_inline,
                    "kind": a.kind(),
                    "skip": pipeline::plan_attachment(a, &options),
                })
            })
            .collect();
        let output = serde_json::json!({
            "subject": store.subject(),
            "has_body": has_body,
            "attachments": items,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {:<12} {}", "Subject", store.subject());
    println!(
        "  {:<12} {}",
        "Body",
        if has_body { "yes" } else { "empty" }
    );
    println!("  {:<12} {}", "Attachments", attachments.len());
    if attachments.is_empty() {
        println!();
        return Ok(());
    }
    println!();
    println!(
        "  {:<4} {:<32} {:<26} {:>9}  {}",
        "#", "Filename", "Content-Type", "Size", "Action"
    );
    println!("  {}", "-".repeat(84));
    for a in attachments {
        let action = match pipeline::plan_attachment(a, &options) {
            Some(reason) => describe_skip(&reason),
            None => match a.kind() {
                AttachmentKind::Pdf => "append pages".to_string(),
                AttachmentKind::Image => "append image page".to_string(),
                AttachmentKind::Unsupported => "skip".to_string(),
            },
        };
        let name: String = a.filename.chars().take(31).collect();
        let ctype: String = a.content_type.chars().take(25).collect();
        println!(
            "  {:<4} {:<32} {:<26} {:>9}  {}",
            a.id,
            name,
            ctype,
            format_size(a.size, BINARY),
            action
        );
    }
    println!();
    Ok(())
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailpdf", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn describe_skip(reason: &SkipReason) -> String {
    match reason {
        SkipReason::UnsupportedType => "skip (unsupported type)".to_string(),
        SkipReason::Inline => "skip (inline)".to_string(),
        SkipReason::FetchFailed(e) => format!("skip (fetch failed: {e})"),
        SkipReason::DecodeFailed(e) => format!("skip (decode failed: {e})"),
    }
}

/// Print the conversion summary as a human-readable table.
fn print_conversion_table(conversion: &Conversion, written: &Path) {
    println!();
    println!("  {:<12} {}", "Subject", conversion.subject);
    println!("  {:<12} {}", "Pages", conversion.page_count);
    println!(
        "  {:<12} {} appended, {} skipped",
        "Attachments",
        conversion.appended_count(),
        conversion.skipped_count()
    );
    for a in &conversion.attachments {
        let status = match &a.outcome {
            AttachmentOutcome::Appended { pages } => format!("{pages} page(s)"),
            AttachmentOutcome::Skipped(reason) => describe_skip(reason),
        };
        println!("    {:<4} {:<32} {}", a.id, a.filename, status);
    }
    println!("  {:<12} {}", "Output", written.display());
    println!();
}

/// Print the conversion summary as JSON.
fn print_conversion_json(conversion: &Conversion, written: &Path) -> anyhow::Result<()> {
    let mut report = serde_json::to_value(conversion)?;
    report["output"] = serde_json::json!(written.to_string_lossy());
    report["mime_type"] = serde_json::json!(mailpdf::export::MIME_TYPE);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
