//! subcheck CLI
//!
//! Headless frontend for subcheck-core: check an SRT file against a
//! correction provider, normalize formatting, or inspect a file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use subcheck_core::correction::{CorrectionSession, PassOptions};
use subcheck_core::document::{export_srt, export_srt_original, parse_srt, CueLifecycle};
use subcheck_core::provider::{create_provider, ProviderType};
use subcheck_core::settings::{AppSettings, SettingsManager};
use subcheck_core::timecode::format_timecode;

#[derive(Parser)]
#[command(name = "subcheck", version, about = "Subtitle grammar and spelling correction")]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a correction pass and report or apply suggestions
    Check {
        /// Input SRT file
        input: PathBuf,

        /// Output file (default: <input>.corrected.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Correction provider (languagetool, anthropic)
        #[arg(long)]
        provider: Option<ProviderType>,

        /// API key override for the Anthropic provider
        #[arg(long)]
        api_key: Option<String>,

        /// Language code override (e.g. de-DE)
        #[arg(long)]
        language: Option<String>,

        /// Accept every suggestion and write the corrected file
        #[arg(long)]
        accept_all: bool,

        /// Print suggestions as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Parse and re-export a file in canonical SRT form, without checking
    Normalize {
        /// Input SRT file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show cue count and timing information for a file
    Info {
        /// Input SRT file
        input: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionReport {
    position: usize,
    sequence_number: u32,
    start_time: String,
    original_text: String,
    corrected_preview: Option<String>,
    edits: Vec<EditReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditReport {
    matched_text: String,
    candidates: Vec<String>,
    reason: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Check {
            input,
            output,
            provider,
            api_key,
            language,
            accept_all,
            json,
        } => check(input, output, provider, api_key, language, accept_all, json).await,
        Command::Normalize { input, output } => normalize(&input, output.as_deref()),
        Command::Info { input } => info_command(&input),
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn,subcheck=info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// check
// =============================================================================

#[allow(clippy::too_many_arguments)]
async fn check(
    input: PathBuf,
    output: Option<PathBuf>,
    provider_override: Option<ProviderType>,
    api_key: Option<String>,
    language: Option<String>,
    accept_all: bool,
    json: bool,
) -> Result<()> {
    let settings = load_settings(provider_override, api_key, language);
    let config = settings
        .provider_config()
        .context("No usable provider configuration")?;
    let provider = create_provider(config).context("Failed to create provider")?;

    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document = parse_srt(&content);
    if document.is_empty() {
        anyhow::bail!("{} contains no parseable cues", input.display());
    }
    info!(cues = document.len(), provider = provider.name(), "Checking file");

    let options = PassOptions {
        pacing_ms: settings.pacing_ms,
        retry_backoff_ms: settings.retry_backoff_ms,
    };

    let mut session = CorrectionSession::new(document);
    let summary = session
        .run_pass(provider.as_ref(), &options, |done, total| {
            debug!(done, total, "Progress");
            eprint!("\r{done}/{total} cues checked");
        })
        .await
        .context("Correction pass failed")?;
    eprintln!();

    for error in &summary.errors {
        eprintln!(
            "warning: cue {} (position {}) failed: {}",
            error.sequence_number, error.position, error.message
        );
    }

    if json {
        print_json_report(&session)?;
    } else {
        print_report(&session);
    }

    let stats = session.stats();
    eprintln!(
        "{} cues, {} with suggestions, {} failed",
        stats.total,
        stats.pending,
        summary.errors.len()
    );

    if accept_all {
        let accepted = session.accept_all();
        let path = output.unwrap_or_else(|| corrected_output_name(&input));
        std::fs::write(&path, export_srt(session.document()))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Accepted {} suggestions, wrote {}", accepted, path.display());
    } else if stats.pending > 0 {
        eprintln!("Run again with --accept-all to apply all suggestions.");
    }

    Ok(())
}

fn load_settings(
    provider_override: Option<ProviderType>,
    api_key: Option<String>,
    language: Option<String>,
) -> AppSettings {
    let manager = SettingsManager::new(SettingsManager::default_dir());
    let mut settings = manager.load();

    if let Some(provider) = provider_override {
        settings.provider = provider;
    }
    if let Some(key) = api_key {
        settings.anthropic_api_key = Some(key);
    } else if settings.anthropic_api_key.is_none() {
        settings.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
    }
    if let Some(language) = language {
        settings.language = language;
    }
    settings.normalize();
    settings
}

fn print_report(session: &CorrectionSession) {
    for (position, cue) in session.document().cues.iter().enumerate() {
        if cue.lifecycle != CueLifecycle::HasPendingEdits {
            continue;
        }
        println!(
            "cue {} [{}] (position {})",
            cue.sequence_number,
            format_timecode(cue.start_time),
            position
        );
        println!("  original:  {}", cue.original_text.replace('\n', " / "));
        if let Some(preview) = &cue.corrected_preview {
            println!("  corrected: {}", preview.replace('\n', " / "));
        }
        for edit in &cue.edits {
            println!(
                "    \"{}\" -> {} ({})",
                edit.matched_text,
                edit.candidates.join(" | "),
                edit.reason
            );
        }
    }
}

fn print_json_report(session: &CorrectionSession) -> Result<()> {
    let reports: Vec<SuggestionReport> = session
        .document()
        .cues
        .iter()
        .enumerate()
        .filter(|(_, cue)| cue.lifecycle == CueLifecycle::HasPendingEdits)
        .map(|(position, cue)| SuggestionReport {
            position,
            sequence_number: cue.sequence_number,
            start_time: format_timecode(cue.start_time),
            original_text: cue.original_text.clone(),
            corrected_preview: cue.corrected_preview.clone(),
            edits: cue
                .edits
                .iter()
                .map(|edit| EditReport {
                    matched_text: edit.matched_text.clone(),
                    candidates: edit.candidates.clone(),
                    reason: edit.reason.clone(),
                })
                .collect(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

/// foo.srt -> foo.corrected.srt
fn corrected_output_name(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = input.extension().and_then(|s| s.to_str()).unwrap_or("srt");
    input.with_file_name(format!("{stem}.corrected.{ext}"))
}

// =============================================================================
// normalize / info
// =============================================================================

fn normalize(input: &Path, output: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document = parse_srt(&content);
    if document.is_empty() {
        anyhow::bail!("{} contains no parseable cues", input.display());
    }

    let rendered = export_srt_original(&document);
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(cues = document.len(), "Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn info_command(input: &Path) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document = parse_srt(&content);

    println!("file:     {}", input.display());
    println!("cues:     {}", document.len());
    println!("duration: {}", format_timecode(document.duration()));
    if let (Some(first), Some(last)) = (document.cues.first(), document.cues.last()) {
        println!(
            "range:    {} --> {}",
            format_timecode(first.start_time),
            format_timecode(last.end_time)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrected_output_name() {
        assert_eq!(
            corrected_output_name(Path::new("foo.srt")),
            PathBuf::from("foo.corrected.srt")
        );
        assert_eq!(
            corrected_output_name(Path::new("/a/b/movie.de.srt")),
            PathBuf::from("/a/b/movie.de.corrected.srt")
        );
        assert_eq!(
            corrected_output_name(Path::new("noext")),
            PathBuf::from("noext.corrected.srt")
        );
    }
}
