//! Console front end for the image recreation pipeline.
//!
//! Non-interactive: every input arrives as a flag, so the command works
//! headless and in scripts. The credential comes from `--api-key` or the
//! `GEMINI_API_KEY` environment variable and is never echoed.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use recreate_core::{
    ApiConfig, ImageRef, Pipeline, PipelineEvent, RequestSpec, RunOutcome, Stage, MAX_REFERENCES,
};

const DEFAULT_PROMPT: &str = "Recreate a new very realistic, sharp and defined color image, \
high resolution, with current quality standards. As if it was taken by a digital reflex camera.";

/// Recreate an image with the Gemini image generation API.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The image to recreate
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Optional style/content reference image (repeat up to twice)
    #[arg(long = "reference", short = 'r')]
    references: Vec<PathBuf>,

    /// The generation instruction
    #[arg(long, short = 'p', default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Where to write the result (default: next to the input,
    /// <stem>_recreated_<timestamp>.jpg)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// API key (falls back to the GEMINI_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Override the generation endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.references.len() > MAX_REFERENCES {
        return Err(anyhow!(
            "at most {} reference images are supported",
            MAX_REFERENCES
        ));
    }

    let api_key = cli
        .api_key
        .or_else(|| env::var("GEMINI_API_KEY").ok())
        .filter(|key| !key.trim().is_empty())
        .context("no API key: pass --api-key or set GEMINI_API_KEY")?;

    let output = match cli.output {
        Some(path) => path,
        None => default_output_path(&cli.input),
    };

    let mut config = ApiConfig::new(api_key).with_timeout(Duration::from_secs(cli.timeout_secs));
    if let Some(endpoint) = cli.endpoint {
        config = config.with_endpoint(endpoint);
    }

    let spec = RequestSpec::new(cli.prompt, ImageRef::jpeg(cli.input))
        .with_references(cli.references.into_iter().map(ImageRef::jpeg).collect());

    let pipeline = Pipeline::new(config);
    let handle = pipeline.start(spec, output)?;

    for event in handle.events().iter() {
        match event {
            PipelineEvent::Stage(Stage::Completed) | PipelineEvent::Progress(_) => {}
            PipelineEvent::Stage(stage) => println!("... {}", stage),
            PipelineEvent::Completed(path) => {
                println!("Recreated image saved to: {}", path.display())
            }
            // Terminal errors are reported through the outcome below.
            PipelineEvent::Failed { .. } | PipelineEvent::Cancelled => {}
        }
    }

    match handle.wait() {
        RunOutcome::Completed(_) => Ok(()),
        RunOutcome::Cancelled => Err(anyhow!("run was cancelled")),
        RunOutcome::Failed(e) => Err(e.into()),
    }
}

/// Mirrors the original tool's auto-naming: the result lands beside the
/// input as `<stem>_recreated_<timestamp>.jpg`.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let name = format!("{}_recreated_{}.jpg", stem, timestamp);
    match input.parent() {
        Some(dir) if dir.as_os_str().is_empty() => PathBuf::from(name),
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_lands_beside_the_input() {
        let out = default_output_path(&PathBuf::from("/photos/cat.jpg"));
        let name = out.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(out.parent().unwrap(), PathBuf::from("/photos"));
        assert!(name.starts_with("cat_recreated_"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn bare_filename_gets_a_bare_output_name() {
        let out = default_output_path(&PathBuf::from("cat.jpg"));
        assert!(out.parent().map(|p| p.as_os_str().is_empty()).unwrap_or(true));
    }
}
