//! Extract text from a PDF file
//!
//! Prints the extracted text, or with `--analyze` a JSON summary of what
//! each pipeline stage produced.
//!
//! Usage:
//!   cargo run --release --bin pdf_to_text -- document.pdf
//!   RUST_LOG=debug cargo run --release --bin pdf_to_text -- document.pdf --analyze

use pdf_ingest::{ExtractOptions, PdfTextParser};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

struct CliConfig {
    path: PathBuf,
    analyze: bool,
    options: ExtractOptions,
}

impl CliConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut path = None;
        let mut analyze = false;
        let mut options = ExtractOptions::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--analyze" => {
                    analyze = true;
                },
                "--no-raw-scan" => {
                    options = options.with_raw_stream_scan(false);
                },
                "--space-threshold" => {
                    i += 1;
                    let value = args.get(i).ok_or("--space-threshold needs a value")?;
                    let threshold = value
                        .parse()
                        .map_err(|_| format!("invalid space threshold: {}", value))?;
                    options = options.with_tj_space_threshold(threshold);
                },
                flag if flag.starts_with("--") => {
                    return Err(format!("unknown option: {}", flag));
                },
                file => {
                    path = Some(PathBuf::from(file));
                },
            }
            i += 1;
        }

        let path = path.ok_or("missing input file")?;
        Ok(Self {
            path,
            analyze,
            options,
        })
    }
}

fn run(config: CliConfig) -> pdf_ingest::Result<()> {
    let bytes = std::fs::read(&config.path)?;
    let parser = PdfTextParser::with_options(&bytes, config.options);
    let start = Instant::now();

    if config.analyze {
        let report = parser.parse_detailed()?;
        let summary = serde_json::json!({
            "file": config.path.display().to_string(),
            "bytes": bytes.len(),
            "analysis": report.analysis,
            "objects": report.object_count,
            "streams": report.stream_count,
            "font_names": report.font_count,
            "fragments": report.fragments.len(),
            "characters": report.text().chars().count(),
            "elapsed_ms": start.elapsed().as_millis() as u64,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing analysis: {}", e),
        }
    } else {
        let text = parser.parse();
        if text.is_empty() {
            log::warn!("No text extracted from {}", config.path.display());
        }
        println!("{}", text);
        log::info!("Extracted in {:?}", start.elapsed());
    }

    Ok(())
}

fn main() {
    env_logger::init();

    let config = match CliConfig::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: pdf_to_text <file.pdf> [--analyze] [--no-raw-scan] [--space-threshold N]");
            process::exit(2);
        },
    };

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
