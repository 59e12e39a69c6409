// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for dc2html.
//!
//! This binary provides the `dc2html` command for converting Discord channel
//! exports from JSON to standalone HTML transcripts.

use chrono::Duration;
use dc2html::parser::{self, Channel, Transcript};
use dc2html::{highlight, renderer};
use lexopt::prelude::*;
use snafu::{ensure, prelude::*};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Where to write the rendered output.
#[derive(Clone)]
enum OutputTarget {
    /// Write each transcript to the specified directory.
    Directory(PathBuf),
    /// Write to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    theme: String,
    chain_window_minutes: i64,
    twemoji: bool,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("cannot output multiple transcripts to stdout"))]
    MultipleFilesToStdout,

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert Discord channel exports to static HTML transcripts

Usage: {name} [OPTIONS] -o <OUTPUT> <INPUT>...

Arguments:
  <INPUT>...  Transcript JSON files or directories containing them

Options:
  -o, --output <OUTPUT>       Output directory (or - for stdout)
      --theme <NAME>          Code highlighting theme (default: {theme})
      --list-themes           List available highlighting themes and exit
      --chain-window <MIN>    Group messages from one author sent within MIN
                              minutes (default: 5)
      --no-twemoji            Do not load twemoji (for offline viewing)

Other options:
  -q, --quiet                 Suppress progress messages
  -n, --dry-run               Show what would be processed without writing
  -f, --force                 Overwrite existing output files
  -h, --help                  Print help
  -V, --version               Print version

Set RUST_LOG (e.g. RUST_LOG=debug) for diagnostic logging.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        theme = highlight::DEFAULT_THEME,
    );
}

fn list_themes() {
    let mut names: Vec<_> = highlight::theme_names().collect();
    names.sort_unstable();
    for name in names {
        println!("{name}");
    }
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output: Option<OutputTarget> = None;
    let mut theme = highlight::DEFAULT_THEME.to_owned();
    let mut chain_window_minutes: i64 = 5;
    let mut twemoji = true;
    let mut quiet = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Directory(val)
                });
            }
            Long("theme") => {
                let val: String = parser.value()?.parse()?;
                if !highlight::has_theme(&val) {
                    return Err(format!("unknown theme '{val}' (see --list-themes)").into());
                }
                theme = val;
            }
            Long("list-themes") => {
                list_themes();
                std::process::exit(0);
            }
            Long("chain-window") => {
                let val: i64 = parser
                    .value()?
                    .parse()
                    .map_err(|_| "chain-window must be a number of minutes")?;
                if val < 0 {
                    return Err("chain-window must not be negative".into());
                }
                chain_window_minutes = val;
            }
            Long("no-twemoji") => twemoji = false,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output: output.ok_or("missing required option: --output")?,
        theme,
        chain_window_minutes,
        twemoji,
        quiet,
        dry_run,
        force,
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Error> {
    init_logging();
    let cli = parse_args().context(ParseArgsSnafu)?;

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    // Collect all input files first
    let files = collect_input_files(&cli.input);
    debug!(count = files.len(), "collected input files");

    match &cli.output {
        OutputTarget::Stdout => {
            ensure!(files.len() == 1, MultipleFilesToStdoutSnafu);
            process_to_stdout(&files[0], &cli)?;
        }
        OutputTarget::Directory(dir) => {
            if !cli.dry_run {
                std::fs::create_dir_all(dir).context(CreateOutputDirSnafu)?;
            }
            for file in &files {
                process_file(file, dir, &cli)?;
            }
        }
    }

    Ok(())
}

/// Collects all JSON files from the given inputs (files and directories).
fn collect_input_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                .map(walkdir::DirEntry::into_path)
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Creates render options from CLI arguments.
fn make_render_options(cli: &Cli) -> renderer::RenderOptions {
    renderer::RenderOptions {
        chain_window: Duration::minutes(cli.chain_window_minutes),
        highlight_theme: cli.theme.clone(),
        twemoji: cli.twemoji,
        ..Default::default()
    }
}

/// Reads and parses one input file.
///
/// A top-level JSON array is taken to be a raw page of API messages; the
/// channel is then named after the file.
fn load_transcript(path: &Path) -> Result<Transcript, Error> {
    let json = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;

    if json.trim_start().starts_with('[') {
        let messages = parser::parse_api_messages(&json).context(ParseFileSnafu { path })?;
        let stem = path
            .file_stem()
            .map_or_else(|| "channel".to_owned(), |s| s.to_string_lossy().into_owned());
        return Ok(Transcript {
            channel: Channel {
                id: stem,
                name: None,
            },
            guild: None,
            roles: Vec::new(),
            messages,
        });
    }

    parser::parse_transcript(&json).context(ParseFileSnafu { path })
}

/// Processes a single file and outputs to stdout.
fn process_to_stdout(input: &Path, cli: &Cli) -> Result<(), Error> {
    if cli.dry_run {
        eprintln!("Would output {}", input.display());
        return Ok(());
    }

    let transcript = load_transcript(input)?;
    let html = renderer::render(&transcript, &make_render_options(cli));

    print!("{html}");
    Ok(())
}

/// Processes a single file and writes to the output directory.
fn process_file(input: &Path, out_dir: &Path, cli: &Cli) -> Result<(), Error> {
    // The output name depends on the channel id, so parse before anything else
    let transcript = load_transcript(input)?;
    let out_path = out_dir.join(output_file_name(&transcript.channel));

    // Handle dry-run mode
    if cli.dry_run {
        eprintln!(
            "Would write {} ({} messages)",
            out_path.display(),
            transcript.messages.len()
        );
        return Ok(());
    }

    // Check if output exists and handle overwrite
    if out_path.exists() && !cli.force {
        eprintln!(
            "Skipping {} (already exists, use --force to overwrite)",
            out_path.display()
        );
        return Ok(());
    }

    let html = renderer::render(&transcript, &make_render_options(cli));

    std::fs::write(&out_path, &html).context(WriteFileSnafu { path: &out_path })?;

    if !cli.quiet {
        eprintln!("Wrote {}", out_path.display());
    }
    Ok(())
}

/// Returns the output file name for a channel, keeping only characters that
/// are safe in file names.
fn output_file_name(channel: &Channel) -> String {
    let id: String = channel
        .id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("transcript-{id}.html")
}
