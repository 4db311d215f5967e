//! Command-line arguments and the run pipeline
//!
//! [`resolve_request`] turns arguments, configuration and (where something
//! is missing) interactive answers into a validated [`RunRequest`];
//! [`execute`] reads the files, runs the locator and assembler, and writes
//! the result.

use std::io::{BufRead, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use printlooper_core::{
    validate_loop_count, DetectionSource, LocatedSource, LoopAssembler, LoopPlan, ProfileRegistry,
    SourceDocument,
};
use printlooper_settings::Config;

use crate::files;
use crate::prompt::Prompter;

/// Loop sliced G-code for unattended batch printing
#[derive(Parser, Debug, Default)]
#[command(name = "printlooper")]
#[command(version = crate::LONG_VERSION)]
#[command(
    about = "Repeat a G-code print N times with a push-off sequence between copies",
    long_about = None
)]
pub struct Args {
    /// G-code file to loop (prompted for when omitted)
    pub file: Option<PathBuf>,

    /// Second G-code file; loops alternate between the two files
    pub second_file: Option<PathBuf>,

    /// Printer profile id or name (e.g. centauri-carbon, ender3-v3-se)
    #[arg(short, long)]
    pub printer: Option<String>,

    /// Number of repetitions
    #[arg(short = 'n', long)]
    pub loops: Option<u32>,

    /// Directory for the looped file (default: next to the first input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Omit the descriptive banner at the top of the output
    #[arg(long)]
    pub no_banner: bool,

    /// List available printer profiles and exit
    #[arg(long)]
    pub list_printers: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Fold command-line overrides into the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if self.no_banner {
            config.general.include_banner = false;
        }
        if let Some(dir) = &self.output_dir {
            config.general.output_dir = Some(dir.clone());
        }
        if let Some(printer) = &self.printer {
            config.general.default_printer = Some(printer.clone());
        }
    }
}

/// Everything needed for one run, already validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub printer_id: String,
    pub primary: PathBuf,
    pub secondary: Option<PathBuf>,
    pub loop_count: NonZeroU32,
}

/// Fill in a [`RunRequest`] from arguments, config and prompts
///
/// Values given on the command line (or the configured default printer) are
/// used as-is; anything missing is asked for. When the first file comes
/// from the command line the second file is never prompted for.
pub fn resolve_request<R: BufRead, W: Write>(
    args: &Args,
    config: &Config,
    registry: &ProfileRegistry,
    prompter: &mut Prompter<R, W>,
    search_dir: &Path,
) -> Result<RunRequest> {
    let printer_id = match &config.general.default_printer {
        Some(id) => registry.get(id)?.id.clone(),
        None => prompter.select_printer(registry)?.id.clone(),
    };

    let (primary, secondary) = match &args.file {
        Some(file) => (file.clone(), args.second_file.clone()),
        None => {
            let found = files::find_gcode_files(search_dir)?;
            let primary = prompter.select_file(&found)?;
            let secondary = prompter.select_second_file(&found, &primary)?;
            (primary, secondary)
        }
    };

    if let Some(second) = &secondary {
        if same_file(&primary, second) {
            bail!(
                "The second file is the same as the first: {}",
                second.display()
            );
        }
    }

    let loop_count = match args.loops {
        Some(n) => validate_loop_count(n, config.general.max_loops)?,
        None => prompter.loop_count(config.general.max_loops)?,
    };

    Ok(RunRequest {
        printer_id,
        primary,
        secondary,
        loop_count,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Per-input details reported after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub name: String,
    pub lines: usize,
    /// One-based line where the end sequence starts; `None` when it is empty
    pub end_sequence_line: Option<usize>,
    /// Matcher name, or `None` when the fallback applied
    pub detected_by: Option<String>,
}

impl SourceSummary {
    /// One status line for the run summary; `file_num` is one-based
    pub fn describe(&self, file_num: usize) -> String {
        match (&self.detected_by, self.end_sequence_line) {
            (Some(matcher), Some(line)) => format!(
                "✓ File {} end GCODE sequence starts at line {} ({})",
                file_num, line, matcher
            ),
            (_, Some(line)) => format!(
                "! File {} has no recognizable end sequence; using the last lines from line {}",
                file_num, line
            ),
            (_, None) => format!(
                "! File {} has no recognizable end sequence; the whole file is looped",
                file_num
            ),
        }
    }
}

/// Outcome of [`execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub printer: String,
    pub loop_count: u32,
    pub sources: Vec<SourceSummary>,
    pub output_path: PathBuf,
    pub total_lines: usize,
}

/// Read, locate, assemble and write
pub fn execute(request: &RunRequest, config: &Config, registry: &ProfileRegistry) -> Result<RunSummary> {
    let profile = registry.get(&request.printer_id)?;
    let locator = config
        .build_locator()
        .context("Invalid end-sequence detection settings")?;

    let primary_doc = files::read_document(&request.primary)?;
    let secondary_doc = request
        .secondary
        .as_deref()
        .map(files::read_document)
        .transpose()?;

    let mut sources = Vec::new();
    let mut locate = |doc: &SourceDocument| {
        let detection = locator.detect(doc.lines());
        sources.push(SourceSummary {
            name: doc.name().to_string(),
            lines: doc.len(),
            end_sequence_line: (detection.boundary.index() < doc.len())
                .then_some(detection.boundary.line_number()),
            detected_by: match detection.source {
                DetectionSource::Matcher(name) => Some(name),
                DetectionSource::Fallback(_) => None,
            },
        });
        detection.boundary
    };

    let primary = LocatedSource::new(&primary_doc, locate(&primary_doc));
    let plan = match &secondary_doc {
        Some(doc) => {
            let secondary = LocatedSource::new(doc, locate(doc));
            LoopPlan::alternating(primary, secondary, request.loop_count, profile)
        }
        None => LoopPlan::single(primary, request.loop_count, profile),
    };

    let output = LoopAssembler::new()
        .with_banner(config.general.include_banner)
        .assemble(&plan);

    let output_path = files::output_path(
        config.general.output_dir.as_deref(),
        &request.primary,
        request.secondary.as_deref(),
        request.loop_count.get(),
    );
    files::write_output(&output_path, &output)?;

    Ok(RunSummary {
        printer: profile.name.clone(),
        loop_count: request.loop_count.get(),
        sources,
        output_path,
        total_lines: output.len(),
    })
}
