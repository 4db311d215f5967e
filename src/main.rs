use std::io;

use anyhow::Result;
use clap::Parser;
use printlooper::cli::{self, Args, RunSummary};
use printlooper::prompt::Prompter;
use printlooper::{init_logging, Config};

const BANNER_RULE: &str = "==================================================";

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose, args.log_json) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(&args) {
        tracing::error!("{:#}", e);
        eprintln!("\n✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    let registry = config.build_registry()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if args.list_printers {
        for profile in registry.iter() {
            println!("{:<20} {}", profile.id, profile.name);
        }
        return Ok(());
    }

    println!("\n{}", BANNER_RULE);
    println!("PrintLooper - GCODE Loop Automation");
    println!("{}", BANNER_RULE);

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    let search_dir = std::env::current_dir()?;
    let request = cli::resolve_request(args, &config, &registry, &mut prompter, &search_dir)?;

    println!("\n{}", BANNER_RULE);
    println!("Processing GCODE...");
    println!("{}", BANNER_RULE);

    let summary = cli::execute(&request, &config, &registry)?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for (idx, source) in summary.sources.iter().enumerate() {
        println!("✓ Read {} lines from {}", source.lines, source.name);
        println!("{}", source.describe(idx + 1));
    }

    println!("\n✓ Successfully created looped GCODE!");
    println!("✓ Output file: {}", summary.output_path.display());
    println!("✓ Total lines: {}", summary.total_lines);

    println!("\n{}", BANNER_RULE);
    println!("SUCCESS!");
    println!("{}", BANNER_RULE);
    println!("\nConfiguration:");
    println!("  Printer: {}", summary.printer);
    println!("  Loops: {}", summary.loop_count);
    for (idx, source) in summary.sources.iter().enumerate() {
        println!("  File {}: {}", idx + 1, source.name);
    }
    if summary.sources.len() > 1 {
        println!("  Mode: Alternating");
    }
    println!("\nYou can now upload this file to your printer!");
    println!("{}", BANNER_RULE);
}
