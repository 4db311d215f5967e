//! # PrintLooper
//!
//! Repeats a sliced 3D-printer G-code file N times for unattended batch
//! printing. Between copies a printer-specific push-off sequence sweeps the
//! finished part off the bed; the original shutdown sequence runs once, at
//! the very end. Two files can be alternated (File1 → File2 → File1 ...).
//!
//! ## Architecture
//!
//! 1. **printlooper-core** - end-sequence locator, printer profiles, loop assembler
//! 2. **printlooper-settings** - configuration files and profile overrides
//! 3. **printlooper** - this crate: CLI, interactive prompts, file I/O

pub mod cli;
pub mod files;
pub mod prompt;

pub use printlooper_core::{
    Boundary, EndSequenceLocator, LoopAssembler, LoopPlan, LooperError, OutputDocument,
    PrinterModel, PrinterProfile, ProfileRegistry, SourceDocument,
};
pub use printlooper_settings::{Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Version string shown by `--version`
pub const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")");

/// Initialize logging
///
/// Sets up structured logging on stderr, so prompts and summaries on stdout
/// stay clean:
/// - `RUST_LOG` takes precedence when set
/// - otherwise `warn`, raised to `info`/`debug` by `verbosity`
/// - JSON lines instead of text when `json` is set
pub fn init_logging(verbosity: u8, json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
