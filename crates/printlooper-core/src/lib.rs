//! # PrintLooper Core
//!
//! End-sequence detection and loop assembly for sliced 3D-printer G-code.
//!
//! ## Architecture
//!
//! ```text
//! SourceDocument ──► EndSequenceLocator ──► Boundary
//!                                              │
//!        ProfileRegistry ──► PrinterProfile    │
//!                                 │            │
//!                                 ▼            ▼
//!                            LoopPlan ──► LoopAssembler ──► OutputDocument
//! ```
//!
//! Everything here is synchronous, in-memory and side-effect free apart
//! from `tracing` output. File discovery, prompting and writing live in the
//! `printlooper` binary.
//!
//! ## Usage
//!
//! ```rust
//! use std::num::NonZeroU32;
//! use printlooper_core::{EndSequenceLocator, LoopAssembler, LoopPlan, ProfileRegistry, SourceDocument};
//!
//! let doc = SourceDocument::parse("part.gcode", "G28\nG1 X10 E1\nM104 S0\nM84\n");
//! let registry = ProfileRegistry::builtin();
//! let profile = registry.get("centauri-carbon").unwrap();
//!
//! let plan = LoopPlan::locate(
//!     &EndSequenceLocator::new(),
//!     &doc,
//!     None,
//!     NonZeroU32::new(3).unwrap(),
//!     profile,
//! );
//! let output = LoopAssembler::new().assemble(&plan);
//! assert!(output.render().ends_with("M104 S0\nM84\n"));
//! ```

pub mod assembler;
pub mod document;
pub mod error;
pub mod locator;
pub mod profile;

pub use assembler::{LoopAssembler, LoopPlan, OutputDocument};
pub use document::{Boundary, LineEnding, LocatedSource, SourceDocument};
pub use error::{LooperError, LooperResult};
pub use locator::{
    BoundaryMatcher, CommentMarkerMatcher, Detection, DetectionSource, EndSequenceLocator,
    FallbackPolicy, MatcherHandle, ShutdownCommand, ShutdownCommandMatcher,
};
pub use profile::{PrinterModel, PrinterProfile, ProfileRegistry};

/// Loop counts accepted by interactive input layers
pub const MIN_LOOPS: u32 = 1;
pub const MAX_LOOPS: u32 = 99;

/// Validate a loop count against an inclusive upper bound
///
/// The assembler itself accepts any positive count; input layers call this
/// before building a plan.
pub fn validate_loop_count(count: u32, max: u32) -> LooperResult<std::num::NonZeroU32> {
    match std::num::NonZeroU32::new(count) {
        Some(n) if count <= max => Ok(n),
        _ => Err(LooperError::LoopCountOutOfRange {
            count,
            min: MIN_LOOPS,
            max,
        }),
    }
}
