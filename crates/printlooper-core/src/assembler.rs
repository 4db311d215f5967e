//! Loop assembly
//!
//! Turns a [`LoopPlan`] into the final [`OutputDocument`]: `N` print bodies,
//! a push-off block between consecutive bodies, and the end sequence once at
//! the very end.
//!
//! ```text
//! [banner]                      optional
//! LOOP 1 of N header
//! body (primary)
//! push-off block                between loops only
//! LOOP 2 of N header
//! body (secondary if alternating, else primary)
//! ...
//! FINAL END SEQUENCE header
//! end sequence (always the primary's)
//! ```
//!
//! In alternating mode the trailing end sequence is taken from the primary
//! document even when the secondary produced the last body.

use std::fmt;
use std::num::NonZeroU32;

use crate::document::{LineEnding, LocatedSource, SourceDocument};
use crate::locator::EndSequenceLocator;
use crate::profile::PrinterProfile;

/// Header lines per loop in single-file mode (banner + blank)
pub const LOOP_HEADER_LINES: usize = 2;

/// Header lines per loop in alternating mode (banner + `Using:` + blank)
pub const ALTERNATING_LOOP_HEADER_LINES: usize = 3;

/// Lines preceding the end sequence (banner + blank)
pub const FINAL_HEADER_LINES: usize = 2;

/// Lines the push-off block adds around the profile's commands
pub const PUSH_OFF_FRAME_LINES: usize = 6;

/// Comment preceding the end sequence
pub const FINAL_END_HEADER: &str = "; ================ FINAL END SEQUENCE ================";

/// Comment closing every push-off block
pub const PUSH_OFF_FOOTER: &str = "; === End Push-Off Sequence ===";

const BANNER_RULE: &str = "; ================================================================";

/// `; ================ LOOP i of N ================`
pub fn loop_header(loop_num: u32, loop_count: u32) -> String {
    format!(
        "; ================ LOOP {} of {} ================",
        loop_num, loop_count
    )
}

/// `; === <printer> Push-Off Sequence ===`
pub fn push_off_header(profile: &PrinterProfile) -> String {
    format!("; === {} Push-Off Sequence ===", profile.name)
}

/// Everything the assembler needs for one run
#[derive(Debug, Clone, Copy)]
pub struct LoopPlan<'a> {
    primary: LocatedSource<'a>,
    secondary: Option<LocatedSource<'a>>,
    loop_count: NonZeroU32,
    profile: &'a PrinterProfile,
}

impl<'a> LoopPlan<'a> {
    /// Repeat one document
    pub fn single(
        primary: LocatedSource<'a>,
        loop_count: NonZeroU32,
        profile: &'a PrinterProfile,
    ) -> Self {
        Self {
            primary,
            secondary: None,
            loop_count,
            profile,
        }
    }

    /// Alternate primary (odd loops) and secondary (even loops)
    pub fn alternating(
        primary: LocatedSource<'a>,
        secondary: LocatedSource<'a>,
        loop_count: NonZeroU32,
        profile: &'a PrinterProfile,
    ) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
            loop_count,
            profile,
        }
    }

    /// Locate boundaries in both documents and build the plan
    pub fn locate(
        locator: &EndSequenceLocator,
        primary: &'a SourceDocument,
        secondary: Option<&'a SourceDocument>,
        loop_count: NonZeroU32,
        profile: &'a PrinterProfile,
    ) -> Self {
        let primary = LocatedSource::new(primary, locator.locate(primary.lines()));
        let secondary = secondary.map(|doc| LocatedSource::new(doc, locator.locate(doc.lines())));
        Self {
            primary,
            secondary,
            loop_count,
            profile,
        }
    }

    pub fn primary(&self) -> &LocatedSource<'a> {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&LocatedSource<'a>> {
        self.secondary.as_ref()
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count.get()
    }

    pub fn profile(&self) -> &'a PrinterProfile {
        self.profile
    }

    pub fn is_alternating(&self) -> bool {
        self.secondary.is_some()
    }

    /// Source used for a one-based loop number
    pub fn source_for(&self, loop_num: u32) -> &LocatedSource<'a> {
        match &self.secondary {
            Some(secondary) if loop_num % 2 == 0 => secondary,
            _ => &self.primary,
        }
    }

    /// Lines of one push-off block for this plan's profile
    pub fn push_off_len(&self) -> usize {
        self.profile.push_off.len() + PUSH_OFF_FRAME_LINES
    }

    fn header_lines(&self) -> usize {
        if self.is_alternating() {
            ALTERNATING_LOOP_HEADER_LINES
        } else {
            LOOP_HEADER_LINES
        }
    }

    fn banner_lines(&self) -> usize {
        if self.is_alternating() {
            8
        } else {
            6
        }
    }
}

/// The assembled output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    lines: Vec<String>,
    line_ending: LineEnding,
}

impl OutputDocument {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Text with every line terminated by the primary's line ending
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OutputDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ending = self.line_ending.as_str();
        for line in &self.lines {
            f.write_str(line)?;
            f.write_str(ending)?;
        }
        Ok(())
    }
}

/// Builds looped G-code from a [`LoopPlan`]
#[derive(Debug, Clone, Default)]
pub struct LoopAssembler {
    banner: bool,
}

impl LoopAssembler {
    /// Assembler without the file banner
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a banner describing printer, files and loop count
    pub fn with_banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }

    /// Number of lines [`assemble`](Self::assemble) will produce for `plan`
    pub fn expected_len(&self, plan: &LoopPlan<'_>) -> usize {
        let n = plan.loop_count();
        let bodies: usize = (1..=n).map(|i| plan.source_for(i).body().len()).sum();
        let banner = if self.banner { plan.banner_lines() } else { 0 };

        banner
            + n as usize * plan.header_lines()
            + bodies
            + (n as usize - 1) * plan.push_off_len()
            + FINAL_HEADER_LINES
            + plan.primary().end_sequence().len()
    }

    /// Assemble the output; inputs are only read
    pub fn assemble(&self, plan: &LoopPlan<'_>) -> OutputDocument {
        let n = plan.loop_count();
        tracing::debug!(
            "Assembling {} loop(s) of '{}'{} for {}",
            n,
            plan.primary().name(),
            plan.secondary()
                .map(|s| format!(" alternating with '{}'", s.name()))
                .unwrap_or_default(),
            plan.profile().name
        );

        let mut lines = Vec::with_capacity(self.expected_len(plan));

        if self.banner {
            push_banner(&mut lines, plan);
        }

        for loop_num in 1..=n {
            let source = plan.source_for(loop_num);

            lines.push(loop_header(loop_num, n));
            if plan.is_alternating() {
                lines.push(format!("; Using: {}", source.name()));
            }
            lines.push(String::new());

            lines.extend_from_slice(source.body());

            if loop_num < n {
                push_push_off(&mut lines, plan.profile(), loop_num + 1);
            }
        }

        lines.push(FINAL_END_HEADER.to_string());
        lines.push(String::new());
        lines.extend_from_slice(plan.primary().end_sequence());

        tracing::info!("Assembled {} lines ({} loops)", lines.len(), n);

        OutputDocument {
            lines,
            line_ending: plan.primary().document().line_ending(),
        }
    }
}

fn push_banner(lines: &mut Vec<String>, plan: &LoopPlan<'_>) {
    lines.push(BANNER_RULE.to_string());
    lines.push(format!(
        "; PrintLooper - Looped GCODE for {}",
        plan.profile().name
    ));
    lines.push(format!("; Primary file: {}", plan.primary().name()));
    if let Some(secondary) = plan.secondary() {
        lines.push(format!("; Secondary file: {}", secondary.name()));
        lines.push("; Mode: Alternating between files".to_string());
    }
    lines.push(format!("; Loop count: {}", plan.loop_count()));
    lines.push(BANNER_RULE.to_string());
    lines.push(String::new());
}

fn push_push_off(lines: &mut Vec<String>, profile: &PrinterProfile, next_loop: u32) {
    lines.push(String::new());
    lines.push(push_off_header(profile));
    lines.extend_from_slice(&profile.push_off);
    lines.push(PUSH_OFF_FOOTER.to_string());
    lines.push(String::new());
    lines.push(format!("; Preparing for loop {}...", next_loop));
    lines.push(String::new());
}
