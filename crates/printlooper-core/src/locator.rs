//! End-sequence detection
//!
//! Slicers disagree on how they announce the shutdown part of a file, so the
//! locator runs a prioritized list of [`BoundaryMatcher`]s. The first matcher
//! that reports a line wins; when none does, the [`FallbackPolicy`] decides.
//! Detection never fails.
//!
//! Default order:
//! 1. [`CommentMarkerMatcher`] - an explicit `; END GCODE` style comment
//! 2. [`ShutdownCommandMatcher`] - the trailing cluster of heater/fan/motor
//!    off commands

use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use crate::document::Boundary;
use crate::error::{LooperError, LooperResult};

/// Comment patterns recognized out of the box (case-insensitive, matched
/// against the text after `;`)
pub const DEFAULT_COMMENT_MARKERS: &[&str] = &[r"^END[ _]?G-?CODE", r"^MACHINE_END_GCODE_START"];

/// Commands that only show up in shutdown sequences
pub const DEFAULT_SHUTDOWN_COMMANDS: &[&str] = &[
    "M104 S0",
    "M140 S0",
    "M106 S0",
    "M107",
    "M84",
    "M18",
    "TURN_OFF_HEATERS",
    "END_PRINT",
    "PRINT_END",
];

/// Largest distance (in lines) between two shutdown commands of one cluster
pub const DEFAULT_CLUSTER_GAP: usize = 10;

/// Tail size used by the legacy fallback
pub const DEFAULT_TAIL_WINDOW: usize = 20;

/// Split a line into its code part and optional `;` comment
fn split_comment(line: &str) -> (&str, Option<&str>) {
    match line.split_once(';') {
        Some((code, comment)) => (code, Some(comment)),
        None => (line, None),
    }
}

/// A strategy that looks for the first line of the end sequence
pub trait BoundaryMatcher: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// What this matcher looks for
    fn description(&self) -> &str;

    /// Index of the first end-sequence line, if this matcher recognizes one
    fn find(&self, lines: &[String]) -> Option<usize>;
}

/// Arc-wrapped matcher for sharing between locators
pub type MatcherHandle = Arc<dyn BoundaryMatcher>;

/// Matches an explicit end-section comment, scanning bottom-up
#[derive(Debug, Clone)]
pub struct CommentMarkerMatcher {
    patterns: Vec<Regex>,
}

impl CommentMarkerMatcher {
    /// Matcher with [`DEFAULT_COMMENT_MARKERS`]
    pub fn new() -> Self {
        let patterns = DEFAULT_COMMENT_MARKERS
            .iter()
            .filter_map(|p| compile_marker(p).ok())
            .collect();
        Self { patterns }
    }

    /// Matcher with custom regex patterns
    ///
    /// # Errors
    /// Returns [`LooperError::InvalidPattern`] for the first pattern that
    /// fails to compile.
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> LooperResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| compile_marker(p.as_ref()))
            .collect::<LooperResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    fn is_marker(&self, line: &str) -> bool {
        match split_comment(line).1 {
            Some(comment) => {
                let comment = comment.trim();
                !is_config_entry(comment) && self.patterns.iter().any(|p| p.is_match(comment))
            }
            None => false,
        }
    }
}

impl Default for CommentMarkerMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryMatcher for CommentMarkerMatcher {
    fn name(&self) -> &str {
        "comment_marker"
    }

    fn description(&self) -> &str {
        "Explicit end-of-print comment such as '; END GCODE'"
    }

    fn find(&self, lines: &[String]) -> Option<usize> {
        lines.iter().rposition(|line| self.is_marker(line))
    }
}

/// Slicer settings dumps (`; end_gcode = M104 S0\nM84`) are not markers
fn is_config_entry(comment: &str) -> bool {
    match comment.split_once('=') {
        Some((key, _)) => {
            let key = key.trim_end();
            !key.is_empty()
                && key
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        }
        None => false,
    }
}

fn compile_marker(pattern: &str) -> LooperResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| LooperError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// A shutdown command: a command word plus required parameters
///
/// `"M104 S0"` matches `M104 S0`, `m104 s0 T1` and `M104 S0.0`, but not
/// `M104 S200`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownCommand {
    word: String,
    params: Vec<String>,
}

impl ShutdownCommand {
    /// Parse a token pattern like `"M140 S0"`; `None` for blank input
    pub fn parse(pattern: &str) -> Option<Self> {
        let mut tokens = pattern.split_whitespace().map(str::to_ascii_uppercase);
        let word = tokens.next()?;
        Some(Self {
            word,
            params: tokens.collect(),
        })
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// Check the code part of a line against this command
    pub fn matches(&self, code: &str) -> bool {
        let mut tokens = code.split_whitespace().map(str::to_ascii_uppercase);
        let mut word = match tokens.next() {
            Some(t) => t,
            None => return false,
        };

        // Skip an `N123` line number prefix
        if is_line_number(&word) {
            word = match tokens.next() {
                Some(t) => t,
                None => return false,
            };
        }

        if word != self.word {
            return false;
        }

        let args: Vec<String> = tokens.collect();
        self.params
            .iter()
            .all(|param| args.iter().any(|arg| param_eq(param, arg)))
    }
}

fn is_line_number(token: &str) -> bool {
    token.len() > 1
        && token.starts_with('N')
        && token[1..].bytes().all(|b| b.is_ascii_digit())
}

fn param_eq(expected: &str, actual: &str) -> bool {
    if expected == actual {
        return true;
    }

    let (Some(e_letter), Some(a_letter)) = (expected.chars().next(), actual.chars().next()) else {
        return false;
    };
    if e_letter != a_letter {
        return false;
    }

    match (
        expected[e_letter.len_utf8()..].parse::<f64>(),
        actual[a_letter.len_utf8()..].parse::<f64>(),
    ) {
        (Ok(e), Ok(a)) => e == a,
        _ => false,
    }
}

/// Matches the trailing cluster of shutdown commands
///
/// Scans bottom-up. The bottom-most shutdown command anchors the cluster;
/// earlier shutdown commands within `cluster_gap` lines of the current
/// boundary extend it upward. Commands further up, like a first-layer
/// `M106 S0`, are left in the body.
#[derive(Debug, Clone)]
pub struct ShutdownCommandMatcher {
    commands: Vec<ShutdownCommand>,
    cluster_gap: usize,
}

impl ShutdownCommandMatcher {
    /// Matcher with [`DEFAULT_SHUTDOWN_COMMANDS`] and [`DEFAULT_CLUSTER_GAP`]
    pub fn new() -> Self {
        Self::with_commands(DEFAULT_SHUTDOWN_COMMANDS)
    }

    /// Matcher with custom command patterns; blank patterns are ignored
    pub fn with_commands<S: AsRef<str>>(commands: &[S]) -> Self {
        Self {
            commands: commands
                .iter()
                .filter_map(|c| ShutdownCommand::parse(c.as_ref()))
                .collect(),
            cluster_gap: DEFAULT_CLUSTER_GAP,
        }
    }

    /// Set the maximum cluster gap (at least 1)
    pub fn with_cluster_gap(mut self, cluster_gap: usize) -> Self {
        self.cluster_gap = cluster_gap.max(1);
        self
    }

    fn is_shutdown(&self, line: &str) -> bool {
        let code = split_comment(line).0;
        self.commands.iter().any(|c| c.matches(code))
    }
}

impl Default for ShutdownCommandMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryMatcher for ShutdownCommandMatcher {
    fn name(&self) -> &str {
        "shutdown_command"
    }

    fn description(&self) -> &str {
        "Trailing cluster of heater, fan and motor shutdown commands"
    }

    fn find(&self, lines: &[String]) -> Option<usize> {
        let mut boundary: Option<usize> = None;

        for (index, line) in lines.iter().enumerate().rev() {
            if let Some(current) = boundary {
                if current - index > self.cluster_gap {
                    break;
                }
            }
            if self.is_shutdown(line) {
                boundary = Some(index);
            }
        }

        boundary
    }
}

/// What to do when no matcher recognizes an end sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Treat the whole file as body; the end sequence is empty
    #[default]
    WholeBody,
    /// Treat the last `n` lines as the end sequence
    TailWindow(usize),
}

impl FallbackPolicy {
    fn boundary(&self, lines: &[String]) -> Boundary {
        match self {
            Self::WholeBody => Boundary::end_of(lines),
            Self::TailWindow(n) => Boundary::new(lines.len().saturating_sub(*n)),
        }
    }
}

/// How a boundary was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionSource {
    /// Reported by the named matcher
    Matcher(String),
    /// No matcher fired; the fallback policy was applied
    Fallback(FallbackPolicy),
}

/// Result of [`EndSequenceLocator::detect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub boundary: Boundary,
    pub source: DetectionSource,
}

/// Finds where the shutdown sequence of a G-code file starts
pub struct EndSequenceLocator {
    matchers: Vec<MatcherHandle>,
    fallback: FallbackPolicy,
}

impl EndSequenceLocator {
    /// Locator with no matchers; every file falls back
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
            fallback: FallbackPolicy::default(),
        }
    }

    /// Locator with the default comment and shutdown-command matchers
    pub fn new() -> Self {
        let mut locator = Self::empty();
        locator
            .register(Arc::new(CommentMarkerMatcher::new()))
            .register(Arc::new(ShutdownCommandMatcher::new()));
        locator
    }

    /// Append a matcher; matchers run in registration order
    pub fn register(&mut self, matcher: MatcherHandle) -> &mut Self {
        self.matchers.push(matcher);
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// `(name, description)` of every registered matcher, in order
    pub fn list_matchers(&self) -> Vec<(&str, &str)> {
        self.matchers
            .iter()
            .map(|m| (m.name(), m.description()))
            .collect()
    }

    /// Boundary between body and end sequence
    pub fn locate(&self, lines: &[String]) -> Boundary {
        self.detect(lines).boundary
    }

    /// Boundary plus the matcher (or fallback) that produced it
    pub fn detect(&self, lines: &[String]) -> Detection {
        for matcher in &self.matchers {
            if let Some(index) = matcher.find(lines) {
                tracing::debug!(
                    "End sequence found by '{}' at line {}",
                    matcher.name(),
                    index + 1
                );
                return Detection {
                    boundary: Boundary::new(index.min(lines.len())),
                    source: DetectionSource::Matcher(matcher.name().to_string()),
                };
            }
        }

        let boundary = self.fallback.boundary(lines);
        tracing::debug!(
            "No end sequence marker found in {} lines, falling back to {:?}",
            lines.len(),
            self.fallback
        );
        Detection {
            boundary,
            source: DetectionSource::Fallback(self.fallback),
        }
    }
}

impl Default for EndSequenceLocator {
    fn default() -> Self {
        Self::new()
    }
}
