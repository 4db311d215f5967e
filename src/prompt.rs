//! Interactive prompts
//!
//! [`Prompter`] walks the user through printer, file and loop count
//! selection. It works over any `BufRead`/`Write` pair so the flow can be
//! driven from tests as well as from a terminal.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use printlooper_core::{validate_loop_count, PrinterProfile, ProfileRegistry, MIN_LOOPS};
use std::num::NonZeroU32;

use crate::files::GcodeFile;

const RULE: &str = "--------------------------------------------------";

/// Question/answer session over a reader and a writer
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the writer, e.g. to inspect captured output
    pub fn into_output(self) -> W {
        self.output
    }

    /// Print `question` and read one trimmed answer
    ///
    /// # Errors
    /// Fails when the input is closed before an answer arrives.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            bail!("Input closed while waiting for an answer");
        }
        Ok(answer.trim().to_string())
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    /// Numbered printer menu; returns the chosen profile
    pub fn select_printer<'a>(&mut self, registry: &'a ProfileRegistry) -> Result<&'a PrinterProfile> {
        if registry.is_empty() {
            bail!("No printer profiles available");
        }

        self.say("\nSelect your printer mode:")?;
        for (idx, profile) in registry.iter().enumerate() {
            writeln!(self.output, "  {}. {}", idx + 1, profile.name)?;
        }
        self.say("")?;

        let question = format!("Enter your choice (1-{}): ", registry.len());
        loop {
            let answer = self.ask(&question)?;
            let choice = answer
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| registry.get_index(idx));

            match choice {
                Some(profile) => {
                    writeln!(self.output, "\n✓ Selected: {}", profile.name)?;
                    return Ok(profile);
                }
                None => writeln!(
                    self.output,
                    "Invalid choice. Please enter a number between 1 and {}.",
                    registry.len()
                )?,
            }
        }
    }

    /// Pick the primary G-code file
    pub fn select_file(&mut self, files: &[GcodeFile]) -> Result<PathBuf> {
        if files.is_empty() {
            bail!("No GCODE files found in the current directory!");
        }

        self.say(&format!("\n{}\nAvailable GCODE files:\n{}", RULE, RULE))?;
        for (idx, file) in files.iter().enumerate() {
            writeln!(self.output, "  {}. {} ({:.1} KB)", idx + 1, file.name, file.size_kb())?;
        }
        self.say("")?;

        let question = format!("Select a file (1-{}): ", files.len());
        loop {
            let answer = self.ask(&question)?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=files.len()).contains(&n) => {
                    let file = &files[n - 1];
                    writeln!(self.output, "\n✓ Selected: {}", file.name)?;
                    return Ok(file.path.clone());
                }
                Ok(_) => writeln!(
                    self.output,
                    "Invalid choice. Please enter a number between 1 and {}.",
                    files.len()
                )?,
                Err(_) => self.say("Invalid input. Please enter a number.")?,
            }
        }
    }

    /// Optionally pick a second file to alternate with; blank answer skips
    pub fn select_second_file(
        &mut self,
        files: &[GcodeFile],
        first: &std::path::Path,
    ) -> Result<Option<PathBuf>> {
        self.say(&format!(
            "\n{}\nOptional: Select a second GCODE file to alternate\n{}",
            RULE, RULE
        ))?;
        self.say("Leave blank to loop only the first file, or select")?;
        self.say("a second file to alternate (File1 → File2 → File1 → File2...)\n")?;

        if files.len() < 2 {
            self.say("Only one GCODE file available. Skipping second file selection.")?;
            return Ok(None);
        }

        self.say("Available files:")?;
        for (idx, file) in files.iter().enumerate() {
            let marker = if file.path == first {
                " [SELECTED AS FILE 1]"
            } else {
                ""
            };
            writeln!(
                self.output,
                "  {}. {} ({:.1} KB){}",
                idx + 1,
                file.name,
                file.size_kb(),
                marker
            )?;
        }
        self.say("")?;

        let question = format!(
            "Select second file (1-{}, or press Enter to skip): ",
            files.len()
        );
        loop {
            let answer = self.ask(&question)?;
            if answer.is_empty() {
                self.say("\n✓ No second file selected. Will loop single file.")?;
                return Ok(None);
            }

            match answer.parse::<usize>() {
                Ok(n) if (1..=files.len()).contains(&n) => {
                    let file = &files[n - 1];
                    if file.path == first {
                        self.say("Warning: You selected the same file. Please select a different file or press Enter to skip.")?;
                        continue;
                    }
                    writeln!(self.output, "\n✓ Second file selected: {}", file.name)?;
                    self.say("Files will alternate in the loop.")?;
                    return Ok(Some(file.path.clone()));
                }
                Ok(_) => writeln!(
                    self.output,
                    "Invalid choice. Please enter a number between 1 and {}.",
                    files.len()
                )?,
                Err(_) => self.say("Invalid input. Please enter a number or press Enter to skip.")?,
            }
        }
    }

    /// Ask for a loop count between 1 and `max`
    pub fn loop_count(&mut self, max: u32) -> Result<NonZeroU32> {
        self.say(&format!("\n{}\nConfigure loop count\n{}", RULE, RULE))?;

        let question = format!(
            "How many times should the print loop? ({}-{}): ",
            MIN_LOOPS, max
        );
        loop {
            let answer = self.ask(&question)?;
            match answer.parse::<u32>() {
                Ok(n) => match validate_loop_count(n, max) {
                    Ok(count) => {
                        writeln!(self.output, "\n✓ Loop count set to: {}", count)?;
                        return Ok(count);
                    }
                    Err(_) => writeln!(
                        self.output,
                        "Please enter a number between {} and {}.",
                        MIN_LOOPS, max
                    )?,
                },
                Err(_) => self.say("Invalid input. Please enter a number.")?,
            }
        }
    }
}
