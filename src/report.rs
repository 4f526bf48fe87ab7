//! Console report. Each diagnostic becomes a three-part block:
//!
//! ```text
//! 🟡 Error: src/server.ts(8,5): error TS2339: ...
//! 🟢 Prompt:
//! ...
//! ✨ Suggestion:
//! ...
//! ```

use std::io::{self, Write};

use crate::diagnostics::ErrorRecord;
use crate::error::SuggestionError;
use crate::upgrade::Upgrade;

pub const UPGRADE_MARKER: &str = "⬆️";
pub const SUCCESS_MARKER: &str = "✅";
pub const FAILURE_MARKER: &str = "❌";
pub const ERROR_MARKER: &str = "🟡";
pub const PROMPT_MARKER: &str = "🟢";
pub const SUGGESTION_MARKER: &str = "✨";
pub const UNAVAILABLE_MARKER: &str = "⚠️";

pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn upgrades(&mut self, upgrades: &[Upgrade]) -> io::Result<()> {
        if upgrades.is_empty() {
            writeln!(self.out, "{} All dependencies are up to date", UPGRADE_MARKER)?;
        }
        for upgrade in upgrades {
            writeln!(
                self.out,
                "{} {} {} -> {} ({})",
                UPGRADE_MARKER, upgrade.name, upgrade.from, upgrade.to, upgrade.section
            )?;
        }
        self.out.flush()
    }

    pub fn build_succeeded(&mut self) -> io::Result<()> {
        writeln!(self.out, "{} Build successful!", SUCCESS_MARKER)?;
        self.out.flush()
    }

    /// The build failed but printed nothing this tool can parse
    pub fn build_failed_raw(&mut self, raw_output: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "{} Build failed with no recognizable diagnostics. Raw output:",
            FAILURE_MARKER
        )?;
        write!(self.out, "{}", raw_output)?;
        if !raw_output.ends_with('\n') {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    /// One block per diagnostic: error line, prompt, suggestion or notice
    pub fn error_block(
        &mut self,
        error: &ErrorRecord,
        prompt: &str,
        suggestion: &Result<String, SuggestionError>,
    ) -> io::Result<()> {
        writeln!(self.out, "{} Error: {}", ERROR_MARKER, error)?;
        writeln!(self.out, "{} Prompt:", PROMPT_MARKER)?;
        write_body(&mut self.out, prompt)?;
        match suggestion {
            Ok(text) => {
                writeln!(self.out, "{} Suggestion:", SUGGESTION_MARKER)?;
                write_body(&mut self.out, text)?;
            }
            Err(e) => {
                writeln!(self.out, "{} Suggestion unavailable: {}", UNAVAILABLE_MARKER, e)?;
            }
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn summary(&mut self, errors: usize, unavailable: usize) -> io::Result<()> {
        writeln!(
            self.out,
            "Processed {} error(s), {} suggestion(s) unavailable",
            errors, unavailable
        )?;
        self.out.flush()
    }
}

fn write_body<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    let text = text.trim_end();
    if !text.is_empty() {
        writeln!(out, "{}", text)?;
    }
    Ok(())
}
