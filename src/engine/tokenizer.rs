//! Block tokenizer.
//!
//! `scontrol show` prints one entity per block, blocks separated by blank
//! lines, each line a run of `Key=Value` tokens:
//!
//! ```text
//! JobId=42 JobName=train UserId=alice(1234) GroupId=alice(1234)
//!    Reason=Not responding Dependency=(null)
//!
//! JobId=43 ...
//! ```
//!
//! Values may contain spaces and `=`, keys may contain `/`, `:` and `_`
//! (`CPUs/Task`, `ReqB:S:C:T`, `MCS_label`). A value runs lazily up to the
//! next ` Key=` token or the end of the line.
//!
//! ## Carve-outs
//!
//! Slurm prints at least one token without `=` (`NtasksPerTRES:0`, alone on
//! its line). Such tokens are listed in [`KNOWN_MALFORMED_TOKENS`] and end the
//! line cleanly; anything else that does not match is an error.

use crate::{Error, RawBlock, Result};
use regex::Regex;

/// Tokens that do not follow the `Key=Value` grammar but are known to be
/// harmless. A line remainder equal to one of these is skipped.
pub const KNOWN_MALFORMED_TOKENS: &[&str] = &["NtasksPerTRES:0"];

fn field_pattern() -> &'static Regex {
    regex!(r"^([A-Za-z_/:]+)=(.*?)(?: ([A-Za-z_/:]+=.*)|$)")
}

/// Consume every `Key=Value` token of `line` into `block`.
///
/// ```text
/// "JobId=42 Reason=Not responding Nice=0"
///   └─ (JobId, 42)  rest: "Reason=Not responding Nice=0"
///        └─ (Reason, Not responding)  rest: "Nice=0"
///             └─ (Nice, 0)  rest: ""
/// ```
pub(crate) fn tokenize_line(line: &str, line_no: usize, block: &mut RawBlock) -> Result<()> {
    let mut rest = line;
    while !rest.is_empty() {
        let Some(caps) = field_pattern().captures(rest) else {
            if KNOWN_MALFORMED_TOKENS.contains(&rest) {
                break;
            }
            return Err(Error::UnparseableLine { line_no, line: rest.to_string() });
        };
        block.insert(&caps[1], &caps[2]);
        rest = caps.get(3).map_or("", |m| m.as_str());
    }
    Ok(())
}

/// Lazy iterator of raw blocks over a sequence of lines.
///
/// A fresh `Blocks` must be created per stream. After the first error the
/// iterator is exhausted.
#[derive(Debug)]
pub struct Blocks<I> {
    lines: I,
    line_no: usize,
    current: RawBlock,
    done: bool,
}

impl<I> Blocks<I> {
    pub fn new(lines: I) -> Self {
        Blocks { lines, line_no: 0, current: RawBlock::new(), done: false }
    }

    fn fail(&mut self, err: Error) -> Option<Result<RawBlock>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<I, S> Iterator for Blocks<I>
where
    I: Iterator<Item = Result<S>>,
    S: AsRef<str>,
{
    type Item = Result<RawBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => return self.fail(err),
                None => {
                    // A stream without a trailing blank line still ends a block.
                    self.done = true;
                    if self.current.is_empty() {
                        return None;
                    }
                    return Some(Ok(std::mem::take(&mut self.current)));
                }
            };
            self.line_no += 1;

            let text = line.as_ref().trim();
            if text.is_empty() {
                if self.current.is_empty() {
                    continue;
                }
                tracing::debug!(line_no = self.line_no, fields = self.current.len(), "block complete");
                return Some(Ok(std::mem::take(&mut self.current)));
            }

            if let Err(err) = tokenize_line(text, self.line_no, &mut self.current) {
                return self.fail(err);
            }
        }
    }
}
