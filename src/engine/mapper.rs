//! Field mapping.
//!
//! Turns one [`RawBlock`] into a [`Record`] by running every raw key through
//! the rule its kind's table registers for it. There is no lenient mode: a
//! key without a rule aborts the block with [`Error::UnknownField`], since an
//! unmapped key nearly always means `scontrol` grew a field the tables have
//! not classified yet.

use crate::{EntityKind, Error, ParseContext, RawBlock, Record, Result};

/// Map one block. Either every field is handled or nothing is returned.
pub fn map_block(kind: EntityKind, block: &RawBlock, ctx: &ParseContext) -> Result<Record> {
    let mut out = Record::new();
    for (key, raw) in block.iter() {
        let rule = kind.rule_for(key).ok_or_else(|| Error::UnknownField { kind, field: key.to_string() })?;
        rule.apply(raw, ctx, &mut out).inspect_err(|err| {
            tracing::debug!(%kind, field = key, value = raw, error = %err, "field rejected");
        })?;
    }
    Ok(out)
}

/// Lazy iterator of mapped records for one entity kind.
///
/// Wraps a [`Blocks`](super::Blocks) stream; stops after the first error.
#[derive(Debug)]
pub struct Records<'c, I> {
    kind: EntityKind,
    blocks: super::Blocks<I>,
    ctx: &'c ParseContext,
    done: bool,
}

impl<'c, I> Records<'c, I> {
    pub fn new(kind: EntityKind, blocks: super::Blocks<I>, ctx: &'c ParseContext) -> Self {
        Records { kind, blocks, ctx, done: false }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

impl<I, S> Iterator for Records<'_, I>
where
    I: Iterator<Item = Result<S>>,
    S: AsRef<str>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mapped = self.blocks.next()?.and_then(|block| map_block(self.kind, &block, self.ctx));
        if mapped.is_err() {
            self.done = true;
        }
        Some(mapped)
    }
}
