//! Parsing engine.
//!
//! Parsing a dump is a two-stage pipeline:
//!
//! ```text
//! lines ── Blocks (tokenizer.rs) ──▶ RawBlock ──┐
//!                                              │  map_block (mapper.rs)
//!                 kind's field table ──────────┤  - one FieldRule per key
//!                 ParseContext ────────────────┘  - unknown key = error
//!                                              │
//!                                              v
//!                                   Records ──▶ Record
//! ```
//!
//! Both stages are lazy and fused: the first error ends the stream. Neither
//! holds state beyond the block being assembled, so a dump can be re-parsed
//! by building a fresh iterator.

#[path = "engine/mapper.rs"]
mod mapper;
#[path = "engine/tokenizer.rs"]
mod tokenizer;

pub use mapper::{Records, map_block};
pub use tokenizer::{Blocks, KNOWN_MALFORMED_TOKENS};
