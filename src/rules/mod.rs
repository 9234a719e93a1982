//! Per-kind field tables and the transcoders they use.
//!
//! A table lists every key `scontrol` is known to print for its kind. Adding
//! a key means deciding whether to keep it (`rename`) or drop it (`ignore`);
//! until then the key fails parsing with `UnknownField`.

pub mod job;
pub mod node;
pub mod reservation;
pub mod transcoders;

pub use job::JobField;
pub use node::NodeField;
pub use reservation::ReservationField;
