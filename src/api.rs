use crate::engine::{Blocks, Records};
use crate::state::StateManager;
use crate::{EntityKind, Error, ParseContext, Record, Result};
use std::io::BufRead;

/// Parse a `scontrol show <kind>` dump given as lines.
///
/// The returned iterator is lazy and yields one record per block; the first
/// error ends it. Call again on the same input to re-parse.
///
/// # Example
/// ```
/// use slurm_state::{EntityKind, ParseContext, parse};
///
/// let dump = "NodeName=cn-a001 Arch=x86_64 State=IDLE\n\nNodeName=cn-a002 Arch=x86_64 State=DOWN\n";
/// let nodes: Vec<_> = parse(EntityKind::Node, dump.lines(), &ParseContext::default())
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(nodes.len(), 2);
/// assert_eq!(nodes[1].text("state"), Some("DOWN"));
/// ```
pub fn parse<'c, L>(
    kind: EntityKind,
    lines: L,
    ctx: &'c ParseContext,
) -> Records<'c, impl Iterator<Item = Result<L::Item>>>
where
    L: IntoIterator,
    L::Item: AsRef<str>,
{
    Records::new(kind, Blocks::new(lines.into_iter().map(Ok::<_, Error>)), ctx)
}

/// Like [`parse`], reading lines from `reader`. I/O failures end the stream
/// with [`Error::Io`].
pub fn parse_reader<'c, R: BufRead>(
    kind: EntityKind,
    reader: R,
    ctx: &'c ParseContext,
) -> Records<'c, impl Iterator<Item = Result<String>>> {
    Records::new(kind, Blocks::new(reader.lines().map(|line| line.map_err(Error::from))), ctx)
}

/// Fold one poll's records into `manager`.
///
/// On failure the manager keeps its previous state, flagged stale.
pub fn update<M: StateManager>(manager: &mut M, records: &[Record]) -> Result<M::Output> {
    manager.update(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{JobStateManager, SnapshotManager};
    use std::io::{self, Cursor, Read};

    #[test]
    fn parse_is_restartable() {
        let dump = "NodeName=a State=IDLE\n\nNodeName=b State=IDLE\n";
        let ctx = ParseContext::default();
        let first: Vec<_> = parse(EntityKind::Node, dump.lines(), &ctx).collect::<Result<_>>().unwrap();
        let second: Vec<_> = parse(EntityKind::Node, dump.lines(), &ctx).collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn parse_accepts_owned_lines() {
        let lines = vec!["JobId=1 JobState=RUNNING".to_string(), String::new(), "JobId=2".to_string()];
        let ctx = ParseContext::default();
        let records: Vec<Record> = parse(EntityKind::Job, lines, &ctx).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn parse_reader_reads_blocks() {
        let ctx = ParseContext::default();
        let reader = Cursor::new("ReservationName=r1 State=ACTIVE\n\n\n");
        let records: Vec<Record> = parse_reader(EntityKind::Reservation, reader, &ctx).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("state"), Some("ACTIVE"));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"))
        }
    }

    #[test]
    fn parse_reader_surfaces_io_errors() {
        let ctx = ParseContext::default();
        let out: Vec<_> = parse_reader(EntityKind::Node, io::BufReader::new(FailingReader), &ctx).collect();
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(Error::Io(_))));
    }

    #[test]
    fn update_dispatches_to_any_manager() {
        let ctx = ParseContext::default();
        let nodes: Vec<Record> =
            parse(EntityKind::Node, "NodeName=a State=IDLE".lines(), &ctx).collect::<Result<_>>().unwrap();
        let diff = update(&mut SnapshotManager::nodes(), &nodes).unwrap();
        assert_eq!(diff.appeared, vec!["a"]);

        let jobs: Vec<Record> = parse(EntityKind::Job, "JobId=7 JobState=PENDING Account=def-x".lines(), &ctx)
            .collect::<Result<_>>()
            .unwrap();
        let poll = update(&mut JobStateManager::new("account"), &jobs).unwrap();
        assert_eq!(poll.tally["def-x"].pending, 1);
    }
}
