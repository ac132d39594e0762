//! LineSource trait definition

use crate::core::types::RawLine;

/// Transport faults the session must tell apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Device went away (unplugged, port closed, broken pipe)
    Disconnected,
    /// Port exists but the process may not open or read it
    PermissionDenied,
    /// Bytes arrived that are not valid UTF-8; the line is dropped
    DecodeInvalid,
    /// Operator asked to stop
    Interrupted,
}

/// Result of a single poll of a line source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    /// A complete line with its host arrival timestamp
    Line(RawLine),
    /// Read timeout elapsed without a complete line
    Empty,
    /// Transport-level problem
    Fault(FaultKind),
    /// Source is exhausted and will yield nothing more
    EndOfStream,
}

/// Supplier of device lines
///
/// Implementations block for at most their configured read timeout before
/// returning [`Poll::Empty`].
pub trait LineSource {
    /// Wait for the next line
    fn next_line(&mut self) -> Poll;
}

impl<T: LineSource + ?Sized> LineSource for Box<T> {
    fn next_line(&mut self) -> Poll {
        (**self).next_line()
    }
}
