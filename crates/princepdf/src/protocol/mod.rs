//! The engine control protocol.
//!
//! Every message in either direction is a frame: a header line holding a
//! kind token and a decimal payload length, then the payload bytes, then a
//! newline.
//!
//! ```text
//! <kind> <length>\n
//! <payload bytes>\n
//! ```
//!
//! The termination frame is the single exception and is written as the bare
//! line `end\n`. Headers received without a length token carry an empty
//! payload.

mod transport;

use std::fmt;

pub use transport::EngineTransport;

/// Kind token of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Job header (client to engine).
    Job,
    /// Positional resource payload (client to engine).
    Data,
    /// Session termination (client to engine).
    End,
    /// Job failure (engine to client).
    Error,
    /// Diagnostic log (engine to client).
    Log,
    /// Rendered document (engine to client).
    Pdf,
    /// Any other token, such as the engine greeting.
    Other(String),
}

impl FrameKind {
    /// Parses a header kind token.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token {
            "job" => Self::Job,
            "dat" => Self::Data,
            "end" => Self::End,
            "err" => Self::Error,
            "log" => Self::Log,
            "pdf" => Self::Pdf,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Token written on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Job => "job",
            Self::Data => "dat",
            Self::End => "end",
            Self::Error => "err",
            Self::Log => "log",
            Self::Pdf => "pdf",
            Self::Other(token) => token.as_str(),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header kind.
    pub kind: FrameKind,
    /// Payload bytes, possibly empty.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame.
    #[must_use]
    pub const fn new(kind: FrameKind, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    /// Payload decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// One logical engine response.
///
/// A document response carries the PDF bytes; its paired log has already
/// been delivered to the diagnostics sink. Log-only and unrecognised
/// responses carry whatever payload they had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Kind of the frame that opened the response.
    pub kind: FrameKind,
    /// Payload, absent for log-only responses.
    pub data: Option<Vec<u8>>,
}

impl Output {
    /// Consumes the response, returning the document bytes if it is one.
    #[must_use]
    pub fn into_document(self) -> Option<Vec<u8>> {
        if self.kind == FrameKind::Pdf {
            self.data
        } else {
            None
        }
    }
}
