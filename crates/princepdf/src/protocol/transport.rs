//! Frame reader and writer over a pair of byte streams.

use std::io::{self, BufRead, Read, Write};
use std::sync::Arc;

use super::{Frame, FrameKind, Output};
use crate::error::{FrameError, ResponseError};

/// Reads and writes control-protocol frames.
///
/// Sessions wrap the engine's stdout and stdin; tests and stub engines wrap
/// in-memory buffers or their own stdio.
#[derive(Debug)]
pub struct EngineTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> EngineTransport<R, W>
where
    R: BufRead,
    W: Write,
{
    /// Creates a transport reading from `reader` and writing to `writer`.
    #[must_use]
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Writes one frame and flushes the writer.
    ///
    /// An `end` frame without payload is written as the bare `end` line.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Io`] if writing fails.
    pub fn send_frame(&mut self, kind: &FrameKind, payload: &[u8]) -> Result<(), FrameError> {
        self.write_frame(kind, payload).map_err(FrameError::io)
    }

    /// Writes a job: the `job` header frame followed by one `dat` frame per
    /// resource, in order.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Io`] if writing fails.
    pub fn send_job(&mut self, header: &[u8], resources: &[&[u8]]) -> Result<(), FrameError> {
        self.send_frame(&FrameKind::Job, header)?;
        for resource in resources {
            self.send_frame(&FrameKind::Data, resource)?;
        }
        Ok(())
    }

    /// Writes the termination frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Io`] if writing fails.
    pub fn send_end(&mut self) -> Result<(), FrameError> {
        self.send_frame(&FrameKind::End, &[])
    }

    fn write_frame(&mut self, kind: &FrameKind, payload: &[u8]) -> io::Result<()> {
        if *kind == FrameKind::End && payload.is_empty() {
            self.writer.write_all(b"end\n")?;
        } else {
            writeln!(self.writer, "{kind} {}", payload.len())?;
            self.writer.write_all(payload)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }

    /// Reads one frame (blocks until complete).
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Closed`] at end of stream, and the other
    /// [`FrameError`] variants when the frame is malformed or truncated.
    pub fn receive_frame(&mut self) -> Result<Frame, FrameError> {
        let mut line = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut line)
            .map_err(FrameError::io)?;
        if read == 0 {
            return Err(FrameError::Closed);
        }

        let header = String::from_utf8_lossy(&line);
        let mut tokens = header.split_whitespace();
        let token = tokens.next().ok_or(FrameError::EmptyHeader)?;
        let kind = FrameKind::parse(token);
        let Some(length_token) = tokens.next() else {
            return Ok(Frame::new(kind, Vec::new()));
        };
        let length: u64 = length_token
            .parse()
            .map_err(|_| FrameError::InvalidLength {
                header: header.trim_end().to_owned(),
            })?;

        // The announced length only bounds the read; it is never preallocated.
        let mut payload = Vec::new();
        let short_read = |source: io::Error| FrameError::ShortRead {
            kind: kind.to_string(),
            expected: length,
            source: Arc::new(source),
        };
        let read = (&mut self.reader)
            .take(length)
            .read_to_end(&mut payload)
            .map_err(short_read)?;
        if u64::try_from(read).ok() != Some(length) {
            return Err(short_read(io::Error::from(io::ErrorKind::UnexpectedEof)));
        }
        self.expect_terminator(&kind)?;
        Ok(Frame::new(kind, payload))
    }

    fn expect_terminator(&mut self, kind: &FrameKind) -> Result<(), FrameError> {
        let mut terminator = [0_u8; 1];
        match self.reader.read_exact(&mut terminator) {
            Ok(()) if terminator == *b"\n" => Ok(()),
            Ok(()) => Err(FrameError::MissingTerminator {
                kind: kind.to_string(),
            }),
            Err(source) if source.kind() == io::ErrorKind::UnexpectedEof => {
                Err(FrameError::MissingTerminator {
                    kind: kind.to_string(),
                })
            }
            Err(source) => Err(FrameError::io(source)),
        }
    }

    /// Reads one logical response.
    ///
    /// An `err` frame becomes [`ResponseError::Engine`]. A `pdf` frame must be
    /// followed by a `log` frame, whose payload is handed to `on_log` before
    /// the document is returned; a lone `log` frame is handed to `on_log` and
    /// returned without data.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Engine`] for engine-reported failures and
    /// [`ResponseError::Frame`] for framing violations, including
    /// [`FrameError::UnpairedDocument`].
    pub fn receive_response(
        &mut self,
        mut on_log: impl FnMut(&[u8]),
    ) -> Result<Output, ResponseError> {
        let Frame { kind, payload } = self.receive_frame()?;
        match kind {
            FrameKind::Error => Err(ResponseError::Engine {
                message: String::from_utf8_lossy(&payload).into_owned(),
            }),
            FrameKind::Pdf => {
                let log = self.receive_frame()?;
                if log.kind != FrameKind::Log {
                    return Err(FrameError::UnpairedDocument {
                        found: log.kind.to_string(),
                    }
                    .into());
                }
                on_log(&log.payload);
                Ok(Output {
                    kind: FrameKind::Pdf,
                    data: Some(payload),
                })
            }
            FrameKind::Log => {
                on_log(&payload);
                Ok(Output {
                    kind: FrameKind::Log,
                    data: None,
                })
            }
            other => Ok(Output {
                kind: other,
                data: Some(payload),
            }),
        }
    }

    /// Releases the underlying streams.
    #[must_use]
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
