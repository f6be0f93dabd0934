//! Pooled driver for the Prince control protocol.
//!
//! Prince can run as a long-lived process (`prince --control`) that accepts
//! rendering jobs over standard input and answers with PDF documents on
//! standard output. This crate keeps a fixed number of such engine sessions
//! alive and balances caller jobs across them.
//!
//! # Architecture
//!
//! A caller describes a [`Job`]: an input document, output options, and
//! auxiliary files keyed by logical name. The [`Pool`] queues the job; a
//! worker owning an [`EngineSession`] builds the engine-facing
//! [`WireRequest`], which replaces file references with positional
//! `job-resource:<index>` placeholders, and writes it through the
//! [`EngineTransport`] frame codec. The response is decoded and handed back
//! to the waiting caller. Engine logs and standard error are routed to a
//! [`DiagnosticSink`].
//!
//! Workers supervise their sessions: an engine that exits or desynchronises
//! its stream is replaced, and the job it was serving fails with
//! [`JobError::SessionLost`] or [`JobError::Frame`].

pub mod diagnostics;
pub mod error;
pub mod job;
pub mod pool;
pub mod protocol;
pub mod request;
pub mod session;

pub use self::diagnostics::{DiagnosticSink, TracingDiagnostics};
pub use self::error::{FrameError, JobError, PoolError, ResponseError, SessionError};
pub use self::job::{Attachment, Encrypt, Input, Job, Metadata, PdfOptions};
pub use self::pool::Pool;
pub use self::protocol::{EngineTransport, Frame, FrameKind, Output};
pub use self::request::WireRequest;
pub use self::session::{EngineSession, ProcessHandle, SessionState};
