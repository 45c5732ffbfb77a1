//! Error types for the deobfuscator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::DecoderKey;

/// Errors that abort a whole deobfuscation run.
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be parsed. No rewriting was performed.
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// Code generation failed while writing into the output buffer.
    #[error("failed to emit code: {0}")]
    Emit(#[from] io::Error),

    /// The emitter produced bytes that are not valid UTF-8.
    #[error("emitted code is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The output file could not be written. The destination was left untouched.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Convenient `Result` alias for fallible deobfuscation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a single decoder call could not be resolved.
///
/// These never abort a run: the call is left as written and the failure is
/// recorded in the [`Report`](crate::Report).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The decoder has no string for this index.
    #[error("index {0} is outside the decoder's domain")]
    OutOfDomain(i64),

    /// The numeric literal is not an integer index.
    #[error("{0} is not an integer index")]
    NonIntegerIndex(f64),

    /// The alias resolved to a key with no registered decoder.
    #[error("no decoder registered for `{0}`")]
    UnknownDecoder(DecoderKey),

    /// The decoder panicked.
    #[error("decoder panicked: {0}")]
    Panicked(String),

    /// Any other decoder-specific failure.
    #[error("{0}")]
    Failed(String),
}
