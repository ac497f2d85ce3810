//! Error taxonomy for the codec and the two binaries.

use thiserror::Error;

use crate::record::Error as RecordError;

/// Everything that can go wrong turning a record back into wire bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
  /// The record's tokenisation failed outright.
  #[error("malformed record: {0}")]
  Record(#[from] RecordError),
  /// A structural expectation was not met: a property was missing, or a
  /// token of the wrong kind appeared where a specific one was required.
  #[error("{context}: unexpected token, expected {expected}")]
  UnexpectedToken {
    /// Human-readable breadcrumb of where in the record this happened,
    /// built the way a chain of `PrefixError` calls would read.
    context: String,
    /// What was expected instead.
    expected: &'static str,
  },
  /// An integer field's value fell outside its declared range.
  #[error("{field}: expected integer between {min} and {max}; was {value}")]
  OutOfRange {
    /// Name of the field.
    field: &'static str,
    /// Minimum permitted value (inclusive).
    min: i64,
    /// Maximum permitted value (inclusive).
    max: i64,
    /// Actual value read.
    value: i64,
  },
  /// A name did not resolve to a known table entry in a slot that requires
  /// one.
  #[error("{field}: unknown value '{value}'")]
  UnknownEnumValue {
    /// Name of the field.
    field: &'static str,
    /// The unrecognized name.
    value: String,
  },
  /// Selective acknowledgements were present in a TCP options array.
  #[error("Selective acknowledgements are not supported")]
  UnsupportedSack,
  /// The TCP options block's total encoded length was not a multiple of 4.
  #[error("TCP option block length {0} is not a multiple of 4")]
  OddOptionLength(usize),
}

/// Top-level error for `capture` and `playback`.
#[derive(Debug, Error)]
pub enum AppError {
  /// I/O failure (opening the record log, talking to the TUN device, ...).
  #[error(transparent)]
  Io(#[from] std::io::Error),
  /// Netlink RPC failure.
  #[error("netlink error: {0}")]
  Netlink(#[from] rtnetlink::Error),
  /// A record in the playback log failed to decode.
  #[error(transparent)]
  Deserialize(#[from] DeserializeError),
}
