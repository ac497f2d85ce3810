//! A streaming, pull-based reader and a state-driven writer for the
//! structured textual record format packet records are exchanged in.
//!
//! The format resembles JSON closely enough that a casual reader will
//! mistake it for JSON, but it is not: string literals may be delimited by
//! either `"` or `'`, numbers follow a slightly different grammar (see
//! [`reader::Reader::next`]), and the writer supports suppressing
//! indentation within a short run of sibling values ("packing") so small
//! tuples like `["maxSegmentSize", 1460]` stay on one line.

mod reader;
mod writer;

pub use reader::{
  Error,
  Reader,
  Token,
};
pub use writer::Writer;
