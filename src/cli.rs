//! Command-line argument definitions for the two binaries.

use std::path::PathBuf;

use clap::Parser;

/// Bring up a TUN interface and record every packet it carries as a
/// human-readable record on stdout.
#[derive(Debug, Parser)]
#[command(name = "capture", version, about)]
pub struct CaptureArgs {}

/// Replay a previously captured record log back out through a TUN
/// interface.
#[derive(Debug, Parser)]
#[command(name = "playback", version, about)]
pub struct PlaybackArgs {
  /// Name of the TUN interface to create and play packets through.
  pub iface_name: String,
  /// Path to a record log produced by `capture`.
  pub packet_log: PathBuf,
}
