//! netdump — a protocol-aware packet-capture dissector.
//!
//! The crate splits into the dissection engine ([`dissect`]): bounded
//! cursor, truncation channel, snapshot-end stack, per-packet arena,
//! and printer dispatch; the bundled protocol printers ([`printers`]);
//! and the capture lifecycle ([`capture`]): live and offline sources,
//! savefile writing with rotation, signal handling, privilege drop,
//! and statistics.

pub mod capture;
pub mod cli;
pub mod config;
pub mod dissect;
pub mod printers;
pub mod util;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level convenience re-exports for the most common API entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// Per-packet dispatch driver.
pub use dissect::Dissector;
/// Decoding context handed to every printer.
pub use dissect::Context;
/// Record header shared by sources, savefiles, and dispatch.
pub use dissect::PacketHeader;
/// Session-wide decoding options.
pub use dissect::DissectOptions;
/// The truncation kind and the result alias printers return.
pub use dissect::{DissectResult, Truncated};
/// Savefile access.
pub use capture::{SavefileReader, SavefileWriter};
/// Session configuration and runner.
pub use capture::{run, InputMode, SessionConfig};

pub use cli::constants::VERSION_STRING;
