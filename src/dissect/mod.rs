//! The dissection engine.
//!
//! Everything a per-protocol printer builds on lives here: the bounded
//! cursor over captured bytes, the truncation channel, the snapshot-end
//! stack for nested encapsulations, the per-packet arena, and the
//! registry/dispatch machinery that turns `(header, bytes)` pairs into
//! one line of protocol-aware text.

pub mod arena;
pub mod context;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod hexdump;
pub mod registry;
pub mod snapend;
pub mod timestamp;

pub use context::Context;
pub use dispatch::Dissector;
pub use error::{DissectResult, Truncated};
pub use timestamp::TimeMode;

/// Per-packet record header as delivered by a capture source or read
/// from a savefile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Capture timestamp, seconds since the epoch.
    pub ts_sec: u32,
    /// Microseconds within the second.
    pub ts_usec: u32,
    /// Bytes actually captured (present in the data slice).
    pub caplen: u32,
    /// Bytes the packet had on the wire.
    pub len: u32,
}

impl PacketHeader {
    pub fn new(ts_sec: u32, ts_usec: u32, caplen: u32, len: u32) -> Self {
        PacketHeader {
            ts_sec,
            ts_usec,
            caplen,
            len,
        }
    }
}

/// Session-wide decoding options surfaced to printers through the
/// per-packet context.
#[derive(Debug, Clone)]
pub struct DissectOptions {
    /// Detail level, 0..=5 (`-v` repetitions).
    pub verbosity: u8,
    /// Timestamp rendering mode (`-t` repetitions).
    pub time_mode: TimeMode,
    /// Skip address-to-name resolution (`-n`).
    pub numeric: bool,
    /// Print the link-level header on each line (`-e`).
    pub eflag: bool,
    /// Quiet: less protocol detail (`-q`).
    pub qflag: bool,
    /// Hex dump tier: 0 off, 1 payload, 2 full frame (`-x` / `-xx`).
    pub hex: u8,
    /// Hex+ASCII dump tier (`-X` / `-XX`).
    pub hex_ascii: u8,
    /// ASCII dump tier (`-A` / `-AA`).
    pub ascii: u8,
    /// Session-wide inhibit of the fallback default print.
    pub suppress_default: bool,
    /// Flush the output sink after every packet line (`-l`).
    pub line_flush: bool,
}

impl Default for DissectOptions {
    fn default() -> Self {
        DissectOptions {
            verbosity: 0,
            time_mode: TimeMode::Absolute,
            numeric: false,
            eflag: false,
            qflag: false,
            hex: 0,
            hex_ascii: 0,
            ascii: 0,
            suppress_default: false,
            line_flush: false,
        }
    }
}
