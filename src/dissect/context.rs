//! Per-packet decoding context.
//!
//! One value of [`Context`] is handed to the printer chain for each
//! dispatched packet.  It carries the bounded cursor (`pos` / `snapend`
//! over the active buffer), the snapshot-end stack, a handle to the
//! packet arena, the session decoding options, and the output sink.
//!
//! All positions are byte offsets into the *active buffer*, which is
//! either the captured frame itself or an owned buffer pushed by a
//! printer that reassembled bytes (see
//! [`push_buffer`](Context::push_buffer)).

use std::fmt;
use std::io::Write;

use super::arena::Arena;
use super::DissectOptions;

/// Saved cursor state, one frame per snapshot-end push.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SavedPacketInfo {
    pub(crate) buf: usize,
    pub(crate) pos: usize,
    pub(crate) snapend: usize,
    pub(crate) owns_buffer: bool,
}

pub struct Context<'p> {
    opts: &'p DissectOptions,
    out: &'p mut dyn Write,
    arena: &'p Arena,
    /// The captured frame, `caplen` bytes of it readable.
    base: &'p [u8],
    caplen: usize,
    origlen: usize,
    /// Buffers owned by snapshot-end frames (reassembly staging).
    pub(crate) owned: Vec<Vec<u8>>,
    /// Active buffer: 0 is the frame, n > 0 is `owned[n - 1]`.
    pub(crate) buf: usize,
    pub(crate) pos: usize,
    pub(crate) snapend: usize,
    pub(crate) stack: Vec<SavedPacketInfo>,
    protocol: &'static str,
    /// Link-layer header length, recorded by the outermost printer so
    /// the payload hex dump knows where to start even after truncation.
    ll_hdr_len: usize,
    suppress_default: bool,
}

impl<'p> Context<'p> {
    pub fn new(
        opts: &'p DissectOptions,
        out: &'p mut dyn Write,
        arena: &'p Arena,
        data: &'p [u8],
        caplen: u32,
        origlen: u32,
    ) -> Self {
        let caplen = (caplen as usize).min(data.len());
        Context {
            opts,
            out,
            arena,
            base: data,
            caplen,
            origlen: origlen as usize,
            owned: Vec::new(),
            buf: 0,
            pos: 0,
            snapend: caplen,
            stack: Vec::new(),
            protocol: "",
            ll_hdr_len: 0,
            suppress_default: opts.suppress_default,
        }
    }

    // ── Buffer resolution ────────────────────────────────────────────────────

    /// The active buffer in full; the readable window is `..self.snapend`.
    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        match self.buf {
            0 => self.base,
            n => &self.owned[n - 1],
        }
    }

    /// Readable capacity of the active buffer, ignoring any narrowing:
    /// `caplen` for the frame, the full length for an owned buffer.
    #[inline]
    pub(crate) fn buffer_cap(&self) -> usize {
        match self.buf {
            0 => self.caplen,
            n => self.owned[n - 1].len(),
        }
    }

    // ── Cursor accessors ─────────────────────────────────────────────────────

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to an absolute offset.  Clamped to the current
    /// snapshot end; printers jump backwards to re-read a region or
    /// forwards past bytes they already accounted for.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.snapend);
    }

    #[inline]
    pub fn snapend(&self) -> usize {
        self.snapend
    }

    /// Bytes left between the cursor and the snapshot end.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.snapend - self.pos
    }

    #[inline]
    pub fn caplen(&self) -> usize {
        self.caplen
    }

    #[inline]
    pub fn origlen(&self) -> usize {
        self.origlen
    }

    // ── Session options ──────────────────────────────────────────────────────

    #[inline]
    pub fn vflag(&self) -> u8 {
        self.opts.verbosity
    }

    #[inline]
    pub fn eflag(&self) -> bool {
        self.opts.eflag
    }

    #[inline]
    pub fn qflag(&self) -> bool {
        self.opts.qflag
    }

    #[inline]
    pub fn numeric(&self) -> bool {
        self.opts.numeric
    }

    #[inline]
    pub fn arena(&self) -> &'p Arena {
        self.arena
    }

    // ── Protocol tag ─────────────────────────────────────────────────────────

    /// Sets the short protocol tag used in the ` [|proto]` decoration.
    /// Every printer does this on entry.
    pub fn set_protocol(&mut self, tag: &'static str) {
        self.protocol = tag;
    }

    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    // ── Link-layer header bookkeeping ────────────────────────────────────────

    pub fn set_ll_hdr_len(&mut self, len: usize) {
        self.ll_hdr_len = len;
    }

    pub fn ll_hdr_len(&self) -> usize {
        self.ll_hdr_len
    }

    // ── Output ───────────────────────────────────────────────────────────────

    /// Formatted print into the packet line.  Printers never write to
    /// the sink directly; sink errors are not a per-field concern and
    /// are intentionally dropped here.
    pub fn print(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
    }

    /// Marks the current field as malformed: prints ` (invalid)` and
    /// returns, letting the printer continue.  This is the non-unwinding
    /// counterpart of the truncation channel.
    pub fn invalid(&mut self) {
        let _ = self.out.write_all(b" (invalid)");
    }

    /// Inhibits the fallback default print for the rest of this packet.
    /// Printers that already emitted a complete rendering call this.
    pub fn set_suppress_default(&mut self) {
        self.suppress_default = true;
    }

    pub fn suppress_default(&self) -> bool {
        self.suppress_default
    }

    /// Fallback rendering for payload no printer claims: a hex+ASCII
    /// dump of the bytes from `from` to the snapshot end, unless
    /// suppressed.
    pub fn default_print(&mut self, from: usize) {
        if self.suppress_default {
            return;
        }
        let end = self.snapend;
        let start = from.min(end);
        if start == end {
            return;
        }
        let data = match self.buf {
            0 => &self.base[start..end],
            n => &self.owned[n - 1][start..end],
        };
        let _ = super::hexdump::hex_and_ascii_print(&mut *self.out, "\n\t", data);
    }
}

/// Formatted print into the packet line through the context.
///
/// `nd_print!(ndo, "ttl {}", ttl)` is the printer-side spelling of
/// `ndo.print(format_args!(...))`.
#[macro_export]
macro_rules! nd_print {
    ($ndo:expr, $($arg:tt)*) => {
        $ndo.print(format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::PacketHeader;

    fn fixture<'a>(
        opts: &'a DissectOptions,
        out: &'a mut Vec<u8>,
        arena: &'a Arena,
        data: &'a [u8],
    ) -> Context<'a> {
        let h = PacketHeader::new(0, 0, data.len() as u32, data.len() as u32);
        Context::new(opts, out, arena, data, h.caplen, h.len)
    }

    #[test]
    fn print_and_invalid_reach_the_sink() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        {
            let mut ndo = fixture(&opts, &mut out, &arena, &[0u8; 4]);
            nd_print!(ndo, "ttl {}", 64);
            ndo.invalid();
        }
        assert_eq!(out, b"ttl 64 (invalid)");
    }

    #[test]
    fn default_print_honors_suppress() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        {
            let mut ndo = fixture(&opts, &mut out, &arena, b"abcd");
            ndo.set_suppress_default();
            ndo.default_print(0);
        }
        assert!(out.is_empty());
    }

    #[test]
    fn default_print_dumps_payload() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        {
            let mut ndo = fixture(&opts, &mut out, &arena, b"abcd");
            ndo.default_print(0);
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("6162 6364"));
    }

    #[test]
    fn caplen_clamped_to_data() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        let data = [0u8; 10];
        let ndo = Context::new(&opts, &mut out, &arena, &data, 100, 100);
        assert_eq!(ndo.caplen(), 10);
        assert_eq!(ndo.snapend(), 10);
    }
}
