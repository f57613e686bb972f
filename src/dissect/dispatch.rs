//! Per-packet dispatch: the hot path.
//!
//! [`Dissector`] owns everything that survives across packets (options,
//! output sink, arena, timestamp state, the selected printer) and runs
//! the per-packet pipeline: timestamp, printer invocation behind the
//! truncation landing pad, dump tiers, terminating newline, state
//! reset.  Truncation never leaks past here, and a panicking printer is
//! converted into the same ` [|proto]` decoration rather than killing
//! the capture loop.

use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::displaylevel;

use super::arena::Arena;
use super::context::Context;
use super::hexdump;
use super::registry::{self, PrinterEntry, PrinterFunc};
use super::timestamp::TsState;
use super::{DissectOptions, PacketHeader};

// ── Dispatch depth and deferred info ──────────────────────────────────────────
//
// The info signal handler must not interleave statistics with a
// half-printed packet line.  The handler checks the depth: zero means
// the request can be serviced immediately by the capture loop, non-zero
// means it is parked here and promoted when the current packet's
// dispatch finishes.

pub static DISPATCH_DEPTH: AtomicU32 = AtomicU32::new(0);
static INFO_DEFERRED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn dispatch_depth() -> u32 {
    DISPATCH_DEPTH.load(Ordering::Relaxed)
}

/// Parks an info request until the in-flight packet completes.
/// Async-signal-safe: a single flag store.
#[inline]
pub fn defer_info() {
    INFO_DEFERRED.store(true, Ordering::Relaxed);
}

#[inline]
fn enter_dispatch() {
    DISPATCH_DEPTH.fetch_add(1, Ordering::Relaxed);
}

#[inline]
fn leave_dispatch() {
    DISPATCH_DEPTH.fetch_sub(1, Ordering::Relaxed);
    if INFO_DEFERRED.swap(false, Ordering::Relaxed) {
        crate::capture::signals::INFO_REQUESTED.store(true, Ordering::Relaxed);
    }
}

// ── The dissector ─────────────────────────────────────────────────────────────

pub struct Dissector<W: Write> {
    opts: DissectOptions,
    out: W,
    arena: Arena,
    ts: TsState,
    linktype: u32,
    printer: Option<&'static PrinterEntry>,
    warned_unsupported: bool,
    packets_captured: u64,
}

impl<W: Write> Dissector<W> {
    pub fn new(opts: DissectOptions, out: W) -> Self {
        Dissector {
            opts,
            out,
            arena: Arena::new(),
            ts: TsState::default(),
            linktype: registry::LINKTYPE_EN10MB,
            printer: registry::lookup(registry::LINKTYPE_EN10MB),
            warned_unsupported: false,
            packets_captured: 0,
        }
    }

    /// Selects the printer for a capture source's link type.  Called
    /// once per input; an unsupported type is reported on the first
    /// dispatched packet, not here.
    pub fn set_linktype(&mut self, linktype: u32) {
        self.linktype = linktype;
        self.printer = registry::lookup(linktype);
    }

    pub fn linktype(&self) -> u32 {
        self.linktype
    }

    pub fn packets_captured(&self) -> u64 {
        self.packets_captured
    }

    pub fn options(&self) -> &DissectOptions {
        &self.opts
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    /// Dissects one packet and emits its line.
    pub fn print_packet(&mut self, h: &PacketHeader, data: &[u8]) {
        self.packets_captured += 1;
        enter_dispatch();

        let _ = self.ts.ts_print(&mut self.out, self.opts.time_mode, h);

        let caplen = (h.caplen as usize).min(data.len());
        self.arena.reset();

        let hdrlen = match self.printer {
            Some(entry) => self.run_printer(entry, h, data),
            None => {
                if !self.warned_unsupported {
                    displaylevel!(
                        1,
                        "netdump: packet printing is not supported for link type {}\n",
                        self.linktype
                    );
                    self.warned_unsupported = true;
                }
                if !self.opts.suppress_default && caplen > 0 {
                    let _ = hexdump::hex_and_ascii_print(&mut self.out, "\n\t", &data[..caplen]);
                }
                0
            }
        };

        self.dump_tiers(hdrlen.min(caplen), &data[..caplen]);

        let _ = self.out.write_all(b"\n");
        if self.opts.line_flush {
            let _ = self.out.flush();
        }

        self.arena.reset();
        leave_dispatch();
    }

    /// Runs one printer behind the truncation landing pad.  Returns the
    /// consumed link-header length.
    fn run_printer(&mut self, entry: &'static PrinterEntry, h: &PacketHeader, data: &[u8]) -> usize {
        match entry.func {
            PrinterFunc::Legacy(f) => {
                let caplen = (h.caplen as usize).min(data.len());
                f(h, &data[..caplen])
            }
            PrinterFunc::Ndo(f) => {
                let mut ndo = Context::new(
                    &self.opts,
                    &mut self.out,
                    &self.arena,
                    data,
                    h.caplen,
                    h.len,
                );
                ndo.set_protocol(entry.name);
                let outcome = catch_unwind(AssertUnwindSafe(|| f(&mut ndo, h, data)));
                let hdrlen = match outcome {
                    Ok(Ok(n)) => n,
                    Ok(Err(_)) => {
                        // Truncation landing pad: decorate and recover.
                        let tag = ndo.protocol();
                        ndo.print(format_args!(" [|{}]", tag));
                        ndo.ll_hdr_len()
                    }
                    Err(_) => {
                        // A printer bug must not kill the loop; render it
                        // like a truncated packet.
                        let tag = ndo.protocol();
                        ndo.print(format_args!(" [|{}]", tag));
                        displaylevel!(1, "netdump: printer for {} panicked\n", entry.name);
                        ndo.ll_hdr_len()
                    }
                };
                ndo.pop_all_packet_info();
                hdrlen
            }
        }
    }

    /// Explicit `-x` / `-X` / `-A` dump tiers.  Tier 1 dumps the bytes
    /// past the link-layer header, tier 2 the whole frame; these run
    /// regardless of the suppress-default flag.
    fn dump_tiers(&mut self, hdrlen: usize, frame: &[u8]) {
        let out = &mut self.out;
        if self.opts.hex_ascii > 0 {
            if self.opts.hex_ascii > 1 {
                let _ = hexdump::hex_and_ascii_print(out, "\n\t", frame);
            } else if frame.len() > hdrlen {
                let _ = hexdump::hex_and_ascii_print(out, "\n\t", &frame[hdrlen..]);
            }
        } else if self.opts.hex > 0 {
            if self.opts.hex > 1 {
                let _ = hexdump::hex_print(out, "\n\t", frame);
            } else if frame.len() > hdrlen {
                let _ = hexdump::hex_print(out, "\n\t", &frame[hdrlen..]);
            }
        } else if self.opts.ascii > 0 {
            if self.opts.ascii > 1 {
                let _ = hexdump::ascii_print(out, frame);
            } else if frame.len() > hdrlen {
                let _ = hexdump::ascii_print(out, &frame[hdrlen..]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::error::DissectResult;
    use crate::dissect::registry::LINKTYPE_EN10MB;
    use crate::dissect::TimeMode;

    fn opts() -> DissectOptions {
        DissectOptions {
            time_mode: TimeMode::NoTime,
            ..DissectOptions::default()
        }
    }

    fn eth_ip_udp_packet() -> Vec<u8> {
        // Ethernet + IPv4 + UDP, 4 payload bytes.
        let mut p = Vec::new();
        p.extend_from_slice(&[0u8; 6]); // dst
        p.extend_from_slice(&[0u8; 6]); // src
        p.extend_from_slice(&[0x08, 0x00]);
        p.extend_from_slice(&[
            0x45, 0x00, 0x00, 0x20, // vhl tos len=32
            0x00, 0x01, 0x00, 0x00, // id, flags/off
            0x40, 0x11, 0x00, 0x00, // ttl, proto UDP, cksum
            10, 0, 0, 1, // src
            10, 0, 0, 2, // dst
        ]);
        p.extend_from_slice(&[
            0x04, 0xd2, 0x00, 0x35, // 1234 -> 53
            0x00, 0x0c, 0x00, 0x00, // len 12, cksum
        ]);
        p.extend_from_slice(b"abcd");
        p
    }

    fn hdr_for(p: &[u8]) -> PacketHeader {
        PacketHeader::new(0, 0, p.len() as u32, p.len() as u32)
    }

    fn dissect(opts: DissectOptions, h: &PacketHeader, data: &[u8]) -> String {
        let mut d = Dissector::new(opts, Vec::new());
        d.set_linktype(LINKTYPE_EN10MB);
        d.print_packet(h, data);
        String::from_utf8(d.into_writer()).unwrap()
    }

    #[test]
    fn line_always_ends_with_newline() {
        let p = eth_ip_udp_packet();
        let line = dissect(opts(), &hdr_for(&p), &p);
        assert!(line.ends_with('\n'));
        assert!(line.contains("10.0.0.1.1234 > 10.0.0.2.53"));
        assert!(line.contains("UDP"));
    }

    #[test]
    fn truncated_packet_gets_marker_and_newline() {
        let p = eth_ip_udp_packet();
        let mut h = hdr_for(&p);
        h.caplen = 20; // cuts the IPv4 header short
        let line = dissect(opts(), &h, &p[..20]);
        assert!(line.ends_with("[|ip]\n"), "line: {:?}", line);
    }

    #[test]
    fn unsupported_linktype_zero_prefix_dump() {
        let o = DissectOptions {
            time_mode: TimeMode::NoTime,
            ..DissectOptions::default()
        };
        let mut d = Dissector::new(o, Vec::new());
        d.set_linktype(247);
        let p = [0xABu8; 4];
        let h = PacketHeader::new(0, 0, 4, 4);
        d.print_packet(&h, &p);
        let line = String::from_utf8(d.into_writer()).unwrap();
        // Whole frame dumped from offset zero.
        assert!(line.contains("abab abab"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn hex_tier_one_skips_link_header() {
        let p = eth_ip_udp_packet();
        let o = DissectOptions {
            time_mode: TimeMode::NoTime,
            hex: 1,
            ..DissectOptions::default()
        };
        let line = dissect(o, &hdr_for(&p), &p);
        // First dumped bytes are the IP header, not the MAC addresses.
        assert!(line.contains("0x0000: 4500"), "line: {:?}", line);
    }

    #[test]
    fn hex_tier_two_includes_link_header() {
        let p = eth_ip_udp_packet();
        let o = DissectOptions {
            time_mode: TimeMode::NoTime,
            hex: 2,
            ..DissectOptions::default()
        };
        let line = dissect(o, &hdr_for(&p), &p);
        assert!(line.contains("0x0000: 0000"), "line: {:?}", line);
    }

    #[test]
    fn panicking_printer_is_contained() {
        fn boom(
            _ndo: &mut Context<'_>,
            _h: &PacketHeader,
            _p: &[u8],
        ) -> DissectResult<usize> {
            panic!("printer bug");
        }
        static ENTRY: PrinterEntry = PrinterEntry {
            linktype: 247,
            name: "boom",
            func: PrinterFunc::Ndo(boom),
        };
        let mut d = Dissector::new(opts(), Vec::new());
        let h = PacketHeader::new(0, 0, 2, 2);
        let hdrlen = d.run_printer(&ENTRY, &h, &[0, 0]);
        assert_eq!(hdrlen, 0);
        let line = String::from_utf8(d.into_writer()).unwrap();
        assert!(line.ends_with("[|boom]"), "line: {:?}", line);
    }

    #[test]
    fn truncation_error_type_round_trips() {
        fn trunc(
            ndo: &mut Context<'_>,
            _h: &PacketHeader,
            _p: &[u8],
        ) -> DissectResult<usize> {
            ndo.set_protocol("stub");
            ndo.fetch_be_u32()?; // only two bytes captured
            Ok(0)
        }
        static ENTRY: PrinterEntry = PrinterEntry {
            linktype: 247,
            name: "stub",
            func: PrinterFunc::Ndo(trunc),
        };
        let mut d = Dissector::new(opts(), Vec::new());
        let h = PacketHeader::new(0, 0, 2, 2);
        let _ = d.run_printer(&ENTRY, &h, &[0, 0]);
        let line = String::from_utf8(d.into_writer()).unwrap();
        assert_eq!(line, " [|stub]");
    }

    #[test]
    fn deferred_info_promotes_after_dispatch() {
        enter_dispatch();
        // What the signal handler does when it finds a dispatch in
        // flight:
        assert!(dispatch_depth() > 0);
        defer_info();
        leave_dispatch();
        assert!(crate::capture::signals::INFO_REQUESTED.swap(false, Ordering::Relaxed));
    }

    #[test]
    fn capture_counter_increments() {
        let p = eth_ip_udp_packet();
        let h = hdr_for(&p);
        let mut d = Dissector::new(opts(), Vec::new());
        d.print_packet(&h, &p);
        d.print_packet(&h, &p);
        assert_eq!(d.packets_captured(), 2);
    }
}
