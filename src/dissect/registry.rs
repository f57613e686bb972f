//! Printer registry: link-type codes to decoder entry points.
//!
//! Two function shapes are registered side by side.  The context shape
//! is the native one; the legacy shape takes only the record header and
//! bytes, prints nothing through the engine, and exists for printers
//! that predate the context (they return the link-header length so the
//! payload dump starts in the right place).

use super::context::Context;
use super::error::DissectResult;
use super::PacketHeader;

// ── Link-type codes ───────────────────────────────────────────────────────────

/// BSD loopback: 4-byte host-order address family header.
pub const LINKTYPE_NULL: u32 = 0;
/// Ethernet.
pub const LINKTYPE_EN10MB: u32 = 1;
/// Raw IP, BSD numbering.
pub const LINKTYPE_RAW_BSD: u32 = 12;
/// Raw IP, savefile numbering.
pub const LINKTYPE_RAW: u32 = 101;
/// Linux cooked capture.
pub const LINKTYPE_LINUX_SLL: u32 = 113;

/// Diagnostic name for a link-type code.
pub fn linktype_name(linktype: u32) -> Option<&'static str> {
    match linktype {
        LINKTYPE_NULL => Some("NULL"),
        LINKTYPE_EN10MB => Some("EN10MB"),
        LINKTYPE_RAW_BSD | LINKTYPE_RAW => Some("RAW"),
        LINKTYPE_LINUX_SLL => Some("LINUX_SLL"),
        _ => None,
    }
}

/// Resolves a `-y` argument: a known name or a bare number.
pub fn linktype_from_str(s: &str) -> Option<u32> {
    match s.to_ascii_uppercase().as_str() {
        "NULL" => Some(LINKTYPE_NULL),
        "EN10MB" | "ETHER" => Some(LINKTYPE_EN10MB),
        "RAW" => Some(LINKTYPE_RAW),
        "LINUX_SLL" => Some(LINKTYPE_LINUX_SLL),
        _ => s.parse().ok(),
    }
}

// ── Printer shapes ────────────────────────────────────────────────────────────

/// Legacy shape: `(header, bytes)` to consumed link-header length.
pub type LegacyPrinter = fn(&PacketHeader, &[u8]) -> usize;

/// Context shape: same contract, with the decoding context passed
/// explicitly; truncation propagates through the result.
pub type NdoPrinter = fn(&mut Context<'_>, &PacketHeader, &[u8]) -> DissectResult<usize>;

#[derive(Clone, Copy)]
pub enum PrinterFunc {
    Legacy(LegacyPrinter),
    Ndo(NdoPrinter),
}

pub struct PrinterEntry {
    pub linktype: u32,
    pub name: &'static str,
    pub func: PrinterFunc,
}

// ── The table ─────────────────────────────────────────────────────────────────

static PRINTERS: &[PrinterEntry] = &[
    PrinterEntry {
        linktype: LINKTYPE_EN10MB,
        name: "ether",
        func: PrinterFunc::Ndo(crate::printers::ethernet::ether_if_print),
    },
    PrinterEntry {
        linktype: LINKTYPE_NULL,
        name: "null",
        func: PrinterFunc::Legacy(crate::printers::null::null_if_print),
    },
    PrinterEntry {
        linktype: LINKTYPE_RAW_BSD,
        name: "raw",
        func: PrinterFunc::Ndo(crate::printers::raw::raw_if_print),
    },
    PrinterEntry {
        linktype: LINKTYPE_RAW,
        name: "raw",
        func: PrinterFunc::Ndo(crate::printers::raw::raw_if_print),
    },
];

/// First entry whose code matches, or `None` for unsupported types.
pub fn lookup(linktype: u32) -> Option<&'static PrinterEntry> {
    PRINTERS.iter().find(|e| e.linktype == linktype)
}
