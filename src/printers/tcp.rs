//! TCP printer.

use std::net::IpAddr;

use crate::dissect::{Context, DissectResult};
use crate::nd_print;

const TH_FIN: u8 = 0x01;
const TH_SYN: u8 = 0x02;
const TH_RST: u8 = 0x04;
const TH_PUSH: u8 = 0x08;
const TH_ACK: u8 = 0x10;
const TH_URG: u8 = 0x20;
const TH_ECE: u8 = 0x40;
const TH_CWR: u8 = 0x80;

fn flags_str(flags: u8) -> String {
    let mut s = String::new();
    for (bit, ch) in [
        (TH_FIN, 'F'),
        (TH_SYN, 'S'),
        (TH_RST, 'R'),
        (TH_PUSH, 'P'),
        (TH_ACK, '.'),
        (TH_URG, 'U'),
        (TH_ECE, 'E'),
        (TH_CWR, 'W'),
    ] {
        if flags & bit != 0 {
            s.push(ch);
        }
    }
    if s.is_empty() {
        s.push_str("none");
    }
    s
}

/// Prints a TCP segment starting at the cursor.  `len` is the segment
/// length taken from the enclosing IP header.
pub fn tcp_print(
    ndo: &mut Context<'_>,
    src: IpAddr,
    dst: IpAddr,
    len: usize,
) -> DissectResult<()> {
    ndo.set_protocol("tcp");

    let sport = ndo.fetch_be_u16()?;
    let dport = ndo.fetch_be_u16()?;
    nd_print!(ndo, "{}.{} > {}.{}: ", src, sport, dst, dport);

    let seq = ndo.fetch_be_u32()?;
    let ack = ndo.fetch_be_u32()?;
    let doff_flags = ndo.fetch_be_u16()?;
    let doff = ((doff_flags >> 12) as usize) * 4;
    let flags = (doff_flags & 0xff) as u8;
    let win = ndo.fetch_be_u16()?;
    let _cksum = ndo.fetch_be_u16()?;
    let urg = ndo.fetch_be_u16()?;

    if doff < 20 {
        nd_print!(ndo, "bad-doff {}", doff);
        ndo.invalid();
        return Ok(());
    }
    if len < doff {
        nd_print!(ndo, "bad-len {}", len);
        ndo.invalid();
        return Ok(());
    }
    let payload = len - doff;

    if ndo.qflag() {
        nd_print!(ndo, "tcp {}", payload);
        return Ok(());
    }

    nd_print!(ndo, "Flags [{}]", flags_str(flags));

    if payload > 0 || flags & (TH_SYN | TH_FIN | TH_RST) != 0 {
        if payload > 0 {
            nd_print!(ndo, ", seq {}:{}", seq, seq as u64 + payload as u64);
        } else {
            nd_print!(ndo, ", seq {}", seq);
        }
    }
    if flags & TH_ACK != 0 {
        nd_print!(ndo, ", ack {}", ack);
    }
    nd_print!(ndo, ", win {}", win);
    if flags & TH_URG != 0 {
        nd_print!(ndo, ", urg {}", urg);
    }

    if doff > 20 {
        tcp_opts_print(ndo, doff - 20)?;
    }

    nd_print!(ndo, ", length {}", payload);
    Ok(())
}

/// Walks the options block.  Every iteration consumes at least one
/// byte, so a malformed length field cannot loop.
fn tcp_opts_print(ndo: &mut Context<'_>, optlen: usize) -> DissectResult<()> {
    nd_print!(ndo, ", options [");
    let end = ndo.pos() + optlen;
    let mut first = true;
    while ndo.pos() < end {
        if !first {
            nd_print!(ndo, ",");
        }
        first = false;
        let kind = ndo.fetch_u8()?;
        match kind {
            0 => {
                nd_print!(ndo, "eol");
                break;
            }
            1 => nd_print!(ndo, "nop"),
            _ => {
                let olen = ndo.fetch_u8()? as usize;
                if olen < 2 || ndo.pos() + (olen - 2) > end {
                    nd_print!(ndo, "opt-{}", kind);
                    ndo.invalid();
                    break;
                }
                match (kind, olen) {
                    (2, 4) => {
                        let mss = ndo.fetch_be_u16()?;
                        nd_print!(ndo, "mss {}", mss);
                    }
                    (3, 3) => {
                        let wscale = ndo.fetch_u8()?;
                        nd_print!(ndo, "wscale {}", wscale);
                    }
                    (4, 2) => nd_print!(ndo, "sackOK"),
                    (5, _) => {
                        nd_print!(ndo, "sack {}", (olen - 2) / 8);
                        ndo.skip(olen - 2)?;
                    }
                    (8, 10) => {
                        let val = ndo.fetch_be_u32()?;
                        let ecr = ndo.fetch_be_u32()?;
                        nd_print!(ndo, "TS val {} ecr {}", val, ecr);
                    }
                    _ => {
                        nd_print!(ndo, "opt-{}:{}", kind, olen);
                        ndo.skip(olen - 2)?;
                    }
                }
            }
        }
    }
    // Padding after an eol is legal; step over whatever is left.
    let left = end.saturating_sub(ndo.pos());
    if left > 0 {
        ndo.skip(left)?;
    }
    nd_print!(ndo, "]");
    Ok(())
}
