//! IPv4 printer.

use std::net::IpAddr;

use crate::dissect::{Context, DissectResult};
use crate::nd_print;

use super::{icmp, ipproto_name, tcp, udp};

const IP_MF: u16 = 0x2000;
const IP_DF: u16 = 0x4000;

fn flags_str(off: u16) -> &'static str {
    match (off & IP_DF != 0, off & IP_MF != 0) {
        (true, true) => "DF,MF",
        (true, false) => "DF",
        (false, true) => "MF",
        (false, false) => "none",
    }
}

/// Prints an IPv4 packet starting at the cursor.  `wirelen` is the
/// number of bytes the wire carried from this header on.
pub fn ip_print(ndo: &mut Context<'_>, wirelen: usize) -> DissectResult<()> {
    ndo.set_protocol("ip");
    nd_print!(ndo, "IP ");

    let start = ndo.pos();
    let vhl = ndo.fetch_u8()?;
    if vhl >> 4 != 4 {
        nd_print!(ndo, "bad-ip-version {}", vhl >> 4);
        ndo.invalid();
        return Ok(());
    }
    let hlen = ((vhl & 0x0f) as usize) * 4;
    if hlen < 20 {
        nd_print!(ndo, "bad-hlen {}", hlen);
        ndo.invalid();
        return Ok(());
    }

    let tos = ndo.fetch_u8()?;
    let total_len = ndo.fetch_be_u16()? as usize;
    let id = ndo.fetch_be_u16()?;
    let off = ndo.fetch_be_u16()?;
    let ttl = ndo.fetch_u8()?;
    let proto = ndo.fetch_u8()?;
    let _cksum = ndo.fetch_be_u16()?;
    let src = ndo.fetch_ipv4()?;
    let dst = ndo.fetch_ipv4()?;
    if hlen > 20 {
        // Options are bounds-checked but summarized, not itemized.
        ndo.skip(hlen - 20)?;
    }

    if ndo.vflag() > 0 {
        nd_print!(
            ndo,
            "(tos 0x{:x}, ttl {}, id {}, offset {}, flags [{}], proto {} ({}), length {}",
            tos,
            ttl,
            id,
            ((off & 0x1fff) as usize) * 8,
            flags_str(off),
            ipproto_name(proto).unwrap_or("unknown"),
            proto,
            total_len
        );
        if hlen > 20 {
            nd_print!(ndo, ", options ({} bytes)", hlen - 20);
        }
        nd_print!(ndo, ") ");
    }

    if total_len < hlen {
        nd_print!(ndo, "{} > {}: bad-len {}", src, dst, total_len);
        ndo.invalid();
        return Ok(());
    }
    if total_len > wirelen && ndo.vflag() > 0 {
        nd_print!(ndo, "[length {} > wire {}] ", total_len, wirelen);
    }
    let payload_len = total_len - hlen;

    // Bound inner printers to this datagram; trailing link-layer
    // padding must stay invisible to them.
    let pushed = ndo.push_snapend(start + total_len);

    let frag_off = ((off & 0x1fff) as usize) * 8;
    if frag_off != 0 {
        // Non-first fragment: no transport header to decode.
        nd_print!(
            ndo,
            "{} > {}: {} (frag {}:{}@{}{})",
            src,
            dst,
            ipproto_name(proto).unwrap_or("ip-proto"),
            id,
            payload_len,
            frag_off,
            if off & IP_MF != 0 { "+" } else { "" }
        );
    } else {
        match proto {
            1 => icmp::icmp_print(ndo, src, dst, payload_len)?,
            6 => tcp::tcp_print(ndo, IpAddr::V4(src), IpAddr::V4(dst), payload_len)?,
            17 => udp::udp_print(ndo, IpAddr::V4(src), IpAddr::V4(dst), payload_len)?,
            other => {
                match ipproto_name(other) {
                    Some(name) => {
                        nd_print!(ndo, "{} > {}: {}, length {}", src, dst, name, payload_len)
                    }
                    None => nd_print!(
                        ndo,
                        "{} > {}: ip-proto-{}, length {}",
                        src,
                        dst,
                        other,
                        payload_len
                    ),
                }
                if off & IP_MF != 0 {
                    nd_print!(ndo, " (frag {}:{}@0+)", id, payload_len);
                }
            }
        }
    }

    if pushed {
        ndo.pop_packet_info();
    }
    Ok(())
}
