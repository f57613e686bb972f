//! IPv6 printer, including the extension-header walk and the RFC 2675
//! Jumbo Payload revision of the snapshot end.

use std::net::IpAddr;

use crate::dissect::{Context, DissectResult};
use crate::nd_print;

use super::{ipproto_name, tcp, udp};

const IPV6_HDR_LEN: usize = 40;

const NH_HOPOPTS: u8 = 0;
const NH_TCP: u8 = 6;
const NH_UDP: u8 = 17;
const NH_ROUTING: u8 = 43;
const NH_FRAGMENT: u8 = 44;
const NH_ICMP6: u8 = 58;
const NH_NONE: u8 = 59;
const NH_DSTOPTS: u8 = 60;

const OPT_PAD1: u8 = 0;
const OPT_JUMBO: u8 = 0xc2;

/// Upper bound on chained extension headers; beyond this the packet is
/// hostile, not interesting.
const MAX_EXT_HEADERS: usize = 8;

/// Prints an IPv6 packet starting at the cursor.  `wirelen` is the
/// number of bytes the wire carried from this header on.
pub fn ip6_print(ndo: &mut Context<'_>, wirelen: usize) -> DissectResult<()> {
    ndo.set_protocol("ip6");
    nd_print!(ndo, "IP6 ");

    let start = ndo.pos();
    let vtf = ndo.fetch_be_u32()?;
    if vtf >> 28 != 6 {
        nd_print!(ndo, "bad-ip6-version {}", vtf >> 28);
        ndo.invalid();
        return Ok(());
    }
    let flow = vtf & 0x000f_ffff;
    let plen = ndo.fetch_be_u16()? as usize;
    let first_nh = ndo.fetch_u8()?;
    let hlim = ndo.fetch_u8()?;
    let src = ndo.fetch_ipv6()?;
    let dst = ndo.fetch_ipv6()?;

    if ndo.vflag() > 0 {
        nd_print!(
            ndo,
            "(flowlabel 0x{:05x}, hlim {}, next-header {} ({}), payload length {}) ",
            flow,
            hlim,
            ipproto_name(first_nh).unwrap_or("unknown"),
            first_nh,
            plen
        );
    }

    // Bound inner printers to the datagram.  A zero payload length
    // leaves the bound at the capture end until a Jumbo Payload option
    // supplies the real figure.
    let datagram_end = if plen != 0 {
        start + IPV6_HDR_LEN + plen
    } else {
        usize::MAX
    };
    let pushed = ndo.push_snapend(datagram_end);

    let mut payload_len = plen;
    let mut nh = first_nh;
    let result: DissectResult<()> = 'walk: {
        for _ in 0..MAX_EXT_HEADERS {
            match nh {
                NH_HOPOPTS | NH_DSTOPTS => {
                    let hdr_start = ndo.pos();
                    let next = ndo.fetch_u8()?;
                    let elen = ndo.fetch_u8()? as usize;
                    let opts_end = hdr_start + (elen + 1) * 8;
                    while ndo.pos() < opts_end {
                        let t = ndo.fetch_u8()?;
                        if t == OPT_PAD1 {
                            continue;
                        }
                        let olen = ndo.fetch_u8()? as usize;
                        if t == OPT_JUMBO && olen == 4 {
                            let jumbo = ndo.fetch_be_u32()? as usize;
                            if plen == 0 {
                                if ndo.vflag() > 0 {
                                    nd_print!(ndo, "(jumbogram, length {}) ", jumbo);
                                }
                                payload_len = jumbo;
                                ndo.adjust_snapend(start + IPV6_HDR_LEN + jumbo);
                            } else {
                                nd_print!(ndo, "(jumbo with payload length {})", plen);
                                ndo.invalid();
                            }
                        } else {
                            // PadN and every option not decoded here.
                            ndo.skip(olen)?;
                        }
                    }
                    nh = next;
                }
                NH_ROUTING => {
                    let next = ndo.fetch_u8()?;
                    let elen = ndo.fetch_u8()? as usize;
                    ndo.skip((elen + 1) * 8 - 2)?;
                    nh = next;
                }
                NH_FRAGMENT => {
                    let next = ndo.fetch_u8()?;
                    let _reserved = ndo.fetch_u8()?;
                    let offlg = ndo.fetch_be_u16()?;
                    let ident = ndo.fetch_be_u32()?;
                    let frag_off = (offlg & !0x7) as usize;
                    if frag_off != 0 {
                        let left = ndo.remaining();
                        nd_print!(
                            ndo,
                            "{} > {}: frag ({}:{}@{}{})",
                            src,
                            dst,
                            ident,
                            left,
                            frag_off,
                            if offlg & 1 != 0 { "+" } else { "" }
                        );
                        break 'walk Ok(());
                    }
                    nh = next;
                }
                NH_NONE => {
                    nd_print!(ndo, "{} > {}: no next header", src, dst);
                    break 'walk Ok(());
                }
                NH_TCP => {
                    let l4len = l4_length(ndo, start, payload_len, wirelen);
                    break 'walk tcp::tcp_print(ndo, IpAddr::V6(src), IpAddr::V6(dst), l4len);
                }
                NH_UDP => {
                    let l4len = l4_length(ndo, start, payload_len, wirelen);
                    break 'walk udp::udp_print(ndo, IpAddr::V6(src), IpAddr::V6(dst), l4len);
                }
                NH_ICMP6 => {
                    let l4len = l4_length(ndo, start, payload_len, wirelen);
                    let t = ndo.fetch_u8()?;
                    let c = ndo.fetch_u8()?;
                    nd_print!(
                        ndo,
                        "{} > {}: ICMP6, type {} code {}, length {}",
                        src,
                        dst,
                        t,
                        c,
                        l4len
                    );
                    break 'walk Ok(());
                }
                other => {
                    let l4len = l4_length(ndo, start, payload_len, wirelen);
                    match ipproto_name(other) {
                        Some(name) => nd_print!(
                            ndo,
                            "{} > {}: {}, length {}",
                            src,
                            dst,
                            name,
                            l4len
                        ),
                        None => nd_print!(
                            ndo,
                            "{} > {}: ip6-proto-{}, length {}",
                            src,
                            dst,
                            other,
                            l4len
                        ),
                    }
                    break 'walk Ok(());
                }
            }
        }
        nd_print!(ndo, "{} > {}: too many extension headers", src, dst);
        ndo.invalid();
        Ok(())
    };
    result?;

    if pushed {
        ndo.pop_packet_info();
    }
    Ok(())
}

/// Transport-payload length as implied by the length fields: the
/// datagram's payload (possibly jumbo-revised) minus the extension
/// headers already consumed.  Falls back to the wire length when the
/// payload length is genuinely absent.
fn l4_length(ndo: &Context<'_>, start: usize, payload_len: usize, wirelen: usize) -> usize {
    let consumed = ndo.pos() - start;
    if payload_len != 0 {
        (IPV6_HDR_LEN + payload_len).saturating_sub(consumed)
    } else {
        wirelen.saturating_sub(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::arena::Arena;
    use crate::dissect::{DissectOptions, PacketHeader, Truncated};

    fn ip6_header(plen: u16, nh: u8) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&0x6000_0000u32.to_be_bytes());
        p.extend_from_slice(&plen.to_be_bytes());
        p.push(nh);
        p.push(64);
        let mut src = [0u8; 16];
        src[0] = 0xfe;
        src[1] = 0x80;
        src[15] = 1;
        let mut dst = [0u8; 16];
        dst[0] = 0xfe;
        dst[1] = 0x80;
        dst[15] = 2;
        p.extend_from_slice(&src);
        p.extend_from_slice(&dst);
        p
    }

    fn udp_datagram(payload: &[u8]) -> Vec<u8> {
        let mut u = Vec::new();
        u.extend_from_slice(&546u16.to_be_bytes());
        u.extend_from_slice(&547u16.to_be_bytes());
        u.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
        u.extend_from_slice(&[0, 0]);
        u.extend_from_slice(payload);
        u
    }

    fn run(opts: &DissectOptions, data: &[u8]) -> (DissectResult<()>, String, usize) {
        let arena = Arena::new();
        let mut out = Vec::new();
        let h = PacketHeader::new(0, 0, data.len() as u32, data.len() as u32);
        let (r, depth) = {
            let mut ndo = Context::new(opts, &mut out, &arena, data, h.caplen, h.len);
            let r = ip6_print(&mut ndo, data.len());
            (r, ndo.packet_info_depth())
        };
        (r, String::from_utf8(out).unwrap(), depth)
    }

    #[test]
    fn plain_udp_over_ip6() {
        let udp = udp_datagram(b"hi");
        let mut p = ip6_header(udp.len() as u16, 17);
        p.extend_from_slice(&udp);
        let (r, text, depth) = run(&DissectOptions::default(), &p);
        r.unwrap();
        assert!(text.contains("IP6 fe80::1.546 > fe80::2.547: UDP, length 2"), "{:?}", text);
        assert_eq!(depth, 0);
    }

    #[test]
    fn hop_by_hop_jumbo_adjusts_snapend() {
        // Payload length 0; Hop-by-Hop carries a Jumbo Payload of
        // 70000 bytes: 8 bytes of extension header + 69992 of UDP,
        // whose own 16-bit length field is zero per the jumbogram
        // rules.
        let jumbo: u32 = 70_000;
        let udp_len = jumbo as usize - 8;
        let mut p = ip6_header(0, 0);
        p.push(17); // next header: UDP
        p.push(0); // length: one 8-octet unit
        p.extend_from_slice(&[OPT_JUMBO, 4]);
        p.extend_from_slice(&jumbo.to_be_bytes());
        p.extend_from_slice(&546u16.to_be_bytes());
        p.extend_from_slice(&547u16.to_be_bytes());
        p.extend_from_slice(&0u16.to_be_bytes());
        p.extend_from_slice(&[0, 0]);
        p.extend_from_slice(&vec![0u8; udp_len - 8]);
        let (r, text, depth) = run(&DissectOptions::default(), &p);
        r.unwrap();
        assert!(!text.contains("[|"), "no truncation expected: {:?}", text);
        assert!(
            text.contains(&format!("UDP, length {}", udp_len - 8)),
            "{:?}",
            text
        );
        assert_eq!(depth, 0);
    }

    #[test]
    fn jumbo_with_nonzero_payload_length_is_invalid() {
        let udp = udp_datagram(b"");
        let mut p = ip6_header((8 + udp.len()) as u16, 0);
        p.push(17);
        p.push(0);
        p.extend_from_slice(&[OPT_JUMBO, 4]);
        p.extend_from_slice(&100u32.to_be_bytes());
        p.extend_from_slice(&udp);
        let (r, text, _) = run(&DissectOptions::default(), &p);
        r.unwrap();
        assert!(text.contains("(jumbo with payload length 16) (invalid)"), "{:?}", text);
    }

    #[test]
    fn non_first_fragment_prints_frag() {
        let mut p = ip6_header(8 + 32, 44);
        p.push(17); // next header
        p.push(0); // reserved
        p.extend_from_slice(&(1504u16).to_be_bytes()); // offset 1504 (&!7), no M
        p.extend_from_slice(&0xdeadu32.to_be_bytes());
        p.extend_from_slice(&[0u8; 32]);
        let (r, text, _) = run(&DissectOptions::default(), &p);
        r.unwrap();
        assert!(text.contains("frag (57005:32@1504)"), "{:?}", text);
    }

    #[test]
    fn truncated_base_header_unwinds() {
        let p = ip6_header(0, 59);
        let (r, _, _) = run(&DissectOptions::default(), &p[..30]);
        assert_eq!(r, Err(Truncated));
    }

    #[test]
    fn wrong_version_is_invalid() {
        let mut p = ip6_header(0, 59);
        p[0] = 0x40;
        let (r, text, _) = run(&DissectOptions::default(), &p);
        r.unwrap();
        assert!(text.contains("bad-ip6-version 4 (invalid)"), "{:?}", text);
    }
}
