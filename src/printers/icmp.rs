//! ICMP printer.

use std::net::Ipv4Addr;

use crate::dissect::{Context, DissectResult};
use crate::nd_print;

/// Prints an ICMP message starting at the cursor.  `len` is the payload
/// length reported by the enclosing IP header.
pub fn icmp_print(
    ndo: &mut Context<'_>,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    len: usize,
) -> DissectResult<()> {
    ndo.set_protocol("icmp");

    let icmp_type = ndo.fetch_u8()?;
    let code = ndo.fetch_u8()?;
    let _cksum = ndo.fetch_be_u16()?;

    nd_print!(ndo, "{} > {}: ICMP ", src, dst);

    match icmp_type {
        0 | 8 => {
            let id = ndo.fetch_be_u16()?;
            let seq = ndo.fetch_be_u16()?;
            let what = if icmp_type == 8 {
                "echo request"
            } else {
                "echo reply"
            };
            nd_print!(ndo, "{}, id {}, seq {}, length {}", what, id, seq, len);
        }
        3 => {
            let reason = match code {
                0 => "net unreachable",
                1 => "host unreachable",
                3 => "port unreachable",
                4 => "fragmentation needed",
                _ => "unreachable",
            };
            nd_print!(ndo, "{} (code {}), length {}", reason, code, len);
            if ndo.vflag() > 0 {
                print_embedded_datagram(ndo)?;
            }
        }
        11 => nd_print!(ndo, "time exceeded (code {}), length {}", code, len),
        5 => nd_print!(ndo, "redirect (code {}), length {}", code, len),
        other => nd_print!(ndo, "type {} code {}, length {}", other, code, len),
    }
    Ok(())
}

/// Error messages carry the offending datagram's IP header after four
/// unused bytes.  Stage a copy in the packet arena and summarize it.
fn print_embedded_datagram(ndo: &mut Context<'_>) -> DissectResult<()> {
    ndo.skip(4)?; // unused / next-hop MTU
    let Some(hdr) = ndo.arena().alloc(20, 1) else {
        ndo.invalid();
        return Ok(());
    };
    ndo.fetch_bytes(hdr)?;
    if hdr[0] >> 4 != 4 {
        return Ok(());
    }
    let proto = hdr[9];
    let orig_src = Ipv4Addr::new(hdr[12], hdr[13], hdr[14], hdr[15]);
    let orig_dst = Ipv4Addr::new(hdr[16], hdr[17], hdr[18], hdr[19]);
    nd_print!(
        ndo,
        " for {} > {} (proto {})",
        orig_src,
        orig_dst,
        proto
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::arena::Arena;
    use crate::dissect::{DissectOptions, PacketHeader};

    fn run_at(verbosity: u8, msg: &[u8], len: usize) -> String {
        let opts = DissectOptions {
            verbosity,
            ..DissectOptions::default()
        };
        let arena = Arena::new();
        let mut out = Vec::new();
        let h = PacketHeader::new(0, 0, msg.len() as u32, msg.len() as u32);
        {
            let mut ndo = Context::new(&opts, &mut out, &arena, msg, h.caplen, h.len);
            icmp_print(
                &mut ndo,
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                len,
            )
            .unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    fn run(msg: &[u8], len: usize) -> String {
        run_at(0, msg, len)
    }

    #[test]
    fn echo_request_with_id_seq() {
        let msg = [8, 0, 0, 0, 0x12, 0x34, 0, 7];
        let text = run(&msg, 64);
        assert_eq!(
            text,
            "10.0.0.1 > 10.0.0.2: ICMP echo request, id 4660, seq 7, length 64"
        );
    }

    #[test]
    fn port_unreachable() {
        let msg = [3, 3, 0, 0];
        let text = run(&msg, 36);
        assert!(text.contains("port unreachable (code 3)"), "{:?}", text);
    }

    #[test]
    fn verbose_unreachable_summarizes_embedded_datagram() {
        let mut msg = vec![3, 3, 0, 0]; // port unreachable
        msg.extend_from_slice(&[0, 0, 0, 0]); // unused
        msg.extend_from_slice(&[
            0x45, 0x00, 0x00, 0x54, 0x00, 0x01, 0x00, 0x00, 0x40, 17, 0x00, 0x00, 172, 16, 0, 9,
            8, 8, 8, 8,
        ]);
        let text = run_at(1, &msg, 36);
        assert!(
            text.contains("for 172.16.0.9 > 8.8.8.8 (proto 17)"),
            "{:?}",
            text
        );
    }
}
