//! Ethernet link-layer printer.

use crate::dissect::{Context, DissectResult, PacketHeader};
use crate::nd_print;

use super::{ethertype_name, ip, ip6, MacAddr};

pub const ETHER_HDR_LEN: usize = 14;

const ETHERTYPE_IP: u16 = 0x0800;
const ETHERTYPE_ARP: u16 = 0x0806;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_IPV6: u16 = 0x86dd;

/// Registry entry point for LINKTYPE_EN10MB.
pub fn ether_if_print(
    ndo: &mut Context<'_>,
    h: &PacketHeader,
    _p: &[u8],
) -> DissectResult<usize> {
    ndo.set_protocol("ether");

    let dst = ndo.fetch_mac()?;
    let src = ndo.fetch_mac()?;
    let mut ethertype = ndo.fetch_be_u16()?;
    let mut hdrlen = ETHER_HDR_LEN;
    ndo.set_ll_hdr_len(hdrlen);

    if ndo.eflag() {
        nd_print!(
            ndo,
            "{} > {}, ethertype {} (0x{:04x}), length {}: ",
            MacAddr(src),
            MacAddr(dst),
            ethertype_name(ethertype).unwrap_or("Unknown"),
            ethertype,
            h.len
        );
    }

    // A single 802.1Q tag: print the VLAN id and fall through to the
    // encapsulated ethertype.
    if ethertype == ETHERTYPE_VLAN {
        let tci = ndo.fetch_be_u16()?;
        ethertype = ndo.fetch_be_u16()?;
        hdrlen += 4;
        ndo.set_ll_hdr_len(hdrlen);
        nd_print!(
            ndo,
            "vlan {}, p {}, ethertype {} (0x{:04x}), ",
            tci & 0x0fff,
            tci >> 13,
            ethertype_name(ethertype).unwrap_or("Unknown"),
            ethertype
        );
    }

    let wirelen = (h.len as usize).saturating_sub(hdrlen);
    match ethertype {
        ETHERTYPE_IP => ip::ip_print(ndo, wirelen)?,
        ETHERTYPE_IPV6 => ip6::ip6_print(ndo, wirelen)?,
        ETHERTYPE_ARP => {
            // Summary only; the engine's dump tiers cover the body.
            nd_print!(ndo, "ARP, length {}", wirelen);
        }
        other => {
            if !ndo.eflag() {
                nd_print!(
                    ndo,
                    "ethertype {} (0x{:04x}), length {}",
                    ethertype_name(other).unwrap_or("Unknown"),
                    other,
                    wirelen
                );
            }
            let at = ndo.pos();
            ndo.default_print(at);
        }
    }

    Ok(hdrlen)
}
