//! Raw IP (LINKTYPE_RAW) printer: no link header, the frame starts
//! with an IP version nibble.

use crate::dissect::{Context, DissectResult, PacketHeader};
use crate::nd_print;

use super::{ip, ip6};

/// Registry entry point for LINKTYPE_RAW.
pub fn raw_if_print(
    ndo: &mut Context<'_>,
    h: &PacketHeader,
    _p: &[u8],
) -> DissectResult<usize> {
    ndo.set_protocol("raw");
    ndo.set_ll_hdr_len(0);

    match ndo.peek_u8().map(|b| b >> 4) {
        Some(4) => ip::ip_print(ndo, h.len as usize)?,
        Some(6) => ip6::ip6_print(ndo, h.len as usize)?,
        Some(v) => {
            nd_print!(ndo, "ip-version {} unknown", v);
            ndo.default_print(0);
        }
        None => {
            // Nothing readable at all; let the truncation channel say so.
            ndo.fetch_u8()?;
        }
    }
    Ok(0)
}
