//! UDP printer.

use std::net::IpAddr;

use crate::dissect::{Context, DissectResult};
use crate::nd_print;

/// Prints a UDP datagram starting at the cursor.  `len` is the payload
/// length reported by the enclosing IP header.
pub fn udp_print(
    ndo: &mut Context<'_>,
    src: IpAddr,
    dst: IpAddr,
    len: usize,
) -> DissectResult<()> {
    ndo.set_protocol("udp");

    let sport = ndo.fetch_be_u16()?;
    let dport = ndo.fetch_be_u16()?;
    let mut ulen = ndo.fetch_be_u16()? as usize;
    let _cksum = ndo.fetch_be_u16()?;

    nd_print!(ndo, "{}.{} > {}.{}: ", src, sport, dst, dport);

    // Jumbogram: the 16-bit length field cannot hold the real length
    // and is transmitted as zero; the enclosing header has the figure.
    if ulen == 0 && len > 65535 {
        ulen = len;
    }

    if ulen < 8 {
        nd_print!(ndo, "UDP, bad-len {}", ulen);
        ndo.invalid();
        return Ok(());
    }
    if ulen > len && ndo.vflag() > 0 {
        nd_print!(ndo, "[bad udp length {} > IP payload {}] ", ulen, len);
    }
    if ndo.qflag() {
        nd_print!(ndo, "udp {}", ulen - 8);
        return Ok(());
    }
    nd_print!(ndo, "UDP, length {}", ulen - 8);
    Ok(())
}
