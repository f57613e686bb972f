//! Bounded cursor reads.
//!
//! Every access a printer makes to packet bytes goes through these
//! operations.  The strict `fetch_*` family verifies that the requested
//! width fits between the cursor and the snapshot end before consuming
//! anything; a shortfall raises [`Truncated`] and leaves the cursor
//! where it was.  [`has`](Context::has) is the non-advancing
//! check-and-peek flavor for printers that prefer a local recovery over
//! unwinding.
//!
//! Widths and byte orders are explicit in the operation names; there
//! are no host-order reads and no alignment requirements.  None of
//! these operations allocate or block.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::context::Context;
use super::error::{DissectResult, Truncated};

impl Context<'_> {
    /// True when `n` more bytes are readable at the cursor.  Zero-width
    /// requests are always satisfiable, including at the snapshot end.
    #[inline]
    pub fn has(&self, n: usize) -> bool {
        n <= self.snapend - self.pos
    }

    #[inline]
    fn take(&mut self, n: usize) -> DissectResult<usize> {
        if !self.has(n) {
            return Err(Truncated);
        }
        let at = self.pos;
        self.pos += n;
        Ok(at)
    }

    /// Consumes `n` bytes without interpreting them.
    pub fn skip(&mut self, n: usize) -> DissectResult<()> {
        self.take(n).map(|_| ())
    }

    /// Non-advancing look at the next byte.
    pub fn peek_u8(&self) -> Option<u8> {
        if self.has(1) {
            Some(self.data()[self.pos])
        } else {
            None
        }
    }

    pub fn fetch_u8(&mut self) -> DissectResult<u8> {
        let at = self.take(1)?;
        Ok(self.data()[at])
    }

    pub fn fetch_i8(&mut self) -> DissectResult<i8> {
        Ok(self.fetch_u8()? as i8)
    }

    // ── Big-endian ───────────────────────────────────────────────────────────

    pub fn fetch_be_u16(&mut self) -> DissectResult<u16> {
        let at = self.take(2)?;
        let d = self.data();
        Ok(u16::from_be_bytes([d[at], d[at + 1]]))
    }

    pub fn fetch_be_u24(&mut self) -> DissectResult<u32> {
        let at = self.take(3)?;
        let d = self.data();
        Ok(u32::from_be_bytes([0, d[at], d[at + 1], d[at + 2]]))
    }

    pub fn fetch_be_u32(&mut self) -> DissectResult<u32> {
        let at = self.take(4)?;
        let d = self.data();
        Ok(u32::from_be_bytes([d[at], d[at + 1], d[at + 2], d[at + 3]]))
    }

    pub fn fetch_be_u64(&mut self) -> DissectResult<u64> {
        let at = self.take(8)?;
        let d = &self.data()[at..at + 8];
        let mut b = [0u8; 8];
        b.copy_from_slice(d);
        Ok(u64::from_be_bytes(b))
    }

    pub fn fetch_be_i16(&mut self) -> DissectResult<i16> {
        Ok(self.fetch_be_u16()? as i16)
    }

    pub fn fetch_be_i32(&mut self) -> DissectResult<i32> {
        Ok(self.fetch_be_u32()? as i32)
    }

    pub fn fetch_be_i64(&mut self) -> DissectResult<i64> {
        Ok(self.fetch_be_u64()? as i64)
    }

    // ── Little-endian ────────────────────────────────────────────────────────

    pub fn fetch_le_u16(&mut self) -> DissectResult<u16> {
        let at = self.take(2)?;
        let d = self.data();
        Ok(u16::from_le_bytes([d[at], d[at + 1]]))
    }

    pub fn fetch_le_u24(&mut self) -> DissectResult<u32> {
        let at = self.take(3)?;
        let d = self.data();
        Ok(u32::from_le_bytes([d[at], d[at + 1], d[at + 2], 0]))
    }

    pub fn fetch_le_u32(&mut self) -> DissectResult<u32> {
        let at = self.take(4)?;
        let d = self.data();
        Ok(u32::from_le_bytes([d[at], d[at + 1], d[at + 2], d[at + 3]]))
    }

    pub fn fetch_le_u64(&mut self) -> DissectResult<u64> {
        let at = self.take(8)?;
        let d = &self.data()[at..at + 8];
        let mut b = [0u8; 8];
        b.copy_from_slice(d);
        Ok(u64::from_le_bytes(b))
    }

    pub fn fetch_le_i32(&mut self) -> DissectResult<i32> {
        Ok(self.fetch_le_u32()? as i32)
    }

    // ── Addresses ────────────────────────────────────────────────────────────

    /// Four bytes in network order.
    pub fn fetch_ipv4(&mut self) -> DissectResult<Ipv4Addr> {
        let at = self.take(4)?;
        let d = self.data();
        Ok(Ipv4Addr::new(d[at], d[at + 1], d[at + 2], d[at + 3]))
    }

    /// Sixteen bytes in network order.
    pub fn fetch_ipv6(&mut self) -> DissectResult<Ipv6Addr> {
        let at = self.take(16)?;
        let mut b = [0u8; 16];
        b.copy_from_slice(&self.data()[at..at + 16]);
        Ok(Ipv6Addr::from(b))
    }

    pub fn fetch_mac(&mut self) -> DissectResult<[u8; 6]> {
        let at = self.take(6)?;
        let mut b = [0u8; 6];
        b.copy_from_slice(&self.data()[at..at + 6]);
        Ok(b)
    }

    /// Bounded copy into a caller-provided destination.
    pub fn fetch_bytes(&mut self, dst: &mut [u8]) -> DissectResult<()> {
        let at = self.take(dst.len())?;
        dst.copy_from_slice(&self.data()[at..at + dst.len()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::arena::Arena;
    use crate::dissect::DissectOptions;

    macro_rules! ctx {
        ($opts:ident, $out:ident, $arena:ident, $data:expr) => {{
            let data: &[u8] = $data;
            Context::new(&$opts, &mut $out, &$arena, data, data.len() as u32, data.len() as u32)
        }};
    }

    #[test]
    fn fetch_succeeds_iff_width_fits() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        // Boundedness: for every offset k and width w over an n-byte
        // input, the read succeeds exactly when k + w <= n.
        let data = [1u8, 2, 3, 4, 5];
        for k in 0..=data.len() {
            for w in 0..=6usize {
                let mut ndo = ctx!(opts, out, arena, &data);
                ndo.skip(k).unwrap();
                let before = ndo.pos();
                let r = ndo.skip(w);
                if k + w <= data.len() {
                    assert!(r.is_ok(), "k={} w={}", k, w);
                    assert_eq!(ndo.pos(), before + w);
                } else {
                    assert_eq!(r, Err(Truncated), "k={} w={}", k, w);
                    assert_eq!(ndo.pos(), before, "failed read must not advance");
                }
            }
        }
    }

    #[test]
    fn endianness_is_explicit() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        let data = [0x12u8, 0x34, 0x56, 0x78];
        let mut ndo = ctx!(opts, out, arena, &data);
        assert_eq!(ndo.fetch_be_u16().unwrap(), 0x1234);
        ndo.set_pos(0);
        assert_eq!(ndo.fetch_le_u16().unwrap(), 0x3412);
        ndo.set_pos(0);
        assert_eq!(ndo.fetch_be_u32().unwrap(), 0x1234_5678);
        ndo.set_pos(0);
        assert_eq!(ndo.fetch_le_u32().unwrap(), 0x7856_3412);
        ndo.set_pos(0);
        assert_eq!(ndo.fetch_be_u24().unwrap(), 0x12_3456);
        ndo.set_pos(0);
        assert_eq!(ndo.fetch_le_u24().unwrap(), 0x56_3412);
    }

    #[test]
    fn sixty_four_bit_reads() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        let data = [0u8, 0, 0, 0, 0, 0, 0x12, 0x34];
        let mut ndo = ctx!(opts, out, arena, &data);
        assert_eq!(ndo.fetch_be_u64().unwrap(), 0x1234);
        ndo.set_pos(0);
        assert_eq!(ndo.fetch_le_u64().unwrap(), 0x3412_0000_0000_0000);
    }

    #[test]
    fn signed_variants_sign_extend() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        let data = [0xFFu8, 0xFE];
        let mut ndo = ctx!(opts, out, arena, &data);
        assert_eq!(ndo.fetch_be_i16().unwrap(), -2);
        ndo.set_pos(0);
        assert_eq!(ndo.fetch_i8().unwrap(), -1);
    }

    #[test]
    fn exhausted_cursor_peeks_false() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        let data = [9u8];
        let mut ndo = ctx!(opts, out, arena, &data);
        ndo.fetch_u8().unwrap();
        assert!(!ndo.has(1));
        assert!(ndo.has(0));
        assert_eq!(ndo.peek_u8(), None);
        assert_eq!(ndo.fetch_u8(), Err(Truncated));
    }

    #[test]
    fn addresses_parse_in_network_order() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        let data = [10u8, 0, 0, 1];
        let mut ndo = ctx!(opts, out, arena, &data);
        assert_eq!(ndo.fetch_ipv4().unwrap().to_string(), "10.0.0.1");

        let mut v6 = [0u8; 16];
        v6[0] = 0xfe;
        v6[1] = 0x80;
        v6[15] = 1;
        let mut ndo = ctx!(opts, out, arena, &v6);
        assert_eq!(ndo.fetch_ipv6().unwrap().to_string(), "fe80::1");
    }

    #[test]
    fn bounded_copy_fills_destination() {
        let opts = DissectOptions::default();
        let arena = Arena::new();
        let mut out = Vec::new();
        let data = [1u8, 2, 3, 4];
        let mut ndo = ctx!(opts, out, arena, &data);
        let mut dst = [0u8; 3];
        ndo.fetch_bytes(&mut dst).unwrap();
        assert_eq!(dst, [1, 2, 3]);
        let mut too_big = [0u8; 2];
        assert_eq!(ndo.fetch_bytes(&mut too_big), Err(Truncated));
    }
}
