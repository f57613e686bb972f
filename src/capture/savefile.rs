//! Classic pcap savefile reading and writing.
//!
//! The on-disk layout is the ecosystem-standard one: a 24-byte file
//! header (magic, version 2.4, zone, sigfigs, snaplen, link type)
//! followed by 16-byte record headers and packet bytes.  The writer
//! emits host byte order with the microsecond magic; the reader also
//! accepts byte-swapped files and the nanosecond-resolution magic,
//! normalizing timestamps to microseconds.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use crate::config::MAXIMUM_SNAPLEN;
use crate::dissect::PacketHeader;

pub const MAGIC_MICRO: u32 = 0xa1b2_c3d4;
pub const MAGIC_NANO: u32 = 0xa1b2_3c4d;
pub const VERSION_MAJOR: u16 = 2;
pub const VERSION_MINOR: u16 = 4;

const FILE_HDR_LEN: usize = 24;
const REC_HDR_LEN: usize = 16;

fn bad_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

// ── Reader ────────────────────────────────────────────────────────────────────

pub struct SavefileReader {
    rd: BufReader<File>,
    swapped: bool,
    nanos: bool,
    snaplen: u32,
    linktype: u32,
    buf: Vec<u8>,
}

impl SavefileReader {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut rd = BufReader::new(file);
        let mut hdr = [0u8; FILE_HDR_LEN];
        rd.read_exact(&mut hdr)?;

        let raw_magic = u32::from_ne_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
        let (swapped, nanos) = match raw_magic {
            MAGIC_MICRO => (false, false),
            MAGIC_NANO => (false, true),
            m if m.swap_bytes() == MAGIC_MICRO => (true, false),
            m if m.swap_bytes() == MAGIC_NANO => (true, true),
            m => return Err(bad_data(format!("bad dump file format (magic {:#010x})", m))),
        };
        let fix16 = |b: [u8; 2]| {
            let v = u16::from_ne_bytes(b);
            if swapped {
                v.swap_bytes()
            } else {
                v
            }
        };
        let fix32 = |b: [u8; 4]| {
            let v = u32::from_ne_bytes(b);
            if swapped {
                v.swap_bytes()
            } else {
                v
            }
        };
        let vmaj = fix16([hdr[4], hdr[5]]);
        let vmin = fix16([hdr[6], hdr[7]]);
        if vmaj != VERSION_MAJOR {
            return Err(bad_data(format!(
                "unsupported dump file version {}.{}",
                vmaj, vmin
            )));
        }
        let snaplen = fix32([hdr[16], hdr[17], hdr[18], hdr[19]]);
        let linktype = fix32([hdr[20], hdr[21], hdr[22], hdr[23]]);

        Ok(SavefileReader {
            rd,
            swapped,
            nanos,
            snaplen: snaplen.min(MAXIMUM_SNAPLEN),
            linktype,
            buf: Vec::new(),
        })
    }

    pub fn linktype(&self) -> u32 {
        self.linktype
    }

    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    /// Reads the next record.  `Ok(None)` is clean end of file; a
    /// partial record or an insane length is reported as corruption.
    pub fn next_record(&mut self) -> io::Result<Option<(PacketHeader, &[u8])>> {
        let mut rec = [0u8; REC_HDR_LEN];
        match read_fully(&mut self.rd, &mut rec)? {
            0 => return Ok(None),
            n if n < REC_HDR_LEN => {
                return Err(bad_data("truncated dump file; tried to read record header".into()))
            }
            _ => {}
        }
        let fix32 = |b: [u8; 4]| {
            let v = u32::from_ne_bytes(b);
            if self.swapped {
                v.swap_bytes()
            } else {
                v
            }
        };
        let ts_sec = fix32([rec[0], rec[1], rec[2], rec[3]]);
        let mut ts_frac = fix32([rec[4], rec[5], rec[6], rec[7]]);
        let caplen = fix32([rec[8], rec[9], rec[10], rec[11]]);
        let origlen = fix32([rec[12], rec[13], rec[14], rec[15]]);
        if self.nanos {
            ts_frac /= 1000;
        }

        if caplen > MAXIMUM_SNAPLEN.max(self.snaplen) {
            return Err(bad_data(format!("bad dump file format (caplen {})", caplen)));
        }
        self.buf.resize(caplen as usize, 0);
        self.rd.read_exact(&mut self.buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                bad_data("truncated dump file; tried to read packet data".into())
            } else {
                e
            }
        })?;
        Ok(Some((
            PacketHeader::new(ts_sec, ts_frac, caplen, origlen),
            &self.buf[..],
        )))
    }
}

/// Reads until `buf` is full or end of file; returns the byte count.
fn read_fully<R: Read>(rd: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match rd.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(got)
}

// ── Writer ────────────────────────────────────────────────────────────────────

pub struct SavefileWriter {
    wr: BufWriter<File>,
    written: u64,
}

impl SavefileWriter {
    /// Creates `path` and writes the file header.
    pub fn create<P: AsRef<Path>>(path: P, linktype: u32, snaplen: u32) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut wr = BufWriter::new(file);
        wr.write_all(&MAGIC_MICRO.to_ne_bytes())?;
        wr.write_all(&VERSION_MAJOR.to_ne_bytes())?;
        wr.write_all(&VERSION_MINOR.to_ne_bytes())?;
        wr.write_all(&0i32.to_ne_bytes())?; // thiszone
        wr.write_all(&0u32.to_ne_bytes())?; // sigfigs
        wr.write_all(&snaplen.to_ne_bytes())?;
        wr.write_all(&linktype.to_ne_bytes())?;
        Ok(SavefileWriter {
            wr,
            written: FILE_HDR_LEN as u64,
        })
    }

    /// Appends one record.  `data` must hold at least `caplen` bytes.
    pub fn write_packet(&mut self, h: &PacketHeader, data: &[u8]) -> io::Result<()> {
        let caplen = (h.caplen as usize).min(data.len());
        self.wr.write_all(&h.ts_sec.to_ne_bytes())?;
        self.wr.write_all(&h.ts_usec.to_ne_bytes())?;
        self.wr.write_all(&(caplen as u32).to_ne_bytes())?;
        self.wr.write_all(&h.len.to_ne_bytes())?;
        self.wr.write_all(&data[..caplen])?;
        self.written += (REC_HDR_LEN + caplen) as u64;
        Ok(())
    }

    /// Bytes written so far, header included; drives size rotation.
    pub fn tell(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.wr.flush()
    }

    /// Flushes and closes, reporting any pending write error.
    pub fn close(mut self) -> io::Result<()> {
        self.wr.flush()?;
        let file = self.wr.into_inner().map_err(|e| e.into_error())?;
        file.sync_all().or_else(|e| {
            // Not all filesystems support fsync; a close still succeeded.
            if e.raw_os_error() == Some(libc::EINVAL) {
                Ok(())
            } else {
                Err(e)
            }
        })
    }
}

/// Convenience check used by tests and the list driver: the link type
/// recorded in a savefile without reading any packets.
pub fn peek_linktype<P: AsRef<Path>>(path: P) -> io::Result<u32> {
    let mut f = File::open(path)?;
    let mut hdr = [0u8; FILE_HDR_LEN];
    f.read_exact(&mut hdr)?;
    f.rewind()?;
    let raw_magic = u32::from_ne_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
    let swapped = match raw_magic {
        MAGIC_MICRO | MAGIC_NANO => false,
        m if m.swap_bytes() == MAGIC_MICRO || m.swap_bytes() == MAGIC_NANO => true,
        m => return Err(bad_data(format!("bad dump file format (magic {:#010x})", m))),
    };
    let v = u32::from_ne_bytes([hdr[20], hdr[21], hdr[22], hdr[23]]);
    Ok(if swapped { v.swap_bytes() } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::registry::LINKTYPE_EN10MB;

    fn tmp() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tmp();
        let path = dir.path().join("a.pcap");
        let mut w = SavefileWriter::create(&path, LINKTYPE_EN10MB, 65535).unwrap();
        let h1 = PacketHeader::new(100, 1, 4, 4);
        let h2 = PacketHeader::new(100, 2, 3, 60);
        w.write_packet(&h1, b"abcd").unwrap();
        w.write_packet(&h2, b"xyz").unwrap();
        w.close().unwrap();

        let mut r = SavefileReader::open(&path).unwrap();
        assert_eq!(r.linktype(), LINKTYPE_EN10MB);
        assert_eq!(r.snaplen(), 65535);
        let (rh1, d1) = {
            let (h, d) = r.next_record().unwrap().unwrap();
            (h, d.to_vec())
        };
        assert_eq!(rh1, h1);
        assert_eq!(d1, b"abcd");
        let (rh2, d2) = {
            let (h, d) = r.next_record().unwrap().unwrap();
            (h, d.to_vec())
        };
        assert_eq!(rh2, h2);
        assert_eq!(d2, b"xyz");
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn tell_tracks_bytes_on_disk() {
        let dir = tmp();
        let path = dir.path().join("b.pcap");
        let mut w = SavefileWriter::create(&path, LINKTYPE_EN10MB, 65535).unwrap();
        assert_eq!(w.tell(), 24);
        w.write_packet(&PacketHeader::new(0, 0, 10, 10), &[0u8; 10]).unwrap();
        assert_eq!(w.tell(), 24 + 16 + 10);
        w.close().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 24 + 16 + 10);
    }

    #[test]
    fn swapped_magic_accepted() {
        let dir = tmp();
        let path = dir.path().join("swapped.pcap");
        // Hand-build a byte-swapped file with one 2-byte record.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC_MICRO.to_ne_bytes().iter().rev().cloned().collect::<Vec<_>>());
        bytes.extend_from_slice(&VERSION_MAJOR.swap_bytes().to_ne_bytes());
        bytes.extend_from_slice(&VERSION_MINOR.swap_bytes().to_ne_bytes());
        bytes.extend_from_slice(&0u32.to_ne_bytes());
        bytes.extend_from_slice(&0u32.to_ne_bytes());
        bytes.extend_from_slice(&256u32.swap_bytes().to_ne_bytes());
        bytes.extend_from_slice(&1u32.swap_bytes().to_ne_bytes());
        for v in [7u32, 9, 2, 2] {
            bytes.extend_from_slice(&v.swap_bytes().to_ne_bytes());
        }
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        std::fs::write(&path, &bytes).unwrap();

        let mut r = SavefileReader::open(&path).unwrap();
        assert_eq!(r.linktype(), 1);
        let (h, d) = r.next_record().unwrap().unwrap();
        assert_eq!((h.ts_sec, h.ts_usec, h.caplen, h.len), (7, 9, 2, 2));
        assert_eq!(d, &[0xAA, 0xBB]);
    }

    #[test]
    fn nano_magic_scales_to_micros() {
        let dir = tmp();
        let path = dir.path().join("nano.pcap");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC_NANO.to_ne_bytes());
        bytes.extend_from_slice(&VERSION_MAJOR.to_ne_bytes());
        bytes.extend_from_slice(&VERSION_MINOR.to_ne_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend_from_slice(&65535u32.to_ne_bytes());
        bytes.extend_from_slice(&1u32.to_ne_bytes());
        for v in [1u32, 500_000_000, 1, 1] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        bytes.push(0x42);
        std::fs::write(&path, &bytes).unwrap();

        let mut r = SavefileReader::open(&path).unwrap();
        let (h, _) = r.next_record().unwrap().unwrap();
        assert_eq!(h.ts_usec, 500_000);
    }

    #[test]
    fn garbage_magic_rejected() {
        let dir = tmp();
        let path = dir.path().join("garbage.pcap");
        std::fs::write(&path, [0u8; 64]).unwrap();
        assert!(SavefileReader::open(&path).is_err());
    }

    #[test]
    fn truncated_record_reports_corruption() {
        let dir = tmp();
        let path = dir.path().join("cut.pcap");
        let mut w = SavefileWriter::create(&path, 1, 65535).unwrap();
        w.write_packet(&PacketHeader::new(0, 0, 8, 8), &[1u8; 8]).unwrap();
        w.close().unwrap();
        let full = std::fs::read(&path).unwrap();
        std::fs::write(&path, &full[..full.len() - 3]).unwrap();

        let mut r = SavefileReader::open(&path).unwrap();
        assert!(r.next_record().is_err());
    }

    #[test]
    fn peek_linktype_reads_header_only() {
        let dir = tmp();
        let path = dir.path().join("lt.pcap");
        let w = SavefileWriter::create(&path, 101, 65535).unwrap();
        w.close().unwrap();
        assert_eq!(peek_linktype(&path).unwrap(), 101);
    }
}
