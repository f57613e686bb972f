//! Shared helpers for the end-to-end suites: locating the built
//! binary and synthesizing small capture files.
//!
//! Each suite compiles separately, so not every helper is used by
//! every suite.
#![allow(dead_code)]

use std::path::PathBuf;

use netdump::{PacketHeader, SavefileWriter};

/// Locate the `netdump` binary produced by Cargo.
pub fn netdump_bin() -> PathBuf {
    if let Ok(p) = std::env::var("CARGO_BIN_EXE_netdump") {
        return PathBuf::from(p);
    }
    let mut p = std::env::current_exe().unwrap();
    p.pop();
    if p.ends_with("deps") {
        p.pop();
    }
    p.push("netdump");
    p
}

/// Ethernet + IPv4 + TCP frame: IP total length 60 (20 header + 20 TCP
/// header + 20 payload), 74 bytes on the wire.
pub fn eth_ipv4_tcp_frame() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0x02, 0, 0, 0, 0, 2]); // dst
    p.extend_from_slice(&[0x02, 0, 0, 0, 0, 1]); // src
    p.extend_from_slice(&[0x08, 0x00]); // IPv4
    p.extend_from_slice(&[
        0x45, 0x00, 0x00, 0x3c, // vhl, tos, total length 60
        0x00, 0x2a, 0x40, 0x00, // id 42, DF
        0x40, 0x06, 0x00, 0x00, // ttl 64, TCP, cksum
        10, 0, 0, 1, // src
        10, 0, 0, 2, // dst
    ]);
    p.extend_from_slice(&1234u16.to_be_bytes());
    p.extend_from_slice(&80u16.to_be_bytes());
    p.extend_from_slice(&1000u32.to_be_bytes());
    p.extend_from_slice(&2000u32.to_be_bytes());
    p.push(5 << 4); // data offset 20
    p.push(0x18); // PUSH|ACK
    p.extend_from_slice(&512u16.to_be_bytes());
    p.extend_from_slice(&[0, 0, 0, 0]); // cksum, urg
    p.extend_from_slice(&[0x61; 20]); // payload
    p
}

/// Writes `packets` into a classic pcap file at `path`.
pub fn write_pcap(path: &std::path::Path, linktype: u32, packets: &[(PacketHeader, Vec<u8>)]) {
    let mut w = SavefileWriter::create(path, linktype, 65535).unwrap();
    for (h, data) in packets {
        w.write_packet(h, data).unwrap();
    }
    w.close().unwrap();
}

/// Full-capture header for a frame.
pub fn full_header(ts_sec: u32, frame: &[u8]) -> PacketHeader {
    PacketHeader::new(ts_sec, 0, frame.len() as u32, frame.len() as u32)
}
