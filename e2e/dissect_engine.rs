// e2e/dissect_engine.rs — engine-level integration tests run against
// the library: dispatch recovery, the snapshot-end stack under real
// packets, and the jumbogram payload-length revision.

mod common;

use common::{eth_ipv4_tcp_frame, full_header};
use netdump::dissect::registry::LINKTYPE_EN10MB;
use netdump::dissect::TimeMode;
use netdump::{DissectOptions, Dissector, PacketHeader};

fn quiet_opts() -> DissectOptions {
    DissectOptions {
        time_mode: TimeMode::NoTime,
        ..DissectOptions::default()
    }
}

fn dissector() -> Dissector<Vec<u8>> {
    let mut d = Dissector::new(quiet_opts(), Vec::new());
    d.set_linktype(LINKTYPE_EN10MB);
    d
}

// ── Unwind safety ─────────────────────────────────────────────────────────────

#[test]
fn truncated_packet_then_clean_packet() {
    let frame = eth_ipv4_tcp_frame();
    let mut d = dissector();

    // Truncate inside the TCP header.
    let short = PacketHeader::new(0, 0, 44, frame.len() as u32);
    d.print_packet(&short, &frame[..44]);
    // The next packet must decode as if nothing happened.
    d.print_packet(&full_header(1, &frame), &frame);

    let text = String::from_utf8(d.into_writer()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "{}", text);
    assert!(lines[0].ends_with("[|tcp]"), "{}", text);
    assert!(lines[1].contains("Flags [P.], seq 1000:1020"), "{}", text);
}

#[test]
fn every_truncation_point_recovers() {
    // Cut the frame at every possible caplen; each dispatch must
    // produce exactly one newline-terminated line and never panic.
    let frame = eth_ipv4_tcp_frame();
    let mut d = dissector();
    for caplen in 0..=frame.len() {
        d.print_packet(
            &PacketHeader::new(0, 0, caplen as u32, frame.len() as u32),
            &frame[..caplen],
        );
    }
    let text = String::from_utf8(d.into_writer()).unwrap();
    assert_eq!(text.lines().count(), frame.len() + 1, "{}", text);
    assert!(text.ends_with('\n') && !text.ends_with("\n\n"), "{}", text);
}

// ── Jumbogram (Hop-by-Hop, payload length 0) ──────────────────────────────────

fn ip6_jumbo_frame(jumbo: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 6]);
    p.extend_from_slice(&[0u8; 6]);
    p.extend_from_slice(&[0x86, 0xdd]);
    // IPv6 base header, payload length 0, next header Hop-by-Hop.
    p.extend_from_slice(&0x6000_0000u32.to_be_bytes());
    p.extend_from_slice(&0u16.to_be_bytes());
    p.push(0);
    p.push(64);
    let mut src = [0u8; 16];
    src[0] = 0x20;
    src[1] = 0x01;
    src[15] = 1;
    let mut dst = src;
    dst[15] = 2;
    p.extend_from_slice(&src);
    p.extend_from_slice(&dst);
    // Hop-by-Hop: next UDP, one unit, Jumbo Payload option.
    p.push(17);
    p.push(0);
    p.extend_from_slice(&[0xc2, 4]);
    p.extend_from_slice(&jumbo.to_be_bytes());
    // UDP datagram filling the jumbo payload; per the jumbogram rules
    // its 16-bit length field is zero.
    let udp_total = jumbo as usize - 8;
    p.extend_from_slice(&9000u16.to_be_bytes());
    p.extend_from_slice(&9001u16.to_be_bytes());
    p.extend_from_slice(&0u16.to_be_bytes());
    p.extend_from_slice(&[0, 0]);
    p.extend_from_slice(&vec![0u8; udp_total - 8]);
    p
}

#[test]
fn jumbo_payload_adjusts_snapend_without_truncation() {
    let jumbo: u32 = 70_000;
    let frame = ip6_jumbo_frame(jumbo);
    assert_eq!(frame.len(), 14 + 40 + 70_000);

    let mut d = dissector();
    d.print_packet(&full_header(0, &frame), &frame);
    let text = String::from_utf8(d.into_writer()).unwrap();
    assert!(!text.contains("[|"), "unexpected truncation: {}", text);
    assert!(text.contains("2001::1.9000 > 2001::2.9001"), "{}", text);
}

// ── Suppress-default interaction with explicit dumps ──────────────────────────

#[test]
fn explicit_hex_dump_ignores_suppress_default() {
    let frame = eth_ipv4_tcp_frame();
    let opts = DissectOptions {
        time_mode: TimeMode::NoTime,
        suppress_default: true,
        hex: 2,
        ..DissectOptions::default()
    };
    let mut d = Dissector::new(opts, Vec::new());
    d.set_linktype(LINKTYPE_EN10MB);
    d.print_packet(&full_header(0, &frame), &frame);
    let text = String::from_utf8(d.into_writer()).unwrap();
    assert!(text.contains("0x0000:"), "{}", text);
}

// ── Ordering ──────────────────────────────────────────────────────────────────

#[test]
fn packets_render_in_order() {
    let frame = eth_ipv4_tcp_frame();
    let opts = DissectOptions {
        time_mode: TimeMode::Epoch,
        ..DissectOptions::default()
    };
    let mut d = Dissector::new(opts, Vec::new());
    d.set_linktype(LINKTYPE_EN10MB);
    for sec in [5u32, 6, 7] {
        d.print_packet(&full_header(sec, &frame), &frame);
    }
    let text = String::from_utf8(d.into_writer()).unwrap();
    let secs: Vec<&str> = text
        .lines()
        .map(|l| l.split('.').next().unwrap())
        .collect();
    assert_eq!(secs, vec!["5", "6", "7"]);
}
