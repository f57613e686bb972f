// e2e/cli_integration.rs — black-box tests of the `netdump` binary.
//
// Covers argument handling, exit codes, offline reading, timestamp
// modes, and the truncation decoration, using std::process::Command
// against the built binary.

mod common;

use std::process::Command;

use common::{eth_ipv4_tcp_frame, full_header, netdump_bin, write_pcap};
use netdump::PacketHeader;
use tempfile::TempDir;

fn run_netdump(args: &[&str]) -> std::process::Output {
    Command::new(netdump_bin())
        .args(args)
        .output()
        .expect("failed to run netdump")
}

// ── 1. --version / --help ─────────────────────────────────────────────────────

#[test]
fn test_cli_version() {
    let out = run_netdump(&["--version"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("netdump version 0.9.0"), "{}", stdout);
}

#[test]
fn test_cli_help() {
    let out = run_netdump(&["--help"]);
    assert!(out.status.success());
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(combined.to_lowercase().contains("usage"), "{}", combined);
}

// ── 2. Exit codes on bad input ────────────────────────────────────────────────

#[test]
fn test_cli_bad_option_exits_one() {
    let out = run_netdump(&["-k"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("netdump: bad usage"), "{}", stderr);
}

#[test]
fn test_cli_missing_savefile_exits_one() {
    let out = run_netdump(&["-r", "/nonexistent/path.pcap"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_cli_garbage_savefile_exits_one() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.pcap");
    std::fs::write(&path, [0u8; 128]).unwrap();
    let out = run_netdump(&["-r", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
}

// ── 3. Reading and printing ───────────────────────────────────────────────────

#[test]
fn test_cli_prints_one_line_per_packet() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("in.pcap");
    let frame = eth_ipv4_tcp_frame();
    write_pcap(
        &path,
        1,
        &[
            (full_header(100, &frame), frame.clone()),
            (full_header(101, &frame), frame.clone()),
        ],
    );
    let out = run_netdump(&["-t", "-r", path.to_str().unwrap()]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "{}", stdout);
    for line in lines {
        assert!(
            line.contains("IP 10.0.0.1.1234 > 10.0.0.2.80: Flags [P.]"),
            "{}",
            line
        );
    }
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("reading from file"), "{}", stderr);
}

#[test]
fn test_cli_truncated_tcp_marker() {
    // Wire frame of 74 bytes captured short: the link and IP headers
    // fit, the TCP header does not.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trunc.pcap");
    let frame = eth_ipv4_tcp_frame();
    let h = PacketHeader::new(100, 0, 44, frame.len() as u32);
    write_pcap(&path, 1, &[(h, frame[..44].to_vec())]);
    let out = run_netdump(&["-t", "-r", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let line = stdout.lines().next().unwrap_or("");
    assert!(line.ends_with("[|tcp]"), "{:?}", stdout);
}

#[test]
fn test_cli_count_limit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("many.pcap");
    let frame = eth_ipv4_tcp_frame();
    let packets: Vec<_> = (0..10u32)
        .map(|i| (full_header(i, &frame), frame.clone()))
        .collect();
    write_pcap(&path, 1, &packets);
    let out = run_netdump(&["-t", "-c", "3", "-r", path.to_str().unwrap()]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).lines().count(), 3);
}

// ── 4. Timestamp modes ────────────────────────────────────────────────────────

#[test]
fn test_cli_epoch_timestamps() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ts.pcap");
    let frame = eth_ipv4_tcp_frame();
    write_pcap(&path, 1, &[(full_header(1704164645, &frame), frame.clone())]);
    let out = run_netdump(&["-tt", "-r", path.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("1704164645.000000 "), "{}", stdout);
}

#[test]
fn test_cli_delta_from_first_starts_at_zero() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("delta.pcap");
    let frame = eth_ipv4_tcp_frame();
    write_pcap(
        &path,
        1,
        &[
            (full_header(100, &frame), frame.clone()),
            (full_header(102, &frame), frame.clone()),
        ],
    );
    let out = run_netdump(&["-ttttt", "-r", path.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("00:00:00.000000 "), "{}", stdout);
    assert!(lines[1].starts_with("00:00:02.000000 "), "{}", stdout);
}

// ── 5. Dump tiers ─────────────────────────────────────────────────────────────

#[test]
fn test_cli_hex_dump_payload_tier() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hex.pcap");
    let frame = eth_ipv4_tcp_frame();
    write_pcap(&path, 1, &[(full_header(1, &frame), frame.clone())]);
    let out = run_netdump(&["-t", "-x", "-r", path.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    // Payload tier starts at the IP header.
    assert!(stdout.contains("0x0000: 4500"), "{}", stdout);
    // Full-frame tier would start with the destination MAC instead.
    assert!(!stdout.contains("0x0000: 0200"), "{}", stdout);
}

// ── 6. Unsupported link type ──────────────────────────────────────────────────

#[test]
fn test_cli_unsupported_linktype_reports_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("odd.pcap");
    write_pcap(
        &path,
        147,
        &[
            (PacketHeader::new(0, 0, 4, 4), vec![1, 2, 3, 4]),
            (PacketHeader::new(1, 0, 4, 4), vec![5, 6, 7, 8]),
        ],
    );
    let out = run_netdump(&["-t", "-r", path.to_str().unwrap()]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(
        stderr
            .matches("packet printing is not supported for link type 147")
            .count(),
        1,
        "{}",
        stderr
    );
}
