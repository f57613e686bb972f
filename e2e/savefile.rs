// e2e/savefile.rs — write/read round-trips and list-of-files input.

mod common;

use std::process::Command;

use common::{eth_ipv4_tcp_frame, full_header, netdump_bin, write_pcap};
use tempfile::TempDir;

// ── Round trip ────────────────────────────────────────────────────────────────

#[test]
fn test_copy_is_byte_identical() {
    // No filter, single output file: reading a capture back and
    // rewriting it must reproduce it byte for byte.
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.pcap");
    let frame = eth_ipv4_tcp_frame();
    let packets: Vec<_> = (0..5u32)
        .map(|i| (full_header(i, &frame), frame.clone()))
        .collect();
    write_pcap(&input, 1, &packets);

    let copy = dir.path().join("out.pcap");
    let out = Command::new(netdump_bin())
        .args([
            "-r",
            input.to_str().unwrap(),
            "-w",
            copy.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(
        std::fs::read(&input).unwrap(),
        std::fs::read(&copy).unwrap()
    );
}

#[test]
fn test_copy_of_copy_is_stable() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("gen0.pcap");
    let frame = eth_ipv4_tcp_frame();
    write_pcap(&input, 1, &[(full_header(7, &frame), frame.clone())]);

    let gen1 = dir.path().join("gen1.pcap");
    let gen2 = dir.path().join("gen2.pcap");
    for (src, dst) in [(&input, &gen1), (&gen1, &gen2)] {
        let out = Command::new(netdump_bin())
            .args(["-r", src.to_str().unwrap(), "-w", dst.to_str().unwrap()])
            .output()
            .unwrap();
        assert!(out.status.success());
    }
    assert_eq!(std::fs::read(&gen1).unwrap(), std::fs::read(&gen2).unwrap());
}

// ── List-of-files input ───────────────────────────────────────────────────────

#[test]
fn test_file_list_reads_in_order() {
    let dir = TempDir::new().unwrap();
    let frame = eth_ipv4_tcp_frame();
    let one = dir.path().join("one.pcap");
    let two = dir.path().join("two.pcap");
    write_pcap(&one, 1, &[(full_header(11, &frame), frame.clone())]);
    write_pcap(
        &two,
        1,
        &[
            (full_header(22, &frame), frame.clone()),
            (full_header(23, &frame), frame.clone()),
        ],
    );
    let list = dir.path().join("list.txt");
    std::fs::write(
        &list,
        format!("{}\n{}\n", one.display(), two.display()),
    )
    .unwrap();

    let out = Command::new(netdump_bin())
        .args(["-tt", "-V", list.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let secs: Vec<&str> = stdout
        .lines()
        .map(|l| l.split('.').next().unwrap())
        .collect();
    assert_eq!(secs, vec!["11", "22", "23"], "{}", stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let one_pos = stderr.find("one.pcap").unwrap();
    let two_pos = stderr.find("two.pcap").unwrap();
    assert!(one_pos < two_pos, "{}", stderr);
}

#[test]
fn test_file_list_linktype_mismatch_fails_when_writing() {
    let dir = TempDir::new().unwrap();
    let frame = eth_ipv4_tcp_frame();
    let ether = dir.path().join("ether.pcap");
    let raw = dir.path().join("raw.pcap");
    write_pcap(&ether, 1, &[(full_header(0, &frame), frame.clone())]);
    write_pcap(&raw, 101, &[(full_header(0, &frame[14..].to_vec()), frame[14..].to_vec())]);
    let list = dir.path().join("list.txt");
    std::fs::write(&list, format!("{}\n{}\n", ether.display(), raw.display())).unwrap();

    let copy = dir.path().join("merged.pcap");
    let out = Command::new(netdump_bin())
        .args([
            "-V",
            list.to_str().unwrap(),
            "-w",
            copy.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("does not match the original"),
        "{}",
        stderr
    );

    // Without writing, mixed link types are fine.
    let out = Command::new(netdump_bin())
        .args(["-t", "-V", list.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(out.status.success());
}
