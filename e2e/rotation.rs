// e2e/rotation.rs — savefile rotation through the binary: size
// trigger, file-count cap, numeric suffixes, and the post-rotate
// command.
#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::process::Command;

use common::{eth_ipv4_tcp_frame, full_header, netdump_bin, write_pcap};
use tempfile::TempDir;

/// Roughly 3.5 MB of input: 4000 frames of 74 bytes plus record
/// overhead comes to ~360 KB, so repeat the frame content to fatten
/// each record instead.
fn fat_input(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("input.pcap");
    let mut frame = eth_ipv4_tcp_frame();
    frame.resize(1000, 0); // trailing link-layer padding
    let packets: Vec<_> = (0..3500u32)
        .map(|i| (full_header(i, &frame), frame.clone()))
        .collect();
    write_pcap(&path, 1, &packets);
    path
}

#[test]
fn test_size_rotation_with_cap_and_post_rotate() {
    let dir = TempDir::new().unwrap();
    let input = fat_input(&dir);

    // Stand-in for a compressor: append the rotated filename to a log.
    let log = dir.path().join("rotated.log");
    let script = dir.path().join("fake-gzip.sh");
    std::fs::write(
        &script,
        format!("#!/bin/sh\necho \"$1\" >> {}\n", log.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let out_template = dir.path().join("trace.pcap");
    let out = Command::new(netdump_bin())
        .args([
            "-r",
            input.to_str().unwrap(),
            "-w",
            out_template.to_str().unwrap(),
            "-C",
            "1",
            "-W",
            "3",
            "-z",
            script.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run netdump");
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    // Exactly three files, lexicographically in production order, each
    // bounded by the threshold plus one packet record.
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|n| n.starts_with("trace.pcap"))
        .collect();
    names.sort();
    assert_eq!(names, vec!["trace.pcap0", "trace.pcap1", "trace.pcap2"]);
    for n in &names {
        let len = std::fs::metadata(dir.path().join(n)).unwrap().len();
        assert!(len <= 1_000_000 + 1_016, "{} is {} bytes", n, len);
    }

    // The post-rotate command ran once per closed file.  The children
    // run detached, so give them a moment.
    let mut logged = Vec::new();
    for _ in 0..50 {
        logged = std::fs::read_to_string(&log)
            .map(|s| s.lines().map(str::to_owned).collect())
            .unwrap_or_default();
        if logged.len() >= 3 {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    assert_eq!(logged.len(), 3, "{:?}", logged);
    assert!(logged[0].ends_with("trace.pcap0"), "{:?}", logged);
    assert!(logged[1].ends_with("trace.pcap1"), "{:?}", logged);
    assert!(logged[2].ends_with("trace.pcap2"), "{:?}", logged);
}

#[test]
fn test_no_rotation_single_file_unsuffixed() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("small.pcap");
    let frame = eth_ipv4_tcp_frame();
    write_pcap(&input, 1, &[(full_header(0, &frame), frame.clone())]);

    let output = dir.path().join("copy.pcap");
    let out = Command::new(netdump_bin())
        .args([
            "-r",
            input.to_str().unwrap(),
            "-w",
            output.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(output.exists());
    assert!(!dir.path().join("copy.pcap0").exists());
}

#[test]
fn test_rotation_options_require_write() {
    let out = Command::new(netdump_bin())
        .args(["-r", "whatever.pcap", "-C", "1"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("-C requires -w"), "{}", stderr);
}
