//! End-to-end runs of the reader and simulator binaries

use std::path::Path;
use std::process::{Command, Output};

const READ: &str = env!("CARGO_BIN_EXE_simsensor-read");
const SIM: &str = env!("CARGO_BIN_EXE_simsensor-sim");

fn read(identity: &Path) -> Output {
    Command::new(READ)
        .arg(identity)
        .env_remove("SIMSENSOR_CHECK_HEADER")
        .env_remove("RUST_LOG")
        .output()
        .expect("run simsensor-read")
}

#[test]
fn reader_missing_block_exits_1() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = read(&dir.path().join("absent"));

    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty(), "no sample printed");
    assert!(!out.stderr.is_empty(), "diagnostic printed");
}

#[test]
fn reader_short_block_exits_1_with_size_diagnostic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("short");
    std::fs::write(&path, [0u8; 10]).expect("write");

    let out = read(&path);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("has size 10, expected 4096"), "{stderr}");
}

#[test]
fn reader_zeroed_block_prints_20_samples() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("zeroed");
    std::fs::write(&path, vec![0u8; 4096]).expect("write");

    let out = read(&path);
    assert_eq!(out.status.code(), Some(0));

    let stdout = String::from_utf8(out.stdout).expect("utf8");
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 20);
    for line in lines {
        assert_eq!(line, "ACCEL: +0.000 +0.000 +0.000  V=0.00");
    }
}

#[test]
fn reader_rejects_extra_arguments() {
    let out = Command::new(READ)
        .args(["/dev/uio0", "/dev/uio1"])
        .output()
        .expect("run simsensor-read");
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn simulator_tears_down_on_exit() {
    let dir = tempfile::tempdir().expect("tempdir");

    let out = Command::new(SIM)
        .arg("--dir")
        .arg(dir.path())
        .args(["--seconds", "0.1", "--rate", "200"])
        .output()
        .expect("run simsensor-sim");

    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("sim_sensor.bin"), "{stdout}");

    let left: Vec<_> = std::fs::read_dir(dir.path()).expect("read_dir").collect();
    assert!(left.is_empty(), "registry not empty: {left:?}");
}

#[test]
fn simulator_attach_feeds_existing_block() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("owned");
    let mut block = vec![0u8; 4096];
    block[0..4].copy_from_slice(&0x5355_4D31u32.to_le_bytes());
    std::fs::write(&path, &block).expect("write");

    let out = Command::new(SIM)
        .arg("--attach")
        .arg(&path)
        .args(["--seconds", "0.05", "--seed", "3"])
        .output()
        .expect("run simsensor-sim");
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("seed 3"));

    let after = std::fs::read(&path).expect("read");
    assert_eq!(&after[0..0x10], &block[0..0x10], "header untouched");
    let airspeed = f32::from_le_bytes(after[0x50..0x54].try_into().expect("slot"));
    assert!(airspeed > 12.0 && airspeed < 18.0, "{airspeed}");
}

#[test]
fn simulator_attach_missing_block_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = Command::new(SIM)
        .arg("--attach")
        .arg(dir.path().join("absent"))
        .args(["--seconds", "0"])
        .output()
        .expect("run simsensor-sim");
    assert_eq!(out.status.code(), Some(1));
}
