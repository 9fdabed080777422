//! Device commands against a fake SHDLC device on TCP.

mod common;

use common::{FakeDevice, TestFixture, respond, standard_response};
use predicates::prelude::*;

#[test]
fn version_prints_all_versions() {
    let fix = TestFixture::new();
    let device = FakeDevice::standard();

    fix.shdlc_on(&device)
        .arg("version")
        .assert()
        .success()
        .stdout("Firmware 5.8, Hardware 3.0, Protocol 1.0\n");

    let requests = device.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].command_id, 0xD1);
    assert_eq!(requests[0].address, 0);
}

#[test]
fn version_as_json() {
    let fix = TestFixture::new();
    let device = FakeDevice::standard();

    let output = fix
        .shdlc_on(&device)
        .args(["--json", "version"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["firmware"]["major"], 5);
    assert_eq!(value["firmware"]["minor"], 8);
    assert_eq!(value["firmware"]["debug"], false);
    assert_eq!(value["protocol"]["major"], 1);
}

#[test]
fn info_reads_identification() {
    let fix = TestFixture::new();
    let device = FakeDevice::standard();

    fix.shdlc_on(&device)
        .arg("info")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Product type:    00080000")
                .and(predicate::str::contains("Product subtype: 1"))
                .and(predicate::str::contains("Product name:    SFM3019"))
                .and(predicate::str::contains("Article code:    1-101-001"))
                .and(predicate::str::contains("Serial number:   2A3F0007")),
        );
}

#[test]
fn info_without_subtype_support() {
    let fix = TestFixture::new();
    let device = FakeDevice::spawn(|req| {
        if req.command_id == 0xD0 && req.data == [0x04] {
            respond(req, 0x02, &[])
        } else {
            standard_response(req)
        }
    });

    let output = fix
        .shdlc_on(&device)
        .args(["--json", "info"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["product_subtype"].is_null());
    assert_eq!(value["product_name"], "SFM3019");
}

#[test]
fn address_option_selects_slave() {
    let fix = TestFixture::new();
    let device = FakeDevice::standard();

    fix.shdlc_on(&device)
        .args(["--address", "0x2A", "address"])
        .assert()
        .success()
        .stdout("42\n");

    assert!(device.requests().iter().all(|r| r.address == 42));
}

#[test]
fn setters_send_big_endian_values() {
    let fix = TestFixture::new();
    let device = FakeDevice::standard();

    fix.shdlc_on(&device)
        .args(["baudrate", "--set", "460800"])
        .assert()
        .success();
    fix.shdlc_on(&device)
        .args(["reply-delay", "--set", "0x100"])
        .assert()
        .success();

    let requests = device.requests();
    assert_eq!(requests[0].command_id, 0x91);
    assert_eq!(requests[0].data, 460800u32.to_be_bytes());
    assert_eq!(requests[1].command_id, 0x95);
    assert_eq!(requests[1].data, vec![0x01, 0x00]);
}

#[test]
fn getters_print_values() {
    let fix = TestFixture::new();
    let device = FakeDevice::standard();

    fix.shdlc_on(&device)
        .arg("uptime")
        .assert()
        .success()
        .stdout("3600 s\n");
    fix.shdlc_on(&device)
        .arg("baudrate")
        .assert()
        .success()
        .stdout("115200\n");
    fix.shdlc_on(&device)
        .arg("reply-delay")
        .assert()
        .success()
        .stdout("100 us\n");
}

#[test]
fn error_state_clears_unless_kept() {
    let fix = TestFixture::new();
    let device = FakeDevice::spawn(|req| match req.command_id {
        0xD2 => respond(req, 0x80, &[0x00, 0x00, 0x00, 0x04, 0x05]),
        _ => standard_response(req),
    });

    fix.shdlc_on(&device)
        .arg("error-state")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("State:      0x00000004")
                .and(predicate::str::contains("0x05 (Checksum of the received MOSI frame is wrong.)")),
        );
    fix.shdlc_on(&device)
        .args(["error-state", "--keep"])
        .assert()
        .success();

    let requests = device.requests();
    assert_eq!(requests[0].data, vec![0x01]);
    assert_eq!(requests[1].data, vec![0x00]);
}

#[test]
fn raw_command_prints_payload() {
    let fix = TestFixture::new();
    let device = FakeDevice::spawn(|req| respond(req, 0x00, &[0xCA, 0xFE]));

    fix.shdlc_on(&device)
        .args(["raw", "0x42", "01 02"])
        .assert()
        .success()
        .stdout("0xCA, 0xFE\n");

    let requests = device.requests();
    assert_eq!(requests[0].command_id, 0x42);
    assert_eq!(requests[0].data, vec![0x01, 0x02]);
}

#[test]
fn device_error_fails_with_message() {
    let fix = TestFixture::new();
    let device = FakeDevice::spawn(|req| respond(req, 0x03, &[]));

    fix.shdlc_on(&device)
        .arg("version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No access right for this command."));
}

#[test]
fn foreign_response_address_is_rejected() {
    let fix = TestFixture::new();
    let device = FakeDevice::spawn(|req| {
        let mut response = standard_response(req);
        response.address = req.address.wrapping_add(1);
        response
    });

    fix.shdlc_on(&device)
        .arg("version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Received slave address 1 instead of 0."));
}

#[test]
fn missing_port_is_an_error() {
    let fix = TestFixture::new();

    fix.shdlc()
        .arg("version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--serial or --tcp"));
}

#[test]
fn tcp_address_from_environment() {
    let fix = TestFixture::new();
    let device = FakeDevice::standard();

    fix.shdlc()
        .env("SHDLC_TCP", device.address())
        .arg("uptime")
        .assert()
        .success()
        .stdout("3600 s\n");
}

#[test]
fn unreachable_device_fails() {
    let fix = TestFixture::new();

    fix.shdlc()
        .args(["--tcp", "127.0.0.1:1", "version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
