extern crate usbwatch;

mod common;

use assert_json_diff::assert_json_include;
use serde_json::json;
use std::fs;
use usbwatch::parser::{self, DeviceRecord};

fn contents(records: &parser::RecordSet) -> Vec<DeviceRecord> {
    records.records().cloned().collect()
}

/// Tests both `usb-devices` output styles parse to the same records
#[test]
fn test_dialects_equivalent() {
    let spaced = parser::parse_records(&common::read_dump_to_string(common::USB_DEVICES_DUMP));
    let compact =
        parser::parse_records(&common::read_dump_to_string(common::USB_DEVICES_COMPACT_DUMP));

    // block with only T: and D: is dropped
    assert_eq!(spaced.len(), 4);
    assert_eq!(contents(&spaced), contents(&compact));
}

/// Tests parsing the same output twice gives the same records in the same order but new keys
#[test]
fn test_parse_idempotent() {
    let dump = common::read_dump_to_string(common::USB_DEVICES_DUMP);
    let first = parser::parse_records(&dump);
    let second = parser::parse_records(&dump);

    assert_eq!(contents(&first), contents(&second));
    assert!(first.keys().all(|k| second.get(k).is_none()));
}

#[test]
fn test_dump_fields() {
    let records = parser::parse_records(&common::read_dump_to_string(common::USB_DEVICES_DUMP));
    let keyboard = records
        .records()
        .find(|r| r.vidpid.as_deref() == Some("046D:C31C"))
        .unwrap();

    assert_eq!(
        keyboard,
        &DeviceRecord {
            speed: Some("1.5".into()),
            bus_info: Some("Bus 01".into()),
            version: Some("1.10".into()),
            vidpid: Some("046D:C31C".into()),
            manufacturer: Some("Logitech".into()),
            product: Some("USB Keyboard".into()),
            serial: None,
            max_power: Some("0.45".into()),
        }
    );
}

/// Tests the menu printed by the binary
#[test]
fn test_once_menu() {
    let te = common::TestEnv::with_dump(common::USB_DEVICES_DUMP);
    let comp = common::read_dump_to_string(common::USB_DEVICES_MENU_OUTPUT);

    te.assert_output(&["--once", "--no-colour"], comp.as_str());
}

#[test]
fn test_once_compact_menu() {
    let te = common::TestEnv::with_dump(common::USB_DEVICES_COMPACT_DUMP);
    let comp = common::read_dump_to_string(common::USB_DEVICES_MENU_OUTPUT);

    te.assert_output(&["--once", "--no-colour"], comp.as_str());
}

#[test]
fn test_json() {
    let te = common::TestEnv::with_dump(common::USB_DEVICES_DUMP);
    let output = te.assert_success_and_get_output(&["--json"]);
    let actual: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_json_include!(
        actual: actual,
        expected: json!([
            { "vidpid": "1D6B:0002", "version": "2.00", "max_power": "0.00" },
            {
                "manufacturer": "Kingston",
                "product": "DataTraveler 3.0",
                "serial": "001CC0EC34E8BB30F9A00B8C",
                "vidpid": "0951:1666",
                "version": "2.00",
                "speed": "480",
                "bus_info": "Bus 01",
                "max_power": "1.12"
            },
            { "product": "USB Keyboard" },
            { "vidpid": "1D6B:0003", "speed": "5000", "bus_info": "Bus 02" }
        ])
    );
    assert_eq!(actual.as_array().unwrap().len(), 4);
}

#[test]
fn test_json_mask_serials() {
    let te = common::TestEnv::with_dump(common::USB_DEVICES_DUMP);
    let output = te.assert_success_and_get_output(&["--json", "--mask-serials"]);
    let actual: serde_json::Value = serde_json::from_str(&output).unwrap();

    let serial = actual[1]["serial"].as_str().unwrap();
    assert_eq!(serial.len(), "001CC0EC34E8BB30F9A00B8C".len());
    assert_ne!(serial, "001CC0EC34E8BB30F9A00B8C");
}

/// Missing enumeration command is not an error, just no devices
#[test]
fn test_missing_command() {
    let te = common::TestEnv::new(r#"{"command": "usbwatch-no-such-command"}"#);

    te.assert_output(&["--json"], "[]\n");
    te.assert_output(&["--once", "--no-colour"], "└── No USB devices found\n");
}

#[test]
fn test_probe() {
    let sysfs = tempfile::tempdir().unwrap();
    for name in ["usb1", "1-0:1.0", "1-2", "1-2:1.0", "1-2.4", "2-1"] {
        fs::create_dir(sysfs.path().join(name)).unwrap();
    }
    let te = common::TestEnv::new("{}");
    let sysfs_path = sysfs.path().to_str().unwrap();

    te.assert_output(
        &["--probe", "--sysfs-path", sysfs_path],
        "1-2\n1-2.4\n2-1\nusb1\n",
    );
}

#[test]
fn test_probe_missing_path() {
    let te = common::TestEnv::new("{}");
    te.assert_output(&["--probe", "--sysfs-path", "/nonexistent/usb/devices"], "");
}

#[test]
fn test_invalid_config() {
    let te = common::TestEnv::new(r#"{"not-a-field": 1}"#);
    let output = te.run(&["--once"]);
    assert!(!output.status.success());
}
