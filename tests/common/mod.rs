//! Runs tests using actual binary, adapted from 'fd' method: https://github.com/sharkdp/fd/blob/master/tests/testenv/mod.rs
#![allow(dead_code)]
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

/// Output of `usb-devices` with blocks separated by blank lines
pub const USB_DEVICES_DUMP: &str = "./tests/data/usb_devices.txt";
/// Same devices as [`USB_DEVICES_DUMP`] from a `usb-devices` version without blank lines
pub const USB_DEVICES_COMPACT_DUMP: &str = "./tests/data/usb_devices_compact.txt";
/// `usbwatch --once --no-colour` of [`USB_DEVICES_DUMP`]
pub const USB_DEVICES_MENU_OUTPUT: &str = "./tests/data/usb_devices_menu.txt";

pub fn read_dump(file_name: &str) -> BufReader<File> {
    let f = File::open(file_name).expect("Unable to open dump file");
    BufReader::new(f)
}

pub fn read_dump_to_string(file_name: &str) -> String {
    let mut ret = String::new();
    let mut br = read_dump(file_name);
    br.read_to_string(&mut ret)
        .unwrap_or_else(|_| panic!("Failed to read {}", file_name));
    ret
}

/// Absolute path of a dump, for passing to a child process
pub fn dump_path(file_name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(file_name)
}

/// Environment for the integration tests.
pub struct TestEnv {
    /// Path to the *usbwatch* executable.
    usbwatch_exe: PathBuf,
    /// Holds the config file passed with `--config` so system config is not used
    config_dir: tempfile::TempDir,
}

/// Format an error message for when *usbwatch* did not exit successfully.
fn format_exit_error(args: &[&str], output: &process::Output) -> String {
    format!(
        "`usbwatch {}` did not exit successfully.\nstdout:\n---\n{}---\nstderr:\n---\n{}---",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// Format an error message for when the output of *usbwatch* did not match the expected output.
fn format_output_error(args: &[&str], expected: &str, actual: &str) -> String {
    // Generate diff text.
    let diff_text = diff::lines(expected, actual)
        .into_iter()
        .map(|diff| match diff {
            diff::Result::Left(l) => format!("-{}", l),
            diff::Result::Both(l, _) => format!(" {}", l),
            diff::Result::Right(r) => format!("+{}", r),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        concat!(
            "`usbwatch {}` did not produce the expected output.\n",
            "Showing diff between expected and actual:\n{}\n"
        ),
        args.join(" "),
        diff_text
    )
}

impl TestEnv {
    /// New env with `config_json` as the config file
    pub fn new(config_json: &str) -> TestEnv {
        let config_dir = tempfile::tempdir().expect("Unable to create config dir");
        let mut f = File::create(config_dir.path().join("usbwatch.json"))
            .expect("Unable to create config");
        f.write_all(config_json.as_bytes())
            .expect("Unable to write config");

        TestEnv {
            usbwatch_exe: PathBuf::from(env!("CARGO_BIN_EXE_usbwatch")),
            config_dir,
        }
    }

    /// Env whose enumeration command prints `dump`
    pub fn with_dump(dump: &str) -> TestEnv {
        let config = serde_json::json!({
            "command": "cat",
            "args": [dump_path(dump)],
        });
        TestEnv::new(&config.to_string())
    }

    /// Run *usbwatch* with `args`, returning the output
    pub fn run(&self, args: &[&str]) -> process::Output {
        let config = self.config_dir.path().join("usbwatch.json");
        let mut cmd = process::Command::new(&self.usbwatch_exe);
        cmd.arg("--config").arg(&config).args(args);
        cmd.output().expect("usbwatch output")
    }

    /// Assert that calling *usbwatch* with the specified arguments produces the expected output.
    pub fn assert_output(&self, args: &[&str], expected: &str) {
        let output = self.run(args);

        if !output.status.success() {
            panic!("{}", format_exit_error(args, &output));
        }

        let actual = String::from_utf8_lossy(&output.stdout);
        if expected != actual {
            panic!("{}", format_output_error(args, expected, &actual));
        }
    }

    /// Run *usbwatch* and return stdout, panic if failed
    pub fn assert_success_and_get_output(&self, args: &[&str]) -> String {
        let output = self.run(args);

        if !output.status.success() {
            panic!("{}", format_exit_error(args, &output));
        }

        String::from_utf8_lossy(&output.stdout).into_owned()
    }
}
