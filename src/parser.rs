//! Parser for the `usb-devices` command output
//!
//! `usb-devices` prints one block per device with lines prefixed by a tag:
//!
//! ```text
//! T:  Bus=01 Lev=01 Prnt=01 Port=00 Cnt=01 Dev#=  2 Spd=480  MxCh= 0
//! D:  Ver= 2.00 Cls=00(>ifc ) Sub=00 Prot=00 MxPS=64 #Cfgs=  1
//! P:  Vendor=0951 ProdID=1666 Rev= 1.00
//! S:  Manufacturer=Kingston
//! S:  Product=DataTraveler 3.0
//! S:  SerialNumber=001CC0EC34E8BB30F9A00B8C
//! C:* #Ifs= 1 Cfg#= 1 Atr=80 MxPwr=224mA
//! I:* If#= 0 Alt= 0 #EPs= 2 Cls=08(stor.) Sub=06 Prot=50 Driver=usb-storage
//! ```
//!
//! Depending on the usbutils version blocks are separated by a blank line or just start with the next `T:` line; both are handled by [`split_blocks`].
//!
//! ```
//! use usbwatch::parser;
//!
//! let text = "T:  Bus=01 Spd=480\nP:  Vendor=0951 ProdID=1666 Rev= 1.00\nS:  Product=DataTraveler 3.0\n";
//! let records = parser::parse_records(text);
//! assert_eq!(records.len(), 1);
//! let record = records.records().next().unwrap();
//! assert_eq!(record.vidpid.as_deref(), Some("0951:1666"));
//! ```
use regex::Regex;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::{Error, ErrorKind, Result};
use crate::types::NumericalUnit;

/// Default enumeration command
pub const USB_DEVICES_COMMAND: &str = "usb-devices";
/// Default time the enumeration command may run before being killed
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

lazy_static! {
    static ref SPEED: Regex = Regex::new(r"Spd=\s*(\S+)").unwrap();
    static ref BUS: Regex = Regex::new(r"Bus=(\d+)").unwrap();
    static ref VERSION: Regex = Regex::new(r"Ver=\s*(\d+\.\d+)").unwrap();
    static ref VIDPID: Regex = Regex::new(r"Vendor=(\S+)\s+ProdID=(\S+)").unwrap();
    static ref MAX_POWER: Regex = Regex::new(r"MxPwr=\s*(\d+mA)").unwrap();
}

/// Descriptive data for one USB device from a `usb-devices` block. All fields are raw text as printed
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRecord {
    /// Negotiated speed token from `Spd=`, normally Mb/s but not always numeric
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// "Bus NN"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_info: Option<String>,
    /// USB version "M.mm" from device descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// "VVVV:PPPP" upper case hex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vidpid: Option<String>,
    /// Manufacturer string descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Product string descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Serial number string descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// Maximum power in W, two decimal places, from configuration `MxPwr` at 5 V
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_power: Option<String>,
}

fn is_set(field: &Option<String>) -> bool {
    field.as_ref().is_some_and(|s| !s.is_empty())
}

impl DeviceRecord {
    /// Has at least one identifying field: vidpid, product or manufacturer. Root hubs without strings for example are not valid
    pub fn is_valid(&self) -> bool {
        is_set(&self.vidpid) || is_set(&self.product) || is_set(&self.manufacturer)
    }

    fn parse_topology(&mut self, line: &str) {
        if let Some(c) = SPEED.captures(line) {
            self.speed = Some(c[1].to_string());
        }
        if let Some(c) = BUS.captures(line) {
            self.bus_info = Some(format!("Bus {}", &c[1]));
        }
    }

    fn parse_descriptor(&mut self, line: &str) {
        if let Some(c) = VERSION.captures(line) {
            self.version = Some(c[1].to_string());
        }
    }

    fn parse_product(&mut self, line: &str) {
        if let Some(c) = VIDPID.captures(line) {
            self.vidpid = Some(format!(
                "{}:{}",
                c[1].to_uppercase(),
                c[2].to_uppercase()
            ));
        }
    }

    fn parse_string(&mut self, line: &str) {
        // checked in this order, first marker found wins
        if let Some((_, v)) = line.split_once("Manufacturer=") {
            self.manufacturer = Some(v.trim().to_string());
        } else if let Some((_, v)) = line.split_once("Product=") {
            self.product = Some(v.trim().to_string());
        } else if let Some((_, v)) = line.split_once("SerialNumber=") {
            self.serial = Some(v.trim().to_string());
        }
    }

    fn parse_configuration(&mut self, line: &str) {
        let Some(c) = MAX_POWER.captures(line) else {
            return;
        };
        match NumericalUnit::<u64>::from_str(&c[1]).map(|current| current.to_watts()) {
            Ok(Some(watts)) => self.max_power = Some(format!("{:.2}", watts.value)),
            Ok(None) => (),
            Err(e) => log::trace!("Skipping MxPwr '{}': {}", &c[1], e),
        }
    }
}

/// Parse the lines of one device block into a [`DeviceRecord`]
///
/// Lines are dispatched on their prefix; a later line setting the same field overwrites an earlier one. Returns `None` if the record is not [`DeviceRecord::is_valid`]
pub fn parse_block<'a, I>(lines: I) -> Option<DeviceRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut record = DeviceRecord::default();

    for line in lines {
        match line.get(..2) {
            Some("T:") => record.parse_topology(line),
            Some("D:") => record.parse_descriptor(line),
            Some("P:") => record.parse_product(line),
            Some("S:") => record.parse_string(line),
            Some("C:") => record.parse_configuration(line),
            _ => (),
        }
    }

    if record.is_valid() {
        Some(record)
    } else {
        log::trace!("Discarding block without identifying fields: {:?}", record);
        None
    }
}

/// Split `usb-devices` output into device blocks
///
/// Blank line separated blocks are used if there is more than one, otherwise a block is started at each `T:` line
pub fn split_blocks(output: &str) -> Vec<Vec<&str>> {
    let output = output.trim();
    let blocks: Vec<&str> = output.split("\n\n").collect();

    if blocks.len() > 1 {
        return blocks
            .iter()
            .map(|b| b.trim().split('\n').collect())
            .collect();
    }

    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in output.split('\n') {
        if line.starts_with("T:") && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Parse `usb-devices` output into a [`RecordSet`], each valid device under a new random key
pub fn parse_records(output: &str) -> RecordSet {
    let mut records = RecordSet::new();

    for block in split_blocks(output) {
        if let Some(record) = parse_block(block) {
            records.insert(record);
        }
    }

    log::debug!("Parsed {} device records", records.len());
    records
}

/// Key of a [`DeviceRecord`] within a [`RecordSet`]; random, only unique within the set
pub type RecordKey = Uuid;

/// [`DeviceRecord`]s in enumeration order, keyed by a [`RecordKey`]
///
/// Rebuilt on every parse: keys do not identify a device across parses
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordSet {
    entries: Vec<(RecordKey, DeviceRecord)>,
}

impl RecordSet {
    /// Empty set
    pub fn new() -> Self {
        Default::default()
    }

    /// Add `record` under a new key, returning the key
    pub fn insert(&mut self, record: DeviceRecord) -> RecordKey {
        let key = Uuid::new_v4();
        self.entries.push((key, record));
        key
    }

    /// Record for `key`
    pub fn get(&self, key: &RecordKey) -> Option<&DeviceRecord> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key and record pairs in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &DeviceRecord)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }

    /// Keys in enumeration order
    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Records in enumeration order
    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.entries.iter().map(|(_, r)| r)
    }

    /// Mutable records, used to mask serials before display
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut DeviceRecord> {
        self.entries.iter_mut().map(|(_, r)| r)
    }
}

#[derive(Serialize)]
struct KeyedRecord<'a> {
    key: &'a RecordKey,
    #[serde(flatten)]
    record: &'a DeviceRecord,
}

impl Serialize for RecordSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for (key, record) in &self.entries {
            seq.serialize_element(&KeyedRecord { key, record })?;
        }
        seq.end()
    }
}

/// Runs the enumeration command and parses its output
///
/// ```no_run
/// use std::time::Duration;
/// use usbwatch::parser::Enumerator;
///
/// let records = Enumerator::new()
///     .with_timeout(Duration::from_secs(2))
///     .parse_all();
/// println!("{}", records.len());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for Enumerator {
    fn default() -> Self {
        Self {
            program: USB_DEVICES_COMMAND.into(),
            args: Vec::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl Enumerator {
    /// `usb-devices` with no arguments and [`DEFAULT_COMMAND_TIMEOUT`]
    pub fn new() -> Self {
        Default::default()
    }

    /// Use `program` rather than `usb-devices`
    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    /// Pass `args` to the program
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    /// Kill the program if it has not exited after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program run to enumerate devices
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Time the program may run before it is killed
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the program and return its stdout
    ///
    /// Errors if the program cannot be started ([`ErrorKind::NotFound`] if missing), exits with failure ([`ErrorKind::Enumeration`]) or runs longer than the timeout ([`ErrorKind::Timeout`])
    pub fn read_output(&self) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        // own group so anything the program forks can be killed with it
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            let mut err: Error = e.into();
            err.message = format!("Failed to run '{}': {}", self.program, err.message);
            err
        })?;

        // read on another thread so a full pipe cannot block the wait below
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::new(ErrorKind::Io, "Child stdout not captured"))?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = tx.send(stdout.read_to_end(&mut buf).map(|_| buf));
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                kill_process_group(&mut child);
                return Err(self.timeout_error());
            }
            thread::sleep(Duration::from_millis(10));
        };

        // a process forked by the program can hold stdout open after it exits
        let buf = match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(read) => read?,
            Err(RecvTimeoutError::Timeout) => {
                kill_process_group(&mut child);
                return Err(self.timeout_error());
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::new(
                    ErrorKind::Other("thread"),
                    "stdout reader panicked",
                ))
            }
        };

        if !status.success() {
            return Err(Error::new(
                ErrorKind::Enumeration,
                &format!("'{}' failed: {}", self.program, status),
            ));
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn timeout_error(&self) -> Error {
        Error::new(
            ErrorKind::Timeout,
            &format!(
                "'{}' did not exit within {:?}",
                self.program, self.timeout
            ),
        )
    }

    /// Run the program and parse the output. Never fails: errors are logged and result in an empty [`RecordSet`]
    pub fn parse_all(&self) -> RecordSet {
        match self.read_output() {
            Ok(output) => parse_records(&output),
            Err(e) => {
                log::error!("Failed to enumerate USB devices: {:#}", e);
                RecordSet::new()
            }
        }
    }
}

/// Kill `child` and every process in its group, then reap `child`
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    // group id is the child pid after `process_group(0)`
    match libc::pid_t::try_from(child.id()) {
        Ok(pgid) => {
            if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
                log::debug!(
                    "Failed to kill process group {}: {}",
                    pgid,
                    std::io::Error::last_os_error()
                );
                let _ = child.kill();
            }
        }
        Err(_) => {
            let _ = child.kill();
        }
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Run `usb-devices` and parse the output; empty if it cannot be run
pub fn parse_all() -> RecordSet {
    Enumerator::new().parse_all()
}
