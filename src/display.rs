//! Builds the device menu from a [`RecordSet`] and prints it
//!
//! The menu is rebuilt from scratch on each refresh: one [`MenuItem`] per record with a label and the details that are present, in [`DetailBlock::default_blocks`] order.
use colored::*;
use std::io::{self, Write};

use crate::colour::{self, ColourTheme};
use crate::parser::{DeviceRecord, RecordKey, RecordSet};

// utf-8 boxes for drawing tree
const EDGE: &str = "\u{251c}\u{2500}\u{2500}"; // "├──"
const LINE: &str = "\u{2502}  "; // "│  "
const CORNER: &str = "\u{2514}\u{2500}\u{2500}"; // "└──"
const BLANK: &str = "   "; // should be same char width as above

/// Placeholder some tools print for a missing string descriptor
pub const NOT_APPLICABLE: &str = "N/A";
/// Label of a device without a product string
pub const UNKNOWN_DEVICE: &str = "Unknown Device";
/// Only entry when there are no records
pub const NO_DEVICES: &str = "No USB devices found";
const ZERO_POWER: &str = "0.00";

/// Detail lines shown under a device, in the order of [`DetailBlock::default_blocks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailBlock {
    /// Manufacturer string
    Manufacturer,
    /// Vendor ID:Product ID
    VidPid,
    /// Serial number string
    Serial,
    /// USB version from the device descriptor
    Version,
    /// Speed in Mbps
    Speed,
    /// Maximum power of the active configuration in W
    Power,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty() && *v != NOT_APPLICABLE)
}

impl DetailBlock {
    /// All blocks in display order
    pub fn default_blocks() -> Vec<DetailBlock> {
        vec![
            DetailBlock::Manufacturer,
            DetailBlock::VidPid,
            DetailBlock::Serial,
            DetailBlock::Version,
            DetailBlock::Speed,
            DetailBlock::Power,
        ]
    }

    /// Detail line for `d`; `None` if the field is missing, empty or [`NOT_APPLICABLE`]. Power is also omitted when zero and vidpid is shown unless empty
    pub fn format_value(&self, d: &DeviceRecord) -> Option<String> {
        match self {
            DetailBlock::Manufacturer => present(&d.manufacturer).map(|v| format!("Manufacturer: {}", v)),
            DetailBlock::VidPid => non_empty(&d.vidpid).map(|v| format!("VID:PID: {}", v)),
            DetailBlock::Serial => present(&d.serial).map(|v| format!("Serial: {}", v)),
            DetailBlock::Version => present(&d.version).map(|v| format!("USB Version: {}", v)),
            DetailBlock::Speed => present(&d.speed).map(|v| format!("Speed: {} Mbps", v)),
            DetailBlock::Power => present(&d.max_power)
                .filter(|v| *v != ZERO_POWER)
                .map(|v| format!("Power: {} W", v)),
        }
    }

    /// Colour `s` for this block with `ct`
    pub fn colour(&self, s: &str, ct: &ColourTheme) -> ColoredString {
        match self {
            DetailBlock::Manufacturer => colour::apply(s, ct.manufacturer),
            DetailBlock::VidPid => colour::apply(s, ct.vidpid),
            DetailBlock::Serial => colour::apply(s, ct.serial),
            DetailBlock::Speed => colour::apply(s, ct.speed),
            DetailBlock::Power => colour::apply(s, ct.power),
            DetailBlock::Version => colour::apply(s, ct.detail),
        }
    }
}

/// One device entry: label and detail lines. Details are informational so only the device entry is `enabled`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Record the entry was built from; `None` for [`NO_DEVICES`]
    pub key: Option<RecordKey>,
    /// Product (or [`UNKNOWN_DEVICE`]) and vidpid
    pub label: String,
    /// Detail lines in display order
    pub details: Vec<(DetailBlock, String)>,
    /// Selectable entry; `false` only for [`NO_DEVICES`]
    pub enabled: bool,
}

impl MenuItem {
    fn from_record(key: &RecordKey, d: &DeviceRecord) -> Self {
        let product = d.product.as_deref().unwrap_or(UNKNOWN_DEVICE);
        let label = match non_empty(&d.vidpid) {
            Some(vidpid) => format!("{} ({})", product, vidpid),
            None => product.to_string(),
        };

        MenuItem {
            key: Some(*key),
            label,
            details: DetailBlock::default_blocks()
                .into_iter()
                .filter_map(|b| b.format_value(d).map(|s| (b, s)))
                .collect(),
            enabled: true,
        }
    }

    fn no_devices() -> Self {
        MenuItem {
            key: None,
            label: NO_DEVICES.into(),
            details: Vec::new(),
            enabled: false,
        }
    }

    /// Product label or placeholder
    pub fn is_unknown(&self) -> bool {
        self.label.starts_with(UNKNOWN_DEVICE)
    }
}

/// Build the menu for `records` in enumeration order; a single disabled [`NO_DEVICES`] entry if empty
pub fn menu_items(records: &RecordSet) -> Vec<MenuItem> {
    if records.is_empty() {
        return vec![MenuItem::no_devices()];
    }

    records
        .iter()
        .map(|(k, d)| MenuItem::from_record(k, d))
        .collect()
}

/// Replace each serial with random alphanumerics of the same length
pub fn mask_serials(records: &mut RecordSet) {
    for d in records.records_mut() {
        if let Some(serial) = d.serial.as_mut() {
            if serial.as_str() != NOT_APPLICABLE {
                *serial = serial.chars().map(|_| fastrand::alphanumeric()).collect();
            }
        }
    }
}

/// Settings for [`print_menu`]
#[derive(Debug, Default)]
pub struct PrintSettings {
    /// Colour theme; no colour if `None`
    pub colours: Option<ColourTheme>,
    /// Only print labels
    pub hide_details: bool,
    /// Terminal is in raw mode so lines need a carriage return
    pub raw_mode: bool,
}

/// Print `items` as a tree to `writer`
pub fn print_menu<W: Write>(
    writer: &mut W,
    items: &[MenuItem],
    settings: &PrintSettings,
) -> io::Result<()> {
    let plain = ColourTheme::plain();
    let ct = settings.colours.as_ref().unwrap_or(&plain);
    let eol = if settings.raw_mode { "\r\n" } else { "\n" };

    for (i, item) in items.iter().enumerate() {
        let last = i + 1 == items.len();
        let (branch, trunk) = if last { (CORNER, BLANK) } else { (EDGE, LINE) };

        let label = if !item.enabled || item.is_unknown() {
            colour::apply(&item.label, ct.unknown)
        } else {
            colour::apply(&item.label, ct.product)
        };
        write!(writer, "{} {}{}", colour::apply(branch, ct.tree), label, eol)?;

        if settings.hide_details {
            continue;
        }
        for (j, (block, detail)) in item.details.iter().enumerate() {
            let sub = if j + 1 == item.details.len() { CORNER } else { EDGE };
            write!(
                writer,
                "{}{} {}{}",
                colour::apply(trunk, ct.tree),
                colour::apply(sub, ct.tree),
                block.colour(detail, ct),
                eol
            )?;
        }
    }

    Ok(())
}
