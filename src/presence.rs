//! Cheap detection of which USB devices are attached, by listing the Linux sysfs USB device tree.
//!
//! Only the names of the entries are read; descriptors come from [`crate::parser`]. Interface nodes such as "1-2:1.0" contain a colon and are not devices so are excluded.
//!
//! ```no_run
//! use usbwatch::presence;
//!
//! let snapshot = presence::probe();
//! for id in &snapshot {
//!     println!("{}", id);
//! }
//! ```
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory of the Linux USB device tree
pub const SYSFS_USB_DEVICES: &str = "/sys/bus/usb/devices";

/// Name of a USB device by its bus/port position in sysfs, e.g. "1-2" or "usb1"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl DeviceId {
    /// Create a [`DeviceId`] from a sysfs entry name; `None` if the name is an interface (contains ':')
    ///
    /// ```
    /// use usbwatch::presence::DeviceId;
    ///
    /// assert!(DeviceId::new("1-2").is_some());
    /// assert!(DeviceId::new("1-2:1.0").is_none());
    /// ```
    pub fn new<S: Into<String>>(name: S) -> Option<Self> {
        let name = name.into();
        if name.contains(':') {
            None
        } else {
            Some(Self(name))
        }
    }

    /// The sysfs name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Is the device a bus root hub; named "usbX" in sysfs
    ///
    /// ```
    /// use usbwatch::presence::DeviceId;
    /// assert!(DeviceId::new("usb1").unwrap().is_root_hub());
    /// assert!(!DeviceId::new("1-1.3").unwrap().is_root_hub());
    /// ```
    pub fn is_root_hub(&self) -> bool {
        self.0.starts_with("usb")
    }

    /// Extract bus number from name
    ///
    /// ```
    /// use usbwatch::presence::DeviceId;
    /// assert_eq!(DeviceId::new("2-1.4").unwrap().bus(), Some(2));
    /// assert_eq!(DeviceId::new("usb3").unwrap().bus(), Some(3));
    /// ```
    pub fn bus(&self) -> Option<u8> {
        match self.0.strip_prefix("usb") {
            Some(n) => n.parse().ok(),
            None => self.0.split('-').next().and_then(|b| b.parse().ok()),
        }
    }
}

/// Set of devices attached at the time of a probe
pub type PresenceSnapshot = HashSet<DeviceId>;

/// Build a [`PresenceSnapshot`] from directory entry names, dropping interface entries
pub fn snapshot_from_names<I, S>(names: I) -> PresenceSnapshot
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().filter_map(DeviceId::new).collect()
}

/// Source of [`PresenceSnapshot`]s polled by [`crate::watch::Coordinator`]
pub trait PresenceSource {
    /// Current set of attached devices; empty if it cannot be determined
    fn probe(&self) -> PresenceSnapshot;
}

/// Lists a sysfs style directory for attached devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prober {
    root: PathBuf,
}

impl Default for Prober {
    fn default() -> Self {
        Self::with_root(SYSFS_USB_DEVICES)
    }
}

impl Prober {
    /// [`Prober`] of [`SYSFS_USB_DEVICES`]
    pub fn new() -> Self {
        Default::default()
    }

    /// [`Prober`] of another directory with the same layout
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The directory listed
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List the directory. A missing directory is an empty snapshot, any other error is returned
    pub fn try_probe(&self) -> Result<PresenceSnapshot> {
        if !self.root.exists() {
            log::debug!("{} does not exist, no devices", self.root.display());
            return Ok(PresenceSnapshot::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }

        let snapshot = snapshot_from_names(names);
        log::trace!("Probed {} devices at {}", snapshot.len(), self.root.display());
        Ok(snapshot)
    }
}

impl PresenceSource for Prober {
    fn probe(&self) -> PresenceSnapshot {
        self.try_probe().unwrap_or_else(|e| {
            log::error!("Error getting USB devices from {}: {}", self.root.display(), e);
            PresenceSnapshot::new()
        })
    }
}

/// Probe [`SYSFS_USB_DEVICES`]; never fails, errors are logged and result in an empty set
pub fn probe() -> PresenceSnapshot {
    Prober::new().probe()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn ids(names: &[&str]) -> PresenceSnapshot {
        names.iter().map(|n| DeviceId::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_filter_interfaces() {
        let snapshot = snapshot_from_names(["1-1", "1-2", "1-2:1.0", "usb1", "2-1", "2-1:1.1"]);
        assert_eq!(snapshot, ids(&["1-1", "1-2", "usb1", "2-1"]));
    }

    #[test]
    fn test_probe_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1-1", "1-1:1.0", "usb1", "1-0:1.0", "2-3.1"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let prober = Prober::with_root(dir.path());
        assert_eq!(prober.probe(), ids(&["1-1", "usb1", "2-3.1"]));
    }

    #[test]
    fn test_probe_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Prober::with_root(dir.path()).probe().is_empty());
    }

    #[test]
    fn test_probe_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Prober::with_root(dir.path().join("not-here"));
        assert_eq!(prober.try_probe(), Ok(PresenceSnapshot::new()));
        assert!(prober.probe().is_empty());
    }

    #[test]
    fn test_probe_listing_error() {
        // a file is not a directory so listing it fails
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("devices");
        File::create(&file).unwrap();

        let prober = Prober::with_root(&file);
        assert!(prober.try_probe().is_err());
        assert!(prober.probe().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_probe_non_utf8_entry() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("1-1")).unwrap();
        fs::create_dir(dir.path().join(OsStr::from_bytes(b"1-\xff"))).unwrap();

        let snapshot = Prober::with_root(dir.path()).try_probe().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(&DeviceId::new("1-1").unwrap()));
        assert!(snapshot.contains(&DeviceId::new("1-\u{FFFD}").unwrap()));
    }

    #[test]
    fn test_probe_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["3-1", "3-2", "3-2:1.0"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let prober = Prober::with_root(dir.path());
        assert_eq!(prober.probe(), prober.probe());
    }
}
