//! Config for usbwatch binary
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::colour;
use crate::error::{Error, ErrorKind, Result};
use crate::parser::{self, Enumerator};
use crate::presence::{self, Prober};
use crate::watch;

const CONF_DIR: &str = "usbwatch";
const CONF_NAME: &str = "usbwatch.json";

/// Settings for polling and enumeration; all fields optional in the file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Seconds between presence probes
    pub interval: u64,
    /// Program printing `usb-devices` format
    pub command: String,
    /// Arguments for `command`
    pub args: Vec<String>,
    /// Seconds `command` may run before it is killed
    pub command_timeout: u64,
    /// sysfs style directory listing attached devices
    pub sysfs_path: PathBuf,
    /// Replace serials with random characters before display
    pub mask_serials: bool,
    /// User supplied [`colour::ColourTheme`] - overrides default
    pub colours: colour::ColourTheme,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interval: watch::DEFAULT_INTERVAL.as_secs(),
            command: parser::USB_DEVICES_COMMAND.into(),
            args: Vec::new(),
            command_timeout: parser::DEFAULT_COMMAND_TIMEOUT.as_secs(),
            sysfs_path: PathBuf::from(presence::SYSFS_USB_DEVICES),
            mask_serials: false,
            colours: Default::default(),
        }
    }
}

impl Config {
    /// Default new
    pub fn new() -> Config {
        Config {
            ..Default::default()
        }
    }

    /// Get example [`Config`]
    pub fn example() -> Config {
        Config {
            interval: 1,
            mask_serials: true,
            ..Default::default()
        }
    }

    /// Path of the system config file: `$XDG_CONFIG_HOME/usbwatch/usbwatch.json` or platform equivalent
    pub fn sys_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONF_DIR).join(CONF_NAME))
    }

    /// Load [`Config::sys_path`] if it exists, otherwise default
    pub fn sys_config() -> Result<Config> {
        match Self::sys_path() {
            Some(p) if p.exists() => {
                log::info!("Loading config from {}", p.display());
                Config::from_file(p)
            }
            _ => {
                log::debug!("No system config, using default");
                Ok(Config::new())
            }
        }
    }

    /// Attempt to read from .json format config at `file_path`
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Config> {
        let f = File::open(file_path.as_ref())?;
        let mut br = BufReader::new(f);
        let mut data = String::new();

        br.read_to_string(&mut data)?;
        serde_json::from_str::<Config>(&data).map_err(|e| {
            Error::new(
                ErrorKind::Config,
                &format!(
                    "Failed to parse config at {}: {}",
                    file_path.as_ref().display(),
                    e
                ),
            )
        })
    }

    /// Polling interval as a [`Duration`]; a zero interval is invalid
    pub fn interval(&self) -> Result<Duration> {
        match self.interval {
            0 => Err(Error::new(
                ErrorKind::InvalidArg,
                "Polling interval must be at least 1 second",
            )),
            i => Ok(Duration::from_secs(i)),
        }
    }

    /// [`Enumerator`] for the configured command
    pub fn enumerator(&self) -> Enumerator {
        Enumerator::new()
            .with_program(self.command.clone())
            .with_args(self.args.iter().cloned())
            .with_timeout(Duration::from_secs(self.command_timeout))
    }

    /// [`Prober`] for the configured sysfs path
    pub fn prober(&self) -> Prober {
        Prober::with_root(&self.sysfs_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"interval": 5, "mask-serials": true}"#).unwrap();
        assert_eq!(config.interval, 5);
        assert!(config.mask_serials);
        assert_eq!(config.command, "usb-devices");
        assert_eq!(config.sysfs_path, PathBuf::from("/sys/bus/usb/devices"));
    }

    #[test]
    fn test_deserialize_unknown_field() {
        assert!(serde_json::from_str::<Config>(r#"{"icons": {}}"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"command": "my-usb-devices", "args": ["-v"], "command-timeout": 3}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        let enumerator = config.enumerator();
        assert_eq!(enumerator.program(), "my-usb-devices");
        assert_eq!(enumerator.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert_eq!(
            Config::from_file(file.path()).unwrap_err().kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_from_file_missing() {
        assert_eq!(
            Config::from_file("/nonexistent/usbwatch.json")
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_zero_interval() {
        let config = Config {
            interval: 0,
            ..Default::default()
        };
        assert!(config.interval().is_err());
        assert_eq!(Config::new().interval(), Ok(Duration::from_secs(2)));
    }

    #[test]
    fn test_serialize_example() {
        let ser = serde_json::to_string_pretty(&Config::example()).unwrap();
        let de: Config = serde_json::from_str(&ser).unwrap();
        assert_eq!(de, Config::example());
    }
}
