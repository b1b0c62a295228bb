//! Types used in crate non-specific to a module
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorKind};

/// Nominal USB bus voltage used to convert a current draw into power
pub const BUS_VOLTAGE: f64 = 5.0;

/// A numerical `value` converted from a String, which includes a `unit` and `description`
///
/// String is of format "\[value\]\[unit\]" with optional whitespace between, where u64 or f64 is supported
///
/// ```
/// use std::str::FromStr;
/// use usbwatch::types::NumericalUnit;
///
/// let s: &'static str = "100.0 W";
/// let nu = NumericalUnit::<f64>::from_str(s).unwrap();
/// assert_eq!(nu, NumericalUnit{ value: 100.0, unit: "W".into(), description: None });
///
/// let s: &'static str = "224mA";
/// let nu = NumericalUnit::<u64>::from_str(s).unwrap();
/// assert_eq!(nu, NumericalUnit{ value: 224, unit: "mA".into(), description: None });
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NumericalUnit<T> {
    /// Numerical value
    pub value: T,
    /// SI unit symbol
    pub unit: String,
    /// What the value represents, if known
    pub description: Option<String>,
}

impl fmt::Display for NumericalUnit<u64> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:} {:}", self.value, self.unit)
    }
}

impl fmt::Display for NumericalUnit<f64> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // If we received a precision, we use it.
        write!(
            f,
            "{1:.*} {2}",
            f.precision().unwrap_or(2),
            self.value,
            self.unit
        )
    }
}

/// Split leading number from trailing unit: "224mA", "59 mA"
fn split_value_unit(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    let idx = s.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))?;
    let (value, unit) = s.split_at(idx);
    let unit = unit.trim();
    if value.is_empty() || unit.is_empty() {
        None
    } else {
        Some((value, unit))
    }
}

impl FromStr for NumericalUnit<u64> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, unit) = split_value_unit(s).ok_or_else(|| {
            Error::new(
                ErrorKind::Parsing,
                &format!("'{}' does not contain [u64][unit]", s),
            )
        })?;

        Ok(NumericalUnit {
            value: value
                .parse::<u64>()
                .map_err(|e| Error::new(ErrorKind::Parsing, &e.to_string()))?,
            unit: unit.to_string(),
            description: None,
        })
    }
}

impl FromStr for NumericalUnit<f64> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, unit) = split_value_unit(s).ok_or_else(|| {
            Error::new(
                ErrorKind::Parsing,
                &format!("'{}' does not contain [f64][unit]", s),
            )
        })?;

        Ok(NumericalUnit {
            value: value
                .parse::<f64>()
                .map_err(|e| Error::new(ErrorKind::Parsing, &e.to_string()))?,
            unit: unit.to_string(),
            description: None,
        })
    }
}

impl NumericalUnit<u64> {
    /// Convert a current draw in mA to power in W at [`BUS_VOLTAGE`]
    ///
    /// ```
    /// use std::str::FromStr;
    /// use usbwatch::types::NumericalUnit;
    ///
    /// let current = NumericalUnit::<u64>::from_str("500mA").unwrap();
    /// assert_eq!(format!("{}", current.to_watts().unwrap()), "2.50 W");
    /// ```
    pub fn to_watts(&self) -> Option<NumericalUnit<f64>> {
        match self.unit.as_str() {
            "mA" => Some(NumericalUnit {
                value: (self.value as f64 / 1000.0) * BUS_VOLTAGE,
                unit: "W".into(),
                description: Some(format!("{} at {} V", self, BUS_VOLTAGE)),
            }),
            _ => None,
        }
    }
}
