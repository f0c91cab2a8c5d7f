use std::{fmt::Display, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const NANO_CURRENCY_CODE: &str = "Ӿ";
/// One Nano is 10^30 raw.
pub const RAW_PER_NANO: u128 = 1_000_000_000_000_000_000_000_000_000_000;

//--------------------------------------     RawNano       -----------------------------------------------------------

/// An amount of Nano in raw units, the smallest denomination on the ledger.
///
/// The confirmation feed and the database both carry amounts as decimal strings, since raw values
/// overflow every sqlite integer type. `RawNano` is the parsed, checked form used inside the
/// process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawNano(u128);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in raw Nano: {0}")]
pub struct RawNanoConversionError(pub String);

impl RawNano {
    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn checked_add(self, rhs: RawNano) -> Option<RawNano> {
        self.0.checked_add(rhs.0).map(RawNano)
    }

    /// Lossy conversion to whole Nano, for display only.
    pub fn as_nano(&self) -> f64 {
        self.0 as f64 / RAW_PER_NANO as f64
    }
}

impl From<u128> for RawNano {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl FromStr for RawNano {
    type Err = RawNanoConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RawNanoConversionError("empty string".to_string()));
        }
        trimmed.parse::<u128>().map(RawNano).map_err(|e| RawNanoConversionError(format!("{trimmed}: {e}")))
    }
}

impl Display for RawNano {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0.3}{NANO_CURRENCY_CODE}", self.as_nano())
    }
}

impl Serialize for RawNano {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for RawNano {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_raw_strings() {
        let amount = "100000000000000000000000000000".parse::<RawNano>().unwrap();
        assert_eq!(amount.value(), RAW_PER_NANO / 10);
        assert_eq!(amount, RawNano::from(RAW_PER_NANO / 10));
    }

    #[test]
    fn rejects_invalid_strings() {
        assert!("".parse::<RawNano>().is_err());
        assert!("  ".parse::<RawNano>().is_err());
        assert!("-5".parse::<RawNano>().is_err());
        assert!("1.5".parse::<RawNano>().is_err());
        assert!("lots".parse::<RawNano>().is_err());
    }

    #[test]
    fn displays_in_nano() {
        let amount = RawNano::from(RAW_PER_NANO / 10);
        assert_eq!(amount.to_string(), "0.100Ӿ");
        assert_eq!(RawNano::default().to_string(), "0.000Ӿ");
    }

    #[test]
    fn checked_add_sums_and_guards() {
        let a = RawNano::from(RAW_PER_NANO);
        let b = RawNano::from(RAW_PER_NANO / 2);
        assert_eq!(a.checked_add(b), Some(RawNano::from(3 * RAW_PER_NANO / 2)));
        assert_eq!(RawNano::from(u128::MAX).checked_add(RawNano::from(1)), None);
    }

    #[test]
    fn serde_round_trips_as_string() {
        let amount = RawNano::from(42u128);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"42\"");
        let back: RawNano = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }
}
