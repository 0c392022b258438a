use crate::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

const TRIVIAL: &[&str] = &["12345678", "87654321"];

/// Pairing code presented to accessory clients, formatted `XXX-XX-XXX`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pin([u8; 8]);

impl Default for Pin {
    fn default() -> Self {
        Pin([0, 0, 1, 0, 2, 0, 0, 3])
    }
}

impl FromStr for Pin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s.trim().chars().filter(|c| *c != '-').collect();
        if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
            bail!("pin '{}' must have eight digits (XXX-XX-XXX)", s);
        }
        let first = digits.as_bytes()[0];
        if digits.bytes().all(|b| b == first) || TRIVIAL.contains(&digits.as_str()) {
            bail!("pin '{}' is too easy to guess", s);
        }
        let mut pin = [0u8; 8];
        for (slot, b) in pin.iter_mut().zip(digits.bytes()) {
            *slot = b - b'0';
        }
        Ok(Pin(pin))
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.0;
        write!(
            f,
            "{}{}{}-{}{}-{}{}{}",
            d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl Serialize for Pin {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
