use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Returns the current UTC timestamp.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// A wall-clock appointment slot in `HH:MM` (24h) form.
///
/// Stored zero-padded so the derived lexicographic ordering matches
/// chronological ordering within a day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(String);

impl SlotTime {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        value.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hour(&self) -> u8 {
        // Format validated at construction
        self.0[0..2].parse().unwrap_or(0)
    }

    pub fn minute(&self) -> u8 {
        self.0[3..5].parse().unwrap_or(0)
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SlotTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let valid = bytes.len() == 5
            && bytes[2] == b':'
            && bytes[0].is_ascii_digit()
            && bytes[1].is_ascii_digit()
            && bytes[3].is_ascii_digit()
            && bytes[4].is_ascii_digit();
        if !valid {
            return Err(CoreError::invalid_slot_time(s));
        }
        let hour: u8 = s[0..2].parse().map_err(|_| CoreError::invalid_slot_time(s))?;
        let minute: u8 = s[3..5].parse().map_err(|_| CoreError::invalid_slot_time(s))?;
        if hour > 23 || minute > 59 {
            return Err(CoreError::invalid_slot_time(s));
        }
        Ok(SlotTime(s.to_string()))
    }
}

impl Serialize for SlotTime {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slot_times() {
        for s in ["00:00", "09:30", "12:00", "23:59"] {
            let slot: SlotTime = s.parse().unwrap();
            assert_eq!(slot.as_str(), s);
        }
    }

    #[test]
    fn test_invalid_slot_times() {
        for s in ["24:00", "09:60", "9:30", "0930", "09:3", "", "ab:cd", "09:30:00"] {
            assert!(s.parse::<SlotTime>().is_err(), "expected {s:?} to be rejected");
        }
    }

    #[test]
    fn test_slot_time_components() {
        let slot: SlotTime = "14:45".parse().unwrap();
        assert_eq!(slot.hour(), 14);
        assert_eq!(slot.minute(), 45);
    }

    #[test]
    fn test_ordering_is_chronological() {
        let morning: SlotTime = "09:00".parse().unwrap();
        let noon: SlotTime = "12:30".parse().unwrap();
        let evening: SlotTime = "18:15".parse().unwrap();
        assert!(morning < noon);
        assert!(noon < evening);
    }

    #[test]
    fn test_serde_round_trip() {
        let slot: SlotTime = "10:15".parse().unwrap();
        let json = serde_json::to_string(&slot).unwrap();
        assert_eq!(json, "\"10:15\"");
        let back: SlotTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slot);

        assert!(serde_json::from_str::<SlotTime>("\"25:00\"").is_err());
    }
}
