//! MAC Address Value Object
//!
//! Network device descriptor recorded in the compliance log. Access
//! controllers report it in several spellings; it is stored as lowercase,
//! colon-separated hex.

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Accepts `AA:BB:CC:DD:EE:FF`, `aa-bb-cc-dd-ee-ff`, `aabb.ccdd.eeff`
    /// and `aabbccddeeff`
    pub fn new(raw: impl AsRef<str>) -> AppResult<Self> {
        let hex: String = raw
            .as_ref()
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();

        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::bad_request("Invalid MAC address"));
        }

        let hex = hex.to_ascii_lowercase();
        let octets: Vec<&str> = (0..6).map(|i| &hex[i * 2..i * 2 + 2]).collect();
        Ok(Self(octets.join(":")))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MacAddress {
    type Error = AppError;

    fn try_from(value: String) -> AppResult<Self> {
        MacAddress::new(value)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spellings_normalize() {
        let expected = "aa:bb:cc:dd:ee:0f";
        for raw in [
            "AA:BB:CC:DD:EE:0F",
            "aa-bb-cc-dd-ee-0f",
            "aabb.ccdd.ee0f",
            "AABBCCDDEE0F",
            " aa:bb:cc:dd:ee:0f ",
        ] {
            assert_eq!(MacAddress::new(raw).unwrap().as_str(), expected, "{raw}");
        }
    }

    #[test]
    fn test_invalid() {
        assert!(MacAddress::new("").is_err());
        assert!(MacAddress::new("aa:bb:cc:dd:ee").is_err());
        assert!(MacAddress::new("zz:bb:cc:dd:ee:ff").is_err());
        assert!(MacAddress::new("aa:bb:cc:dd:ee:ff:00").is_err());
    }
}
