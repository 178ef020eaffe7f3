use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use anyhow::{ensure, Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// A BLS public key in its `0x`-prefixed hex representation.
///
/// Validator registries, deposit reference files, and operator registry logs
/// all exchange pubkeys as hex strings. The hex digits are lowercased at
/// construction so equality and map lookups never depend on upstream casing.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct Pubkey(String);

impl Pubkey {
    pub const LENGTH: usize = 48;

    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        let digits = string
            .strip_prefix("0x")
            .ok_or_else(|| Error::msg("pubkey is missing the 0x prefix"))?;

        ensure!(
            digits.chars().all(|char| char.is_ascii_hexdigit()),
            "pubkey contains non-hex characters: {string}",
        );

        Ok(Self(format!("0x{}", digits.to_lowercase())))
    }
}

impl Display for Pubkey {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}
