use std::fmt;

use serde::{Serialize, Serializer};

use crate::errors::NportError;

/// Maximum number of digits in an SEC Central Index Key.
const CIK_DIGITS: usize = 10;

/// A normalized Central Index Key: exactly ten digits, zero-padded.
///
/// This is the form `data.sec.gov` expects in submissions URLs and the key
/// used by the result cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cik(String);

impl Cik {
    /// Normalize free-form user input into a CIK.
    ///
    /// Non-digit characters are discarded (so `CIK 884394` and `0000884394`
    /// are equivalent). Between one and ten digits must remain.
    ///
    /// ```
    /// use nport_holdings::Cik;
    ///
    /// assert_eq!(Cik::parse("884394").unwrap().as_str(), "0000884394");
    /// assert!(Cik::parse("12345678901").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, NportError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() || digits.len() > CIK_DIGITS {
            return Err(NportError::InvalidCik(input.to_string()));
        }
        Ok(Self(format!("{:0>width$}", digits, width = CIK_DIGITS)))
    }

    /// The ten-digit, zero-padded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading zeros removed, as used in EDGAR Archives paths.
    pub fn unpadded(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() {
            "0"
        } else {
            trimmed
        }
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Cik {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
