use serde::{Deserialize, Serialize};
use std::fmt;

const CUSTOMER_ID_LEN: usize = 10;

/// A Google Ads customer ID in canonical form: exactly 10 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CustomerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize any textual or numeric customer ID into its 10-digit form.
///
/// Quotes, dashes, braces and any other non-digit characters are dropped, and
/// the result is left-padded with zeros. Never fails: empty input yields
/// `0000000000`. Inputs carrying more than 10 digits keep the trailing 10.
pub fn normalize(raw: impl fmt::Display) -> CustomerId {
    let raw = raw.to_string();

    let digits: String = raw
        .chars()
        .filter(|c| *c != '"')
        .filter(|c| c.is_ascii_digit())
        .collect();

    let digits = if digits.len() > CUSTOMER_ID_LEN {
        digits[digits.len() - CUSTOMER_ID_LEN..].to_string()
    } else {
        digits
    };

    CustomerId(format!("{digits:0>width$}", width = CUSTOMER_ID_LEN))
}
