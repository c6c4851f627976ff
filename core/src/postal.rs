//! Brazilian postal code (CEP) cleaning, validation and formatting.
//!
//! # Design
//! Input arrives as whatever the user typed: `01310-100`, `01310100`,
//! ` 01.310-100 `. Every operation first strips non-digit characters, so
//! punctuation never affects the outcome. `PostalCode` is the only way to
//! carry a code that is known to be valid; the free functions are for callers
//! that only need a yes/no answer or a display string.

use std::fmt;

use crate::error::LookupError;

/// Number of digits in a valid CEP.
pub const CEP_LEN: usize = 8;

/// Strip every character that is not an ASCII digit.
pub fn clean(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// True iff exactly eight digits remain after cleaning.
pub fn validate(raw: &str) -> bool {
    clean(raw).len() == CEP_LEN
}

/// Render as `DDDDD-DDD` when the cleaned input has eight digits, otherwise
/// return the cleaned digits unchanged.
pub fn format(raw: &str) -> String {
    let digits = clean(raw);
    if digits.len() == CEP_LEN {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits
    }
}

/// A validated eight-digit postal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        let digits = clean(raw);
        if digits.len() != CEP_LEN {
            return Err(LookupError::Validation {
                input: raw.to_string(),
            });
        }
        Ok(Self(digits))
    }

    /// The bare digits, as sent on the wire.
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", &self.0[..5], &self.0[5..])
    }
}
