//! Fixed-format timestamp strings.
//!
//! Dates are exchanged as strings and date-range lookups match on a string
//! prefix (`2024-05-01%`), so the layout below is part of the storage contract.

use chrono::{Local, Utc};

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f%z";
const UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

/// Paired local and UTC rendering of one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    /// `YYYY-MM-DD HH:MM:SS.mmm+ZZZZ`
    pub local: String,
    /// `YYYY-MM-DD HH:MM:SS.mmmZ`
    pub utc: String,
}

impl Timestamp {
    pub fn now() -> Self {
        let utc = Utc::now();
        Self {
            local: utc.with_timezone(&Local).format(LOCAL_FORMAT).to_string(),
            utc: utc.format(UTC_FORMAT).to_string(),
        }
    }
}
