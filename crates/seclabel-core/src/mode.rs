//! SELinux enforce mode

use crate::error::{LabelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the kernel blocks, only logs, or ignores policy violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforceMode {
    /// Violations are denied and logged
    Enforcing,
    /// Violations are logged but allowed
    Permissive,
    /// SELinux is not active. Can only be entered at boot.
    Disabled,
}

impl EnforceMode {
    /// Integer form used by selinuxfs and callers: 1, 0 or -1
    pub fn as_i32(self) -> i32 {
        match self {
            EnforceMode::Enforcing => 1,
            EnforceMode::Permissive => 0,
            EnforceMode::Disabled => -1,
        }
    }

    /// Parse the value of a `SELINUX=` line in the host config file.
    ///
    /// Anything unrecognised maps to `Disabled`.
    pub fn from_config_value(value: &str) -> Self {
        value.trim().parse().unwrap_or(EnforceMode::Disabled)
    }

    pub fn all() -> [EnforceMode; 3] {
        [
            EnforceMode::Enforcing,
            EnforceMode::Permissive,
            EnforceMode::Disabled,
        ]
    }
}

impl TryFrom<i32> for EnforceMode {
    type Error = LabelError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(EnforceMode::Enforcing),
            0 => Ok(EnforceMode::Permissive),
            -1 => Ok(EnforceMode::Disabled),
            other => Err(LabelError::InvalidMode(other.to_string())),
        }
    }
}

impl FromStr for EnforceMode {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforcing" | "1" => Ok(EnforceMode::Enforcing),
            "permissive" | "0" => Ok(EnforceMode::Permissive),
            "disabled" | "-1" => Ok(EnforceMode::Disabled),
            _ => Err(LabelError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for EnforceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnforceMode::Enforcing => "enforcing",
            EnforceMode::Permissive => "permissive",
            EnforceMode::Disabled => "disabled",
        };
        f.write_str(name)
    }
}
