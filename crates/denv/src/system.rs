// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Target system identification.
//!
//! The target system is an explicit value threaded through composition,
//! selection, and artifact hashing rather than ambient process state, so
//! several systems can be resolved side by side without cross-talk.

use serde::{Deserialize, Serialize};

/// A resolution target, e.g. `x86_64-linux` or `aarch64-darwin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct System {
    pub arch: String,
    pub os: String,
}

impl System {
    /// The system this process is running on.
    pub fn host() -> Self {
        Self {
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
        }
    }
}

impl std::fmt::Display for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.arch, self.os)
    }
}

impl TryFrom<String> for System {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        let (arch, os) = value.split_once('-').ok_or_else(|| {
            crate::Error::ValidationFailed(format!(
                "Invalid system '{value}': expected '<arch>-<os>' (e.g. 'x86_64-linux')"
            ))
        })?;
        if arch.is_empty() || os.is_empty() {
            return Err(crate::Error::ValidationFailed(format!(
                "Invalid system '{value}': arch and os must be non-empty"
            )));
        }
        Ok(Self {
            arch: arch.to_string(),
            os: os.to_string(),
        })
    }
}

impl From<System> for String {
    fn from(system: System) -> Self {
        system.to_string()
    }
}

#[cfg(test)]
mod system_test {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let system = System::try_from("x86_64-linux".to_string()).unwrap();
        assert_eq!(system.arch, "x86_64");
        assert_eq!(system.os, "linux");
        assert_eq!(system.to_string(), "x86_64-linux");
    }

    #[test]
    fn test_multi_dash_os() {
        let system = System::try_from("aarch64-apple-darwin".to_string()).unwrap();
        assert_eq!(system.arch, "aarch64");
        assert_eq!(system.os, "apple-darwin");
    }

    #[test]
    fn test_invalid_system() {
        assert!(System::try_from("linux".to_string()).is_err());
        assert!(System::try_from("-linux".to_string()).is_err());
    }
}
