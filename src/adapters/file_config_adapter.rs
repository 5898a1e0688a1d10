//! INI file configuration adapter.

use crate::domain::error::NetreturnError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NetreturnError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| NetreturnError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, NetreturnError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| NetreturnError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    /// Non-empty trimmed value, if any.
    fn value(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T: FromStr>(
        &self,
        section: &str,
        key: &str,
        default: T,
        expected: &str,
    ) -> Result<T, NetreturnError> {
        match self.value(section, key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| NetreturnError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("expected {expected}, got '{raw}'"),
            }),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, NetreturnError> {
        self.parse_or(section, key, default, "an integer")
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, NetreturnError> {
        let value = self.parse_or(section, key, default, "a number")?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(NetreturnError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: "expected a finite number".to_string(),
            })
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, NetreturnError> {
        match self.value(section, key) {
            None => Ok(default),
            Some(raw) => Self::parse_bool(&raw).ok_or_else(|| NetreturnError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("expected true or false, got '{raw}'"),
            }),
        }
    }
}
