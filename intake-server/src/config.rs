use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use intake_core::DEFAULT_PORT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Directory holding the per-day partition files.
    pub data_dir: PathBuf,
    /// Built frontend served for every path outside `/api` and `/health`.
    pub static_dir: PathBuf,
    /// Only accept the four class-year labels as a grade.
    pub strict_grades: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .context("PORT must be a valid number")?,
            None => DEFAULT_PORT,
        };

        let data_dir = lookup("DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("server/data"));

        let static_dir = lookup("STATIC_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("build"));

        let strict_grades = match lookup("STRICT_GRADES") {
            Some(value) => parse_bool_flag(&value)
                .with_context(|| format!("STRICT_GRADES must be true or false, got {:?}", value))?,
            None => false,
        };

        Ok(Config {
            port,
            data_dir,
            static_dir,
            strict_grades,
        })
    }
}

/// Parse a boolean environment flag.
///
/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` in any case. An empty value counts as unset.
pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(
            config,
            Config {
                port: 3001,
                data_dir: PathBuf::from("server/data"),
                static_dir: PathBuf::from("build"),
                strict_grades: false,
            }
        );
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("DATA_DIR", "/var/lib/intake"),
            ("STATIC_DIR", "/srv/www"),
            ("STRICT_GRADES", "TRUE"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/intake"));
        assert_eq!(config.static_dir, PathBuf::from("/srv/www"));
        assert!(config.strict_grades);
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config_from(&[("PORT", "70000")]).is_err());
    }

    #[test]
    fn test_invalid_strict_grades() {
        let err = config_from(&[("STRICT_GRADES", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("STRICT_GRADES"));
    }

    #[test]
    fn test_empty_dirs_fall_back_to_defaults() {
        let config = config_from(&[("DATA_DIR", "  "), ("STATIC_DIR", "")]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("server/data"));
        assert_eq!(config.static_dir, PathBuf::from("build"));
    }

    #[test]
    fn test_parse_bool_flag() {
        assert_eq!(parse_bool_flag("yes"), Some(true));
        assert_eq!(parse_bool_flag(" 0 "), Some(false));
        assert_eq!(parse_bool_flag(""), Some(false));
        assert_eq!(parse_bool_flag("on"), None);
    }
}
