//! Typed readers for environment variables.
//!
//! Unset variables fall back to the given default; set but malformed ones
//! are errors, so a typo never silently becomes the default.

use std::env;
use std::str::FromStr;

/// Error type for environment variable parsing.
pub type EnvError = Box<dyn std::error::Error + Send + Sync>;

fn read_var(name: &str) -> Result<Option<String>, EnvError> {
    match env::var(name) {
        Ok(v) => Ok(Some(v)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{name}: {e}").into()),
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match read_var(name)? {
        Some(value) => value.parse().map_err(|e| format!("{name}: {e}").into()),
        None => Ok(default),
    }
}

/// Parse an environment variable as a boolean, with a default value.
///
/// Valid values (case-insensitive): "true", "1", "false", "0".
///
/// # Errors
///
/// Returns an error if the environment variable is set to an invalid value,
/// or if the value contains invalid Unicode.
pub fn env_bool(name: &str, default: bool) -> Result<bool, EnvError> {
    let Some(value) = read_var(name)? else {
        return Ok(default);
    };

    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!(
            "{name}: invalid value '{value}' (expected 'true', 'false', '1', or '0')"
        )
        .into()),
    }
}

/// Parse an environment variable as a u32, with a default value.
///
/// # Errors
///
/// Returns an error if the environment variable is set to an invalid value,
/// or if the value contains invalid Unicode.
pub fn env_u32(name: &str, default: u32) -> Result<u32, EnvError> {
    parse_var(name, default)
}

/// Parse an environment variable as a u64, with a default value.
///
/// # Errors
///
/// Returns an error if the environment variable is set to an invalid value,
/// or if the value contains invalid Unicode.
pub fn env_u64(name: &str, default: u64) -> Result<u64, EnvError> {
    parse_var(name, default)
}

/// Read an environment variable as a string, with a default value.
///
/// # Errors
///
/// Returns an error if the value contains invalid Unicode.
pub fn env_string(name: &str, default: &str) -> Result<String, EnvError> {
    Ok(read_var(name)?.unwrap_or_else(|| default.to_string()))
}
