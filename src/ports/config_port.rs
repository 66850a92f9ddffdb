//! Configuration access port trait.
//!
//! Sections and keys follow INI conventions. [`ConfigPort::get_int`] returns
//! the supplied default when a key is absent or unparseable; use
//! [`ConfigPort::get_string`] when the distinction matters.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
}

/// The one boolean grammar for config values. Case-insensitive.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
