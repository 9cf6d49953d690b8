//! Configuration access port trait.

use rust_decimal::Decimal;

/// Read-only access to sectioned `key = value` configuration.
///
/// Section and key lookups are case-insensitive. Typed getters fall back to
/// `default` when the key is absent or does not parse; callers that must
/// reject bad values read the raw string instead.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_decimal(&self, section: &str, key: &str, default: Decimal) -> Decimal;

    /// Keys present in `section`, sorted. Empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
