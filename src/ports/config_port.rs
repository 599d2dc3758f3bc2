//! Configuration access port trait.

/// Typed lookups return `Ok(None)` for an absent or blank key and
/// `Err(raw)` when a value is present but does not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, String>;
    fn get_count(&self, section: &str, key: &str) -> Result<Option<usize>, String>;
}
