//! Configuration access port.

use crate::domain::error::TurtleError;

/// Sectioned key/value configuration.
///
/// Numeric getters fall back to `default` when the key is absent but reject values that are
/// present and unparseable, so a typo never silently becomes the default.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, TurtleError>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, TurtleError>;
}
