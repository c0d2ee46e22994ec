//! Decoder configuration.

use crate::constants::{MAX_EVENT_DATA_SIZE, MAX_FIELD_VALUE_SIZE};

/// Configuration for a [`ClientConn`](crate::ClientConn).
///
/// Provides sensible defaults and chainable setter methods.
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    /// Maximum size in bytes of the accumulated `data` of a single event,
    /// including the newlines joining multiple `data` lines.
    pub max_data_size: usize,
    /// Maximum size in bytes of a single `event`, `id` or `retry` value.
    pub max_field_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_data_size: MAX_EVENT_DATA_SIZE,
            max_field_size: MAX_FIELD_VALUE_SIZE,
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum accumulated data size per event.
    #[must_use]
    pub fn max_data_size(mut self, size: usize) -> Self {
        self.max_data_size = size;
        self
    }

    /// Set the maximum size of an `event`, `id` or `retry` value.
    #[must_use]
    pub fn max_field_size(mut self, size: usize) -> Self {
        self.max_field_size = size;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_data_size == 0 {
            return Err("Max data size must be > 0".to_string());
        }
        if self.max_field_size == 0 {
            return Err("Max field size must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();
        assert_eq!(config.max_data_size, 4 * 1024 * 1024);
        assert_eq!(config.max_field_size, 64 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = DecoderConfig::new().max_data_size(1024).max_field_size(16);
        assert_eq!(config.max_data_size, 1024);
        assert_eq!(config.max_field_size, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_max_data_size() {
        let config = DecoderConfig::new().max_data_size(0);
        let result = config.validate();
        assert!(result.is_err());
        assert_eq!(result.expect_err("should fail"), "Max data size must be > 0");
    }

    #[test]
    fn test_validation_zero_max_field_size() {
        let config = DecoderConfig::new().max_field_size(0);
        assert_eq!(
            config.validate().expect_err("should fail"),
            "Max field size must be > 0"
        );
    }
}
