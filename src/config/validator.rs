use crate::config::Config;
use crate::error::{Result, ToxiscanError, ValidationError};
use crate::platform::Platform;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_api(config, &mut errors);
        Self::validate_detection(config, &mut errors);
        Self::validate_render(config, &mut errors);
        Self::validate_platforms(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ToxiscanError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_api(config: &Config, errors: &mut Vec<ValidationError>) {
        let endpoint = config.api.endpoint.trim();
        if endpoint.is_empty() {
            errors.push(ValidationError::new(
                "api.endpoint",
                "Endpoint cannot be empty",
            ));
        } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            errors.push(ValidationError::new(
                "api.endpoint",
                format!("Endpoint must be an http(s) URL, got '{}'", endpoint),
            ));
        }

        if config.api.api_key_env.trim().is_empty() {
            errors.push(ValidationError::new(
                "api.api_key_env",
                "API key environment variable name cannot be empty",
            ));
        }

        if config.api.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "api.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        if config.api.connect_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "api.connect_timeout_secs",
                "Connect timeout must be greater than 0",
            ));
        }
    }

    fn validate_detection(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.detection.min_comment_length == 0 {
            errors.push(ValidationError::new(
                "detection.min_comment_length",
                "Minimum comment length must be greater than 0",
            ));
        }

        if config.detection.mutation_buffer == 0 {
            errors.push(ValidationError::new(
                "detection.mutation_buffer",
                "Mutation buffer must be greater than 0",
            ));
        }
    }

    fn validate_render(config: &Config, errors: &mut Vec<ValidationError>) {
        let threshold = config.render.highlight_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            errors.push(ValidationError::new(
                "render.highlight_threshold",
                format!("Threshold must be between 0.0 and 1.0, got {}", threshold),
            ));
        }
    }

    fn validate_platforms(config: &Config, errors: &mut Vec<ValidationError>) {
        for name in config.platforms.keys() {
            if Platform::from_name(name).is_none() {
                errors.push(ValidationError::new(
                    format!("platforms.{}", name),
                    format!("Unknown platform '{}'", name),
                ));
            }
        }
    }
}
