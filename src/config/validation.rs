//! Configuration validation.

use crate::config::Config;
use std::collections::HashSet;

/// Validate the configuration.
///
/// Checks for:
/// - At least one backend endpoint
/// - No empty hosts or zero ports
/// - No duplicate endpoints
/// - A recognized log level
///
/// # Returns
///
/// `Ok(())` if valid, or an error message describing every problem found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut errors = Vec::new();

    // The registry must never be empty
    if config.backends.is_empty() {
        errors.push("at least one backend must be defined".to_string());
    }

    let mut seen = HashSet::new();

    for backend in &config.backends {
        if backend.host.is_empty() {
            errors.push("backend host cannot be empty".to_string());
        }

        if backend.port == 0 {
            errors.push(format!(
                "backend '{}' has port 0 (must be >= 1)",
                backend.host
            ));
        }

        if !seen.insert((backend.host.as_str(), backend.port)) {
            errors.push(format!(
                "duplicate backend endpoint: {}:{}",
                backend.host, backend.port
            ));
        }
    }

    // Validate log level
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.global.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "invalid log level '{}', must be one of: {}",
            config.global.log_level,
            valid_levels.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}
