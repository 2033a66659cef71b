//! engine settings: iteration caps, numeric floors and logging. Every field has a default,
//! so a TOML document only needs the keys it wants to change.
//! ```
//! use RustedCompMath::Utils::engine_config::EngineConfig;
//! let config = EngineConfig::from_toml_str("max_iterations = 50\nlog_level = \"warn\"").unwrap();
//! assert_eq!(config.max_iterations, 50);
//! assert_eq!(config.max_subintervals, 1 << 20);
//! ```
use crate::numerical::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_iterations: usize,
    pub derivative_floor: f64,
    pub divisor_floor: f64,
    pub determinant_floor: f64,
    pub divergence_bound: f64,
    pub initial_subintervals: usize,
    pub max_subintervals: usize,
    pub singularity_offset: f64,
    pub max_corrector_iterations: usize,
    pub refine_ode_step: bool,
    pub max_step_halvings: usize,
    pub weak_correlation: f64,
    pub log_level: String,
    pub log_file: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_iterations: 100,
            derivative_floor: 1e-12,
            divisor_floor: 1e-15,
            determinant_floor: 1e-12,
            divergence_bound: 1e12,
            initial_subintervals: 4,
            max_subintervals: 1 << 20,
            singularity_offset: 1e-9,
            max_corrector_iterations: 50,
            refine_ode_step: false,
            max_step_halvings: 10,
            weak_correlation: 0.8,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(document: &str) -> Result<EngineConfig, EngineError> {
        let config: EngineConfig = toml::from_str(document)
            .map_err(|e| EngineError::InvalidParameter(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<EngineConfig, EngineError> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidParameter(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&document)
    }

    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string(self)
            .map_err(|e| EngineError::InvalidParameter(format!("cannot encode config: {}", e)))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("derivative_floor", self.derivative_floor),
            ("divisor_floor", self.divisor_floor),
            ("determinant_floor", self.determinant_floor),
            ("divergence_bound", self.divergence_bound),
            ("singularity_offset", self.singularity_offset),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(EngineError::InvalidParameter(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        let caps = [
            ("max_iterations", self.max_iterations),
            ("initial_subintervals", self.initial_subintervals),
            ("max_corrector_iterations", self.max_corrector_iterations),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(EngineError::InvalidParameter(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        if self.max_subintervals < self.initial_subintervals {
            return Err(EngineError::InvalidParameter(
                "max_subintervals must not be smaller than initial_subintervals".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.weak_correlation) {
            return Err(EngineError::InvalidParameter(
                "weak_correlation must lie in [0, 1]".to_string(),
            ));
        }
        crate::Utils::logger::parse_level(&self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::errors::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations, 100);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            "max_corrector_iterations = 7\nrefine_ode_step = true\n",
        )
        .unwrap();
        assert_eq!(config.max_corrector_iterations, 7);
        assert!(config.refine_ode_step);
        assert_eq!(config.divisor_floor, 1e-15);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = EngineConfig::from_toml_str("derivative_floor = -1.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = EngineConfig::from_toml_str("log_level = \"loud\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = EngineConfig::from_toml_str("max_iterations = \"many\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_round_trip_through_file() {
        let config = EngineConfig {
            max_iterations: 12,
            log_file: Some("engine.log".to_string()),
            ..EngineConfig::default()
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", config.to_toml_string().unwrap()).unwrap();
        let loaded = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }
}
