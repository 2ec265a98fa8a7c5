//! Suite configuration
//!
//! Loaded from YAML; every field is optional and falls back to the conformance defaults.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::executor::ShaderType;
use crate::float_format::{FloatFormat, Precision};

/// Formats that cases of each precision are evaluated in
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatsConfig {
    pub highp: FloatFormat,
    pub mediump: FloatFormat,
    pub lowp: FloatFormat,
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            highp: FloatFormat::highp(),
            mediump: FloatFormat::mediump(),
            lowp: FloatFormat::lowp(),
        }
    }
}

impl FormatsConfig {
    pub fn get(&self, precision: Precision) -> &FloatFormat {
        match precision {
            Precision::Lowp => &self.lowp,
            Precision::Mediump => &self.mediump,
            Precision::Highp => &self.highp,
        }
    }
}

/// Parameters of a precision test run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Random input tuples drawn per case, on top of the fixed values
    pub num_randoms: usize,
    pub base_seed: u64,
    /// Failure messages logged per case before the rest are skipped
    pub max_messages: usize,
    pub shader_types: Vec<ShaderType>,
    pub precisions: Vec<Precision>,
    pub formats: FormatsConfig,
    /// Function groups to include, all when absent
    pub functions: Option<Vec<String>>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            num_randoms: 16384,
            base_seed: 0,
            max_messages: 100,
            shader_types: vec![ShaderType::Compute],
            precisions: vec![Precision::Mediump, Precision::Highp],
            formats: FormatsConfig::default(),
            functions: None,
        }
    }
}

impl SuiteConfig {
    /// Parses and validates a configuration from YAML content
    pub fn from_yaml(yaml_content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_norway::from_str(yaml_content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from a YAML file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for precision in Precision::ALL {
            let format = self.formats.get(precision);
            if format.min_exp > format.max_exp {
                return Err(ConfigError::InvalidFormat(precision.to_string(), format!("min_exp {} exceeds max_exp {}", format.min_exp, format.max_exp)));
            }
            if !(0..=52).contains(&format.fraction_bits) {
                return Err(ConfigError::InvalidFormat(precision.to_string(), format!("fraction_bits {} is outside 0..=52", format.fraction_bits)));
            }
        }
        if self.shader_types.is_empty() {
            return Err(ConfigError::NoShaderTypes);
        }
        Ok(())
    }

    /// Whether the function group `name` is selected
    pub fn includes(&self, name: &str) -> bool {
        self.functions.as_ref().is_none_or(|functions| functions.iter().any(|function| function == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float_format::YesNoMaybe;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SuiteConfig::from_yaml("{}").unwrap();
        assert_eq!(config.num_randoms, 16384);
        assert_eq!(config.max_messages, 100);
        assert_eq!(config.shader_types, vec![ShaderType::Compute]);
        assert_eq!(config.formats.mediump, FloatFormat::mediump());
        assert!(config.includes("sin"));
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
num_randoms: 64
base_seed: 3
shader_types: [compute, vertex]
precisions: [highp]
functions: [add, dot]
formats:
  mediump:
    min_exp: -14
    max_exp: 15
    fraction_bits: 10
    exact_precision: false
    has_subnormal: "yes"
    has_inf: "yes"
    has_nan: "yes"
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.num_randoms, 64);
        assert_eq!(config.base_seed, 3);
        assert_eq!(config.shader_types, vec![ShaderType::Compute, ShaderType::Vertex]);
        assert_eq!(config.precisions, vec![Precision::Highp]);
        assert_eq!(config.formats.mediump.fraction_bits, 10);
        assert_eq!(config.formats.mediump.has_subnormal, YesNoMaybe::Yes);
        assert_eq!(config.formats.highp, FloatFormat::highp());
        assert!(config.includes("dot"));
        assert!(!config.includes("sin"));
    }

    #[test]
    fn test_invalid_formats_are_rejected() {
        let mut config = SuiteConfig::default();
        config.formats.lowp.min_exp = 3;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFormat(name, _)) if name == "lowp"));

        let mut config = SuiteConfig::default();
        config.formats.highp.fraction_bits = 60;
        assert!(config.validate().is_err());

        assert!(matches!(SuiteConfig::from_yaml("shader_types: []"), Err(ConfigError::NoShaderTypes)));
        assert!(matches!(SuiteConfig::from_yaml("num_randoms: many"), Err(ConfigError::Yaml(_))));
    }
}
