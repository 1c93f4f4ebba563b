use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conversion::{ConversionConfiguration, DEFAULT_BASE_URL};
use crate::error::ContextError;

/// The settings of a run, read from an optional JSON file and overridden by the environment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout_seconds: Option<u64>,
    /// Whether the filled forms are flattened.
    pub flatten: bool,
    /// Whether the field names of every form are logged.
    pub debug: bool,
    /// Prepended to the file names of the documents filled in batch.
    pub output_prefix: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_seconds: None,
            flatten: false,
            debug: false,
            output_prefix: "filled_".to_string(),
        }
    }
}

impl Configuration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error("Failed to read the configuration file", &error)
            })?;
        let configuration: Configuration = serde_json::from_str(&configuration_file_contents)
            .map_err(|error| {
                ContextError::with_error("Failed to parse the configuration file", &error)
            })?;

        Ok(configuration)
    }

    /// Applies the environment variable overrides, looked up through the given function so that
    /// the process environment is only read by the binary.
    pub fn with_environment<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("PDFREST_API_KEY").filter(|api_key| !api_key.is_empty()) {
            self.api_key = Some(api_key);
        }
        if let Some(base_url) = lookup("PDFREST_BASE_URL").filter(|base_url| !base_url.is_empty()) {
            self.base_url = base_url;
        }
        if lookup("FLATTEN").as_deref() == Some("true") {
            self.flatten = true;
        }
        if lookup("DEBUG").as_deref() == Some("true") {
            self.debug = true;
        }

        self
    }

    /// The settings of the conversion client, which requires an API key.
    pub fn conversion_configuration(&self) -> Result<ConversionConfiguration, ContextError> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            ContextError::with_context(
                "No pdfRest API key is configured, set PDFREST_API_KEY or api-key in the configuration file",
            )
        })?;

        Ok(ConversionConfiguration {
            api_key,
            base_url: self.base_url.clone(),
            request_timeout: self.request_timeout_seconds.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_keys_take_their_default() {
        let configuration: Configuration =
            serde_json::from_str(r#"{ "api-key": "secret", "flatten": true }"#).unwrap();

        assert_eq!(
            configuration,
            Configuration {
                api_key: Some("secret".into()),
                flatten: true,
                ..Configuration::default()
            }
        );
        assert_eq!(configuration.output_prefix, "filled_");
    }

    #[test]
    fn environment_overrides_the_file() {
        let environment: HashMap<&str, &str> = [
            ("PDFREST_API_KEY", "from-environment"),
            ("PDFREST_BASE_URL", "http://localhost:8080"),
            ("FLATTEN", "true"),
            ("DEBUG", "1"),
        ]
        .into_iter()
        .collect();
        let configuration = Configuration {
            api_key: Some("from-file".into()),
            ..Configuration::default()
        }
        .with_environment(|name| environment.get(name).map(|value| value.to_string()));

        assert_eq!(configuration.api_key.as_deref(), Some("from-environment"));
        assert_eq!(configuration.base_url, "http://localhost:8080");
        assert!(configuration.flatten);
        // Only the literal "true" enables a toggle
        assert!(!configuration.debug);
    }

    #[test]
    fn conversion_requires_an_api_key() {
        let configuration = Configuration::default();
        assert!(configuration.conversion_configuration().is_err());

        let configuration = Configuration {
            api_key: Some("key".into()),
            request_timeout_seconds: Some(30),
            ..Configuration::default()
        };
        let conversion = configuration.conversion_configuration().unwrap();
        assert_eq!(conversion.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(conversion.base_url, "https://api.pdfrest.com");
    }

    #[test]
    fn configuration_files_are_read() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("acrofill.json");
        std::fs::write(&path, r#"{ "output-prefix": "done_", "request-timeout-seconds": 5 }"#).unwrap();

        let configuration = Configuration::from_path(&path).unwrap();
        assert_eq!(configuration.output_prefix, "done_");
        assert_eq!(configuration.request_timeout_seconds, Some(5));
        assert!(Configuration::from_path(&directory.path().join("missing.json")).is_err());
    }
}
