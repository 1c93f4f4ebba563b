//! Conversion of dynamic XFA forms into static AcroForm documents through the pdfRest web API.
//!
//! The document is uploaded to the `pdf-with-acroforms` endpoint, which answers with the
//! location of the converted document. That document is then downloaded with the same API key.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.pdfrest.com";
const API_KEY_HEADER: &str = "Api-Key";

/// Turns the bytes of a document into the bytes of its converted version.
pub trait DocumentConverter {
    fn convert(&self, input: &[u8], file_name: &str) -> Result<Vec<u8>, ConversionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The service answered with a status other than a success, at either step.
    Status { status_code: u16, message: String },
    /// The service could not be reached or the response could not be read.
    Transport { message: String },
    /// The upload response does not tell where the converted document is.
    InvalidResponse { message: String },
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionError::Status {
                status_code,
                message,
            } => write!(
                formatter,
                "status code {} from the conversion service: {}",
                status_code, message
            ),
            ConversionError::Transport { message } => {
                write!(formatter, "unable to reach the conversion service: {}", message)
            }
            ConversionError::InvalidResponse { message } => {
                write!(formatter, "unexpected response from the conversion service: {}", message)
            }
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<reqwest::Error> for ConversionError {
    fn from(error: reqwest::Error) -> Self {
        ConversionError::Transport {
            message: error.to_string(),
        }
    }
}

/// Where and how to reach the conversion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfiguration {
    pub api_key: String,
    pub base_url: String,
    /// No timeout is applied when this is `None`, a hung request then blocks indefinitely.
    pub request_timeout: Option<Duration>,
}

impl ConversionConfiguration {
    pub fn new<S: Into<String>>(api_key: S) -> ConversionConfiguration {
        ConversionConfiguration {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    output_url: Option<String>,
}

/// A blocking client of the pdfRest API.
#[derive(Debug, Clone)]
pub struct PdfRestClient {
    client: Client,
    configuration: ConversionConfiguration,
}

impl PdfRestClient {
    pub fn new(configuration: ConversionConfiguration) -> Result<PdfRestClient, ConversionError> {
        let client = Client::builder()
            .timeout(configuration.request_timeout)
            .user_agent(concat!("acrofill/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(PdfRestClient {
            client,
            configuration,
        })
    }

    fn upload(&self, input: &[u8], file_name: &str) -> Result<String, ConversionError> {
        let part = Part::bytes(input.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let url = format!(
            "{}/pdf-with-acroforms",
            self.configuration.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.configuration.api_key)
            .multipart(Form::new().part("file", part))
            .send()?;

        let response: UploadResponse = successful(response)?.json().map_err(|error| {
            ConversionError::InvalidResponse {
                message: error.to_string(),
            }
        })?;
        response
            .output_url
            .filter(|output_url| !output_url.is_empty())
            .ok_or_else(|| ConversionError::InvalidResponse {
                message: "the response carries no outputUrl".into(),
            })
    }

    fn download(&self, output_url: &str) -> Result<Vec<u8>, ConversionError> {
        let response = self
            .client
            .get(output_url)
            .header(API_KEY_HEADER, &self.configuration.api_key)
            .send()?;

        Ok(successful(response)?.bytes()?.to_vec())
    }
}

impl DocumentConverter for PdfRestClient {
    fn convert(&self, input: &[u8], file_name: &str) -> Result<Vec<u8>, ConversionError> {
        log::info!("Starting the conversion of {} from XFA to AcroForm", file_name);
        let output_url = self.upload(input, file_name)?;
        log::info!("Conversion successful, downloading the document from {}", output_url);

        let output = self.download(&output_url)?;
        log::debug!("Downloaded {} bytes", output.len());
        Ok(output)
    }
}

/// Turns an unsuccessful response into an error carrying the response body.
fn successful(response: Response) -> Result<Response, ConversionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .unwrap_or_else(|error| format!("<unreadable response body: {}>", error));
    log::error!("API error ({}): {}", status.as_u16(), message);
    Err(ConversionError::Status {
        status_code: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_defaults_to_the_public_api_without_timeout() {
        let configuration = ConversionConfiguration::new("key");
        assert_eq!(configuration.base_url, "https://api.pdfrest.com");
        assert_eq!(configuration.request_timeout, None);
    }

    #[test]
    fn status_errors_show_the_code_and_the_body() {
        let error = ConversionError::Status {
            status_code: 401,
            message: "Invalid API key".into(),
        };
        assert_eq!(
            error.to_string(),
            "status code 401 from the conversion service: Invalid API key"
        );
    }
}
