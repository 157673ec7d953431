use log::*;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {reason}")]
    InvalidInput {
        reason: String
    },

    #[error("Failed to construct URL and parameters: {0}")]
    Url(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Communication(#[from] reqwest::Error),

    #[error("Server responded with status {code}: {reason}")]
    Status {
        code: u16,
        reason: String
    },

    #[error("Failed to parse API response: {0}")]
    Parsing(#[from] serde_json::Error),

    #[error("Failed to decode image: {0}")]
    Decoding(#[from] image::ImageError),
}

/// Coarse classification of an [`ApiError`], used to pick the notice shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NetworkError,
    MalformedResponse,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidInput { .. } | ApiError::Url(_) => ErrorKind::InvalidInput,
            ApiError::Communication(_) | ApiError::Status { .. } => ErrorKind::NetworkError,
            ApiError::Parsing(_) | ApiError::Decoding(_) => ErrorKind::MalformedResponse,
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        ApiError::InvalidInput { reason: reason.into() }
    }
}

/// Error object returned by OpenWeatherMap alongside a non-success status,
/// e.g. `{"cod": "404", "message": "city not found"}`.
#[derive(Deserialize, Debug, Clone)]
pub struct OwmError {
    pub message: String,
}
impl From<OwmError> for String {
    fn from(error: OwmError) -> Self {
        error.message
    }
}


/// Performs a single GET and returns the body text of a successful response.
///
/// A non-success status is turned into [`ApiError::Status`]; if the body can be read as the
/// failure type `F` its message becomes the reason, otherwise the canonical reason phrase is used.
pub async fn fetch_text<F>(client: &reqwest::Client, url: reqwest::Url) -> Result<String, ApiError>
where
    F: for<'de> Deserialize<'de> + Into<String>,
{
    let response = client.get(url).send().await?;
    let status = response.status();
    let payload = response.text().await?;

    if status.is_success() {
        return Ok(payload);
    }

    let reason = match serde_json::from_str::<F>(&payload) {
        Ok(api_error) => api_error.into(),
        Err(_) => status.canonical_reason().unwrap_or("unknown status").to_string(),
    };
    warn!("Request failed with status {}: {}", status.as_u16(), reason);

    Err(ApiError::Status { code: status.as_u16(), reason })
}

/// Renders a URL for log output with the value of the `APPID` parameter hidden.
pub fn redacted(url: &reqwest::Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url.query_pairs()
        .map(|(key, value)| {
            let value = if key.eq_ignore_ascii_case("appid") { "***".to_string() } else { value.into_owned() };
            (key.into_owned(), value)
        })
        .collect();

    if !pairs.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }
    shown.to_string()
}
