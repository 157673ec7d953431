use super::common::{self, ApiError, OwmError};
use super::types::Forecast;
use crate::config::ForecastEndpoint;
use log::*;
use reqwest::Url;
use serde::Deserialize;
use url::form_urlencoded;

#[derive(Deserialize, Debug)]
struct ForecastResult {
    list: Vec<Forecast>,
}
impl From<ForecastResult> for Vec<Forecast> {
    fn from(result: ForecastResult) -> Self {
        result.list
    }
}


/// Builds the daily forecast URL for the city typed by the user.
///
/// The raw input has to be valid UTF-8 and must not be blank. The city is form-encoded and
/// followed by the fixed parameters `units`, `cnt` and `APPID`, in that order.
pub fn build_request_url(endpoint: &ForecastEndpoint, raw_city: &[u8]) -> Result<Url, ApiError> {
    let city = std::str::from_utf8(raw_city)
        .map_err(|e| ApiError::invalid_input(format!("city name is not valid UTF-8 ({})", e)))?
        .trim();

    if city.is_empty() {
        return Err(ApiError::invalid_input("city name is empty"));
    }

    let encoded_city: String = form_urlencoded::byte_serialize(city.as_bytes()).collect();
    let url = format!("{base}{city}&units={units}&cnt={days}&APPID={key}",
                      base = endpoint.base_url,
                      city = encoded_city,
                      units = endpoint.units.as_param(),
                      days = endpoint.days,
                      key = endpoint.api_key);

    Ok(Url::parse(&url)?)
}

pub async fn fetch_forecast_text(client: &reqwest::Client, url: Url) -> Result<String, ApiError> {
    debug!("Requesting forecast from {}", common::redacted(&url));
    common::fetch_text::<OwmError>(client, url).await
}

/// Parses a daily forecast payload; one record per element of `list`, in source order.
pub fn parse_forecast(payload: &str) -> Result<Vec<Forecast>, ApiError> {
    let result = serde_json::from_str::<ForecastResult>(payload)?;
    Ok(result.into())
}

pub async fn get_forecast(client: &reqwest::Client, url: Url) -> Result<Vec<Forecast>, ApiError> {
    let payload = fetch_forecast_text(client, url).await?;

    let forecasts = parse_forecast(&payload)?;
    info!("Received forecast for {} days", forecasts.len());

    Ok(forecasts)
}
