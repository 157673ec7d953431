use crate::sources::types::Units;
use chrono_tz::Tz;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/forecast/daily?q=";
pub const DEFAULT_ICON_BASE_URL: &str = "https://openweathermap.org/img/w/";
pub const DEFAULT_ICON_EXTENSION: &str = ".png";
/// The daily endpoint serves at most 16 days
pub const MAX_FORECAST_DAYS: u8 = 16;
const DEFAULT_LIST_HEIGHT: usize = 8;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("ENV_VAR '{0}' could not be located!")]
    Missing(&'static str),

    #[error("ENV_VAR '{name}' has an invalid value: {reason}")]
    Invalid {
        name: &'static str,
        reason: String
    },
}

/// Everything needed to build a forecast request URL.
#[derive(Debug, Clone)]
pub struct ForecastEndpoint {
    /// Prefix the encoded city name is appended to, ends with the city query parameter
    pub base_url: String,
    pub api_key: String,
    pub units: Units,
    pub days: u8,
}

/// Template turning an icon code into the URL of its image.
#[derive(Debug, Clone)]
pub struct IconTemplate {
    pub base_url: String,
    pub extension: String,
}
impl IconTemplate {
    pub fn url_for(&self, icon_key: &str) -> String {
        format!("{}{}{}", self.base_url, icon_key, self.extension)
    }
}
impl Default for IconTemplate {
    fn default() -> Self {
        IconTemplate {
            base_url: DEFAULT_ICON_BASE_URL.to_string(),
            extension: DEFAULT_ICON_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub forecast: ForecastEndpoint,
    pub icons: IconTemplate,
    /// Zone used for weekday labels, the local zone if unset
    pub timezone: Option<Tz>,
    /// Number of rows shown per page of the list
    pub list_height: usize,
    pub verbose_logging: bool,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Config, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        // blank values count as unset
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = var("OWM_API_KEY").ok_or(ConfigError::Missing("OWM_API_KEY"))?;

        let units = match var("FORECAST_UNITS") {
            Some(raw) => raw.parse::<Units>()
                .map_err(|reason| ConfigError::Invalid { name: "FORECAST_UNITS", reason })?,
            None => Units::default(),
        };

        let days = match var("FORECAST_DAYS") {
            Some(raw) => parse_days(&raw)?,
            None => MAX_FORECAST_DAYS,
        };

        let timezone = match var("DISPLAY_TIMEZONE") {
            Some(raw) => Some(raw.trim().parse::<Tz>()
                .map_err(|e| ConfigError::Invalid { name: "DISPLAY_TIMEZONE", reason: e.to_string() })?),
            None => None,
        };

        let list_height = match var("LIST_HEIGHT") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(height) if height > 0 => height,
                _ => return Err(ConfigError::Invalid {
                    name: "LIST_HEIGHT",
                    reason: format!("expected a positive number, got '{}'", raw),
                }),
            },
            None => DEFAULT_LIST_HEIGHT,
        };

        Ok(Config {
            forecast: ForecastEndpoint {
                base_url: var("FORECAST_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_key,
                units,
                days,
            },
            icons: IconTemplate {
                base_url: var("ICON_BASE_URL").unwrap_or_else(|| DEFAULT_ICON_BASE_URL.to_string()),
                extension: lookup("ICON_EXTENSION").unwrap_or_else(|| DEFAULT_ICON_EXTENSION.to_string()),
            },
            timezone,
            list_height,
            verbose_logging: var("VERBOSE_LOGGING").map(|b| b.parse::<bool>().unwrap_or(false)).unwrap_or(false),
        })
    }
}

fn parse_days(raw: &str) -> Result<u8, ConfigError> {
    match raw.trim().parse::<u8>() {
        Ok(days) if (1..=MAX_FORECAST_DAYS).contains(&days) => Ok(days),
        _ => Err(ConfigError::Invalid {
            name: "FORECAST_DAYS",
            reason: format!("expected a number between 1 and {}, got '{}'", MAX_FORECAST_DAYS, raw),
        }),
    }
}
