pub mod image_cache;
pub mod terminal;

use crate::config::{Config, IconTemplate};
use crate::sources::common::{ApiError, ErrorKind};
use crate::sources::icons::Icon;
use crate::sources::types::{Forecast, Units};
use crate::utils::time;
use chrono_tz::Tz;
use image_cache::{IconLoader, ImageCache};
use std::fmt;
use std::sync::Arc;

/// Display text for one forecast day.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub day: String,
    pub low: String,
    pub high: String,
    pub humidity: String,
    pub icon_url: String,
    /// `None` until the icon has been loaded
    pub icon: Option<Arc<Icon>>,
}

/// Message shown after a failed request, until the user does something else.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub detail: String,
}
impl Notice {
    pub fn headline(&self) -> &'static str {
        match self.kind {
            ErrorKind::InvalidInput => "Invalid city name",
            ErrorKind::NetworkError => "Unable to connect to the weather service",
            ErrorKind::MalformedResponse => "Unable to read the forecast data",
        }
    }
}
impl From<&ApiError> for Notice {
    fn from(error: &ApiError) -> Self {
        Notice { kind: error.kind(), detail: error.to_string() }
    }
}
impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.headline(), self.detail)
    }
}

/// Output surface of the forecast list. All calls happen on the shell loop.
pub trait ForecastView {
    /// Replaces all rows.
    fn show_rows(&mut self, rows: Vec<ForecastRow>);

    fn scroll_to(&mut self, index: usize);

    /// Scrolls by whole pages, negative values scroll up.
    fn scroll_pages(&mut self, pages: isize);

    fn set_icon(&mut self, index: usize, icon: Arc<Icon>);

    fn show_notice(&mut self, notice: &Notice);

    fn show_message(&mut self, message: &str);

    /// Removes the notice or message currently shown, if any.
    fn clear_notice(&mut self);
}

/// Turns forecast records into rows and feeds the icon column from the [`ImageCache`].
pub struct ListPresenter {
    cache: ImageCache,
    loader: IconLoader,
    icons: IconTemplate,
    units: Units,
    timezone: Option<Tz>,
}

impl ListPresenter {
    pub fn new(config: &Config, loader: IconLoader) -> ListPresenter {
        ListPresenter {
            cache: ImageCache::new(),
            loader,
            icons: config.icons.clone(),
            units: config.forecast.units,
            timezone: config.timezone,
        }
    }

    /// One row per record, in the same order.
    pub fn present(&mut self, forecasts: &[Forecast]) -> Vec<ForecastRow> {
        forecasts.iter().map(|forecast| self.bind(forecast)).collect()
    }

    /// Maps a record onto a row. A cached icon is attached right away, otherwise a fetch
    /// is requested and the row keeps its placeholder until the icon arrives.
    pub fn bind(&mut self, forecast: &Forecast) -> ForecastRow {
        let icon_url = self.icon_url(forecast);
        let icon = self.cache.lookup(&icon_url);

        if icon.is_none() {
            self.loader.request(icon_url.clone());
        }

        let day = time::day_of_week(forecast.timestamp, self.timezone)
            .unwrap_or_else(|| forecast.timestamp.to_string());
        let symbol = self.units.temperature_symbol();

        ForecastRow {
            day: format!("{}: {}", day, forecast.description),
            low: format!("Low: {:.0}{}", forecast.min_temperature, symbol),
            high: format!("High: {:.0}{}", forecast.max_temperature, symbol),
            humidity: format!("Humidity: {:.0}%", forecast.humidity_percent),
            icon_url,
            icon,
        }
    }

    pub fn icon_url(&self, forecast: &Forecast) -> String {
        self.icons.url_for(&forecast.icon_key)
    }

    /// Stores a freshly loaded icon. Failed loads leave the cache untouched.
    pub fn icon_loaded(&mut self, url: String, icon: Option<Arc<Icon>>) -> Option<Arc<Icon>> {
        let icon = icon?;
        self.cache.insert(url, icon.clone());
        Some(icon)
    }

    #[cfg(test)]
    pub fn cache(&mut self) -> &mut ImageCache {
        &mut self.cache
    }
}
