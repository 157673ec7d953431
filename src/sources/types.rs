use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Weather summary for a single forecast day.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "DayEntry")]
pub struct Forecast {
    /// Seconds since the epoch, identifies the forecast day
    pub timestamp: i64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub humidity_percent: f64,
    pub description: String,
    pub icon_key: String,
}

// raw shape of one element of the `list` array
#[derive(Deserialize, Debug)]
struct DayEntry {
    dt: i64,
    temp: DayTemperature,
    humidity: f64,
    weather: Vec<Condition>,
}

#[derive(Deserialize, Debug)]
struct DayTemperature {
    min: f64,
    max: f64,
}

#[derive(Deserialize, Debug)]
struct Condition {
    description: String,
    icon: String,
}

impl TryFrom<DayEntry> for Forecast {
    type Error = String;

    fn try_from(entry: DayEntry) -> Result<Self, Self::Error> {
        // only the first weather condition of a day is shown
        let condition = entry.weather.into_iter().next()
            .ok_or_else(|| format!("no weather condition for day {}", entry.dt))?;

        Ok(Forecast {
            timestamp: entry.dt,
            min_temperature: entry.temp.min,
            max_temperature: entry.temp.max,
            humidity_percent: entry.humidity,
            description: condition.description,
            icon_key: condition.icon,
        })
    }
}

/// Unit system requested from the API, it also decides the temperature symbol shown per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Imperial,
    Metric,
    Standard,
}
impl Units {
    pub fn as_param(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
            Units::Standard => "standard",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "°F",
            Units::Metric => "°C",
            Units::Standard => "K",
        }
    }
}
impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_param())
    }
}
impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "imperial" => Ok(Units::Imperial),
            "metric" => Ok(Units::Metric),
            "standard" => Ok(Units::Standard),
            other => Err(format!("unknown unit system '{}'", other)),
        }
    }
}
