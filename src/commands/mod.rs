pub mod forecast;
pub mod general;

use crate::sources::common::ApiError;
use crate::sources::icons::Icon;
use crate::sources::types::Forecast;
use general::MetaCommand;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything the shell loop reacts to. Background tasks only ever talk to the shell through these.
#[derive(Debug)]
pub enum Event {
    /// Raw bytes of a city name typed by the user
    Submit(Vec<u8>),
    Command(MetaCommand),
    ForecastLoaded(Result<Vec<Forecast>, ApiError>),
    IconLoaded {
        url: String,
        icon: Option<Arc<Icon>>,
    },
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;
