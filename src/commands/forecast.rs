use super::general::{MetaCommand, HELP};
use super::{Event, EventReceiver, EventSender};
use crate::config::{Config, ForecastEndpoint};
use crate::presenter::image_cache::IconLoader;
use crate::presenter::{ForecastView, ListPresenter, Notice};
use crate::sources::common::{ApiError, ErrorKind};
use crate::sources::forecast as source;
use crate::sources::icons::Icon;
use crate::sources::types::Forecast;
use log::*;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Idle,
    FetchInFlight,
    DisplayingResults,
    DisplayingError(ErrorKind),
}
impl fmt::Display for ShellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellState::Idle => write!(f, "idle"),
            ShellState::FetchInFlight => write!(f, "waiting for a forecast"),
            ShellState::DisplayingResults => write!(f, "showing a forecast"),
            ShellState::DisplayingError(kind) => write!(f, "showing a {:?} notice", kind),
        }
    }
}

/// Owns the displayed forecast and is the only place where it, the image cache and the view change.
///
/// Forecast requests are not sequenced: if several are in flight, whichever completes last
/// decides what is shown.
pub struct Shell<V: ForecastView> {
    client: reqwest::Client,
    endpoint: ForecastEndpoint,
    events: EventSender,
    state: ShellState,
    forecasts: Vec<Forecast>,
    presenter: ListPresenter,
    view: V,
    in_flight: usize,
}

impl<V: ForecastView> Shell<V> {
    pub fn new(client: reqwest::Client, config: &Config, view: V, events: EventSender) -> Self {
        let loader = IconLoader::new(client.clone(), events.clone());

        Shell {
            client,
            endpoint: config.forecast.clone(),
            events,
            state: ShellState::Idle,
            forecasts: Vec::new(),
            presenter: ListPresenter::new(config, loader),
            view,
            in_flight: 0,
        }
    }

    pub async fn run(mut self, mut events: EventReceiver) {
        self.view.show_message(HELP);

        while let Some(event) = events.recv().await {
            if self.handle(event).is_break() {
                break;
            }
            trace!("Shell is {}", self.state);
        }
        info!("Shutting down");
    }

    pub fn handle(&mut self, event: Event) -> ControlFlow<()> {
        match event {
            Event::Submit(raw_city) => self.submit(&raw_city),
            Event::Command(command) => return self.command(command),
            Event::ForecastLoaded(result) => self.forecast_loaded(result),
            Event::IconLoaded { url, icon } => self.icon_loaded(url, icon),
        }
        ControlFlow::Continue(())
    }

    fn submit(&mut self, raw_city: &[u8]) {
        self.state = ShellState::Idle;
        self.view.clear_notice();

        let url = match source::build_request_url(&self.endpoint, raw_city) {
            Ok(url) => url,
            Err(e) => {
                info!("Rejected city input: {}", e);
                self.fail(&e);
                return;
            },
        };

        if self.in_flight > 0 {
            debug!("{} forecast request(s) still in flight, the last one to finish wins", self.in_flight);
        }
        self.in_flight += 1;
        self.state = ShellState::FetchInFlight;

        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = source::get_forecast(&client, url).await;
            let _ = events.send(Event::ForecastLoaded(result));
        });
    }

    fn forecast_loaded(&mut self, result: Result<Vec<Forecast>, ApiError>) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match result {
            Ok(forecasts) => {
                // full replacement, nothing of the previous forecast is kept
                self.forecasts = forecasts;
                let rows = self.presenter.present(&self.forecasts);

                self.view.show_rows(rows);
                self.view.scroll_to(0);
                self.state = ShellState::DisplayingResults;
            },
            Err(e) => {
                warn!("Forecast request failed: {}", e);
                self.fail(&e);
            },
        }
    }

    fn icon_loaded(&mut self, url: String, icon: Option<Arc<Icon>>) {
        let Some(icon) = self.presenter.icon_loaded(url.clone(), icon) else {
            return;
        };

        // several days can share one icon
        for (index, forecast) in self.forecasts.iter().enumerate() {
            if self.presenter.icon_url(forecast) == url {
                self.view.set_icon(index, icon.clone());
            }
        }
    }

    fn command(&mut self, command: MetaCommand) -> ControlFlow<()> {
        self.view.clear_notice();

        match command {
            MetaCommand::Quit => return ControlFlow::Break(()),
            MetaCommand::Help => self.view.show_message(HELP),
            MetaCommand::ScrollUp => self.view.scroll_pages(-1),
            MetaCommand::ScrollDown => self.view.scroll_pages(1),
            MetaCommand::Unknown(name) => {
                self.view.show_message(&format!("Sorry, I don't know the command '{}'. Type !help for a list.", name))
            },
        }
        ControlFlow::Continue(())
    }

    // the displayed forecast stays as it is, only a notice is added
    fn fail(&mut self, error: &ApiError) {
        let notice = Notice::from(error);
        self.state = ShellState::DisplayingError(notice.kind);
        self.view.show_notice(&notice);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IconTemplate;
    use crate::presenter::ForecastRow;
    use crate::sources::forecast::tests::{endpoint, payload};
    use crate::sources::icons::tests::png_bytes;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate, Times};

    impl<V: ForecastView> Shell<V> {
        fn state(&self) -> ShellState {
            self.state
        }

        fn forecasts(&self) -> &[Forecast] {
            &self.forecasts
        }

        fn view(&self) -> &V {
            &self.view
        }

        fn presenter(&mut self) -> &mut ListPresenter {
            &mut self.presenter
        }
    }

    /// Records what the shell asks the view to do.
    #[derive(Default)]
    struct RecordingView {
        rows: Vec<ForecastRow>,
        shown: usize,
        scrolled_to: Option<usize>,
        notices: Vec<Notice>,
        messages: Vec<String>,
        page: isize,
        // whether the last notice or message is still on screen
        showing_notice: bool,
    }

    impl ForecastView for RecordingView {
        fn show_rows(&mut self, rows: Vec<ForecastRow>) {
            self.rows = rows;
            self.shown += 1;
            self.scrolled_to = None;
        }

        fn scroll_to(&mut self, index: usize) {
            self.scrolled_to = Some(index);
        }

        fn scroll_pages(&mut self, pages: isize) {
            self.page += pages;
        }

        fn set_icon(&mut self, index: usize, icon: Arc<Icon>) {
            self.rows[index].icon = Some(icon);
        }

        fn show_notice(&mut self, notice: &Notice) {
            self.notices.push(notice.clone());
            self.showing_notice = true;
        }

        fn show_message(&mut self, message: &str) {
            self.messages.push(message.to_string());
            self.showing_notice = true;
        }

        fn clear_notice(&mut self) {
            self.showing_notice = false;
        }
    }

    struct Harness {
        server: MockServer,
        shell: Shell<RecordingView>,
        events: EventReceiver,
    }

    impl Harness {
        async fn start() -> Harness {
            let server = MockServer::start().await;
            let config = Config {
                forecast: endpoint(&format!("{}/daily?q=", server.uri())),
                icons: IconTemplate { base_url: format!("{}/img/w/", server.uri()), extension: ".png".to_string() },
                timezone: Some(chrono_tz::UTC),
                list_height: 8,
                verbose_logging: false,
            };

            let (tx, rx) = mpsc::unbounded_channel();
            let shell = Shell::new(reqwest::Client::new(), &config, RecordingView::default(), tx);
            Harness { server, shell, events: rx }
        }

        async fn mock_forecast(&self, city: &str, body: String) {
            Mock::given(method("GET"))
                .and(path("/daily"))
                .and(query_param("q", city))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&self.server)
                .await;
        }

        async fn mock_icon(&self, key: &str, response: ResponseTemplate, expected_calls: impl Into<Times>) {
            Mock::given(method("GET"))
                .and(path(format!("/img/w/{}.png", key)))
                .respond_with(response)
                .expect(expected_calls)
                .mount(&self.server)
                .await;
        }

        async fn pump_until_forecast(&mut self) {
            loop {
                let event = self.events.recv().await.expect("event channel closed");
                let is_forecast = matches!(event, Event::ForecastLoaded(_));
                let _ = self.shell.handle(event);
                if is_forecast {
                    return;
                }
            }
        }

        async fn pump_icons(&mut self, count: usize) {
            for _ in 0..count {
                let event = self.events.recv().await.expect("event channel closed");
                assert!(matches!(event, Event::IconLoaded { .. }), "unexpected event {:?}", event);
                let _ = self.shell.handle(event);
            }
        }
    }

    fn icon_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_bytes(png_bytes(50, 50, [30, 144, 255, 255]))
    }

    fn three_days() -> String {
        payload(&[
            (1699963200, 41.2, 55.8, 80.0, "light rain", "10d"),
            (1700049600, 38.0, 47.5, 65.0, "few clouds", "02d"),
            (1700136000, 30.1, 40.9, 50.0, "snow", "13d"),
        ])
    }

    #[tokio::test]
    async fn chicago_shows_three_days_from_the_top() {
        let mut harness = Harness::start().await;
        harness.mock_forecast("Chicago", three_days()).await;
        for key in ["10d", "02d", "13d"] {
            harness.mock_icon(key, icon_ok(), 1).await;
        }

        harness.shell.handle(Event::Submit(b"Chicago".to_vec()));
        assert_eq!(harness.shell.state(), ShellState::FetchInFlight);

        harness.pump_until_forecast().await;

        assert_eq!(harness.shell.state(), ShellState::DisplayingResults);
        assert_eq!(harness.shell.forecasts().len(), 3);

        let view = harness.shell.view();
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.scrolled_to, Some(0));
        assert_eq!(view.rows[0].day, "Tuesday: light rain");
        assert_eq!(view.rows[0].low, "Low: 41°F");
        assert_eq!(view.rows[0].high, "High: 56°F");
        assert_eq!(view.rows[0].humidity, "Humidity: 80%");
        assert_eq!(view.rows[1].day, "Wednesday: few clouds");
        assert_eq!(view.rows[2].day, "Thursday: snow");
        assert!(view.notices.is_empty());

        harness.pump_icons(3).await;
        assert!(harness.shell.view().rows.iter().all(|row| row.icon.is_some()));
        assert_eq!(harness.shell.presenter().cache().len(), 3);
    }

    #[tokio::test]
    async fn second_city_replaces_first() {
        let mut harness = Harness::start().await;
        harness.mock_forecast("Chicago", three_days()).await;
        harness.mock_forecast("Oslo", payload(&[
            (1699963200, 20.0, 28.0, 90.0, "snow", "13d"),
            (1700049600, 18.0, 25.0, 85.0, "snow", "13d"),
        ])).await;
        harness.mock_icon("10d", icon_ok(), 1).await;
        harness.mock_icon("02d", icon_ok(), 1).await;
        harness.mock_icon("13d", icon_ok(), 1).await;

        harness.shell.handle(Event::Submit(b"Chicago".to_vec()));
        harness.pump_until_forecast().await;
        harness.pump_icons(3).await;

        harness.shell.handle(Event::Submit(b"Oslo".to_vec()));
        harness.pump_until_forecast().await;

        assert_eq!(harness.shell.forecasts().len(), 2);
        assert!(harness.shell.forecasts().iter().all(|f| f.description == "snow"));

        let view = harness.shell.view();
        assert_eq!(view.shown, 2);
        assert_eq!(view.rows.len(), 2);
        // 13d was cached by the first request, so no further fetch happens
        assert!(view.rows.iter().all(|row| row.icon.is_some()));
        assert!(harness.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_response_keeps_previous_forecast() {
        let mut harness = Harness::start().await;
        harness.mock_forecast("Chicago", three_days()).await;
        harness.mock_forecast("Atlantis", r#"{"cod": "200", "cnt": 0}"#.to_string()).await;
        for key in ["10d", "02d", "13d"] {
            harness.mock_icon(key, icon_ok(), 1).await;
        }

        harness.shell.handle(Event::Submit(b"Chicago".to_vec()));
        harness.pump_until_forecast().await;
        harness.pump_icons(3).await;
        let before = harness.shell.forecasts().to_vec();

        harness.shell.handle(Event::Submit(b"Atlantis".to_vec()));
        harness.pump_until_forecast().await;

        assert_eq!(harness.shell.state(), ShellState::DisplayingError(ErrorKind::MalformedResponse));
        assert_eq!(harness.shell.forecasts(), before.as_slice());
        let view = harness.shell.view();
        assert_eq!(view.shown, 1);
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.notices.len(), 1);
        assert_eq!(view.notices[0].kind, ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn server_error_is_a_network_notice() {
        let mut harness = Harness::start().await;
        Mock::given(method("GET"))
            .and(path("/daily"))
            .respond_with(ResponseTemplate::new(404)
                .set_body_string(r#"{"cod": "404", "message": "city not found"}"#))
            .mount(&harness.server)
            .await;

        harness.shell.handle(Event::Submit(b"Nowhereville".to_vec()));
        harness.pump_until_forecast().await;

        assert_eq!(harness.shell.state(), ShellState::DisplayingError(ErrorKind::NetworkError));
        assert!(harness.shell.forecasts().is_empty());
        let notice = &harness.shell.view().notices[0];
        assert!(notice.detail.contains("city not found"));
    }

    #[tokio::test]
    async fn invalid_city_never_reaches_the_network() {
        let mut harness = Harness::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(three_days()))
            .expect(0)
            .mount(&harness.server)
            .await;

        harness.shell.handle(Event::Submit(vec![0xc3, 0x28]));
        assert_eq!(harness.shell.state(), ShellState::DisplayingError(ErrorKind::InvalidInput));

        harness.shell.handle(Event::Submit(b"  ".to_vec()));
        assert_eq!(harness.shell.state(), ShellState::DisplayingError(ErrorKind::InvalidInput));

        assert_eq!(harness.shell.view().notices.len(), 2);
        assert!(harness.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_icon_stays_unset_and_is_retried_later() {
        let mut harness = Harness::start().await;
        let one_day = payload(&[(1699963200, 41.0, 55.0, 80.0, "light rain", "10d")]);
        harness.mock_forecast("Chicago", one_day).await;
        // two binds, two attempts: the failure is not remembered
        harness.mock_icon("10d", ResponseTemplate::new(200).set_body_string("<html>oops</html>"), 2).await;

        harness.shell.handle(Event::Submit(b"Chicago".to_vec()));
        harness.pump_until_forecast().await;
        harness.pump_icons(1).await;

        assert!(harness.shell.view().rows[0].icon.is_none());
        assert!(harness.shell.presenter().cache().is_empty());
        assert!(harness.shell.view().notices.is_empty());

        harness.shell.handle(Event::Submit(b"Chicago".to_vec()));
        harness.pump_until_forecast().await;
        harness.pump_icons(1).await;

        assert!(harness.shell.view().rows[0].icon.is_none());
        assert!(harness.shell.presenter().cache().is_empty());
    }

    #[tokio::test]
    async fn shared_icon_is_fetched_per_row_and_fills_every_row() {
        let mut harness = Harness::start().await;
        harness.mock_forecast("Bergen", payload(&[
            (1699963200, 40.0, 45.0, 95.0, "moderate rain", "10d"),
            (1700049600, 41.0, 46.0, 96.0, "moderate rain", "10d"),
        ])).await;
        // no de-duplication of concurrent fetches for the same URL
        harness.mock_icon("10d", icon_ok(), 2).await;

        harness.shell.handle(Event::Submit(b"Bergen".to_vec()));
        harness.pump_until_forecast().await;
        harness.pump_icons(2).await;

        assert!(harness.shell.view().rows.iter().all(|row| row.icon.is_some()));
        assert_eq!(harness.shell.presenter().cache().len(), 1);
    }

    #[tokio::test]
    async fn late_completion_of_an_older_request_wins() {
        let mut harness = Harness::start().await;
        harness.mock_forecast("Oslo", payload(&[(1699963200, 20.0, 28.0, 90.0, "snow", "13d")])).await;
        Mock::given(method("GET"))
            .and(path("/daily"))
            .and(query_param("q", "Chicago"))
            .respond_with(ResponseTemplate::new(200)
                .set_body_string(three_days())
                .set_delay(std::time::Duration::from_millis(300)))
            .mount(&harness.server)
            .await;
        // icon fetches may still be running when the test ends
        for key in ["10d", "02d", "13d"] {
            harness.mock_icon(key, icon_ok(), 0..).await;
        }

        harness.shell.handle(Event::Submit(b"Chicago".to_vec()));
        harness.shell.handle(Event::Submit(b"Oslo".to_vec()));

        harness.pump_until_forecast().await;
        assert_eq!(harness.shell.forecasts().len(), 1);

        harness.pump_until_forecast().await;
        assert_eq!(harness.shell.forecasts().len(), 3);
        assert_eq!(harness.shell.view().shown, 2);
    }

    #[tokio::test]
    async fn commands_reach_the_view() {
        let mut harness = Harness::start().await;

        assert!(harness.shell.handle(Event::Command(MetaCommand::ScrollDown)).is_continue());
        assert!(harness.shell.handle(Event::Command(MetaCommand::ScrollDown)).is_continue());
        assert!(harness.shell.handle(Event::Command(MetaCommand::ScrollUp)).is_continue());
        assert!(harness.shell.handle(Event::Command(MetaCommand::Help)).is_continue());
        assert!(harness.shell.handle(Event::Command(MetaCommand::Unknown("foo".to_string()))).is_continue());
        assert!(harness.shell.handle(Event::Command(MetaCommand::Quit)).is_break());

        let view = harness.shell.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.messages.len(), 2);
        assert!(view.messages[1].contains("'foo'"));
        assert_eq!(harness.shell.state(), ShellState::Idle);
        assert!(harness.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn notice_stays_until_the_next_user_action() {
        let mut harness = Harness::start().await;
        harness.mock_forecast("Chicago", payload(&[(1699963200, 41.0, 55.0, 80.0, "light rain", "10d")])).await;
        harness.mock_icon("10d", icon_ok().set_delay(std::time::Duration::from_millis(100)), 1).await;

        harness.shell.handle(Event::Submit(b"Chicago".to_vec()));
        harness.pump_until_forecast().await;

        // the icon is still loading while the user enters a blank line
        harness.shell.handle(Event::Submit(b" ".to_vec()));
        assert!(harness.shell.view().showing_notice);

        harness.pump_icons(1).await;
        assert!(harness.shell.view().rows[0].icon.is_some());
        assert!(harness.shell.view().showing_notice);
        assert_eq!(harness.shell.view().notices[0].kind, ErrorKind::InvalidInput);

        harness.shell.handle(Event::Command(MetaCommand::ScrollDown));
        assert!(!harness.shell.view().showing_notice);
    }
}
