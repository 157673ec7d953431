use super::{ForecastRow, ForecastView, Notice};
use crate::sources::icons::Icon;
use log::*;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Layout, Position};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::sync::Arc;

const PROMPT: &str = "City> ";
const PLACEHOLDER: &str = "..";
const ICON_BLOCK: &str = "██";

/// Text below the list. Stays on screen until the next user action clears it.
struct Message {
    text: String,
    style: Style,
}

/// Draws the forecast list as a page of rows, redrawn on every change.
///
/// Loaded icons are drawn as a block in their average colour, rows still waiting for their
/// icon show a placeholder.
pub struct TerminalView<B: Backend> {
    terminal: Terminal<B>,
    rows: Vec<ForecastRow>,
    list: ListState,
    height: usize,
    message: Option<Message>,
}

impl TerminalView<CrosstermBackend<io::Stdout>> {
    pub fn stdout(height: usize) -> io::Result<Self> {
        TerminalView::new(CrosstermBackend::new(io::stdout()), height)
    }
}

impl<B: Backend> TerminalView<B> {
    pub fn new(backend: B, height: usize) -> io::Result<Self> {
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        Ok(TerminalView {
            terminal,
            rows: Vec::new(),
            list: ListState::default(),
            height: height.max(1),
            message: None,
        })
    }

    fn max_offset(&self) -> usize {
        self.rows.len().saturating_sub(self.height)
    }

    fn set_offset(&mut self, offset: usize) {
        *self.list.offset_mut() = offset.min(self.max_offset());
    }

    fn redraw(&mut self) {
        let TerminalView { terminal, rows, list, height, message } = self;

        if let Err(e) = terminal.draw(|frame| render(frame, rows, list, *height, message.as_ref())) {
            warn!("Failed to draw forecast list: {}", e);
        }
    }
}

fn render(frame: &mut Frame, rows: &[ForecastRow], list: &mut ListState, height: usize, message: Option<&Message>) {
    let list_height = u16::try_from(height).unwrap_or(u16::MAX);
    let [title_area, list_area, message_area, prompt_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(list_height),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let title = if rows.is_empty() {
        "No forecast loaded. Type a city name, or !help.".to_string()
    } else {
        let end = (list.offset() + height).min(rows.len());
        format!("Days {}-{} of {}", list.offset() + 1, end, rows.len())
    };
    frame.render_widget(Paragraph::new(title).style(Style::default().add_modifier(Modifier::BOLD)), title_area);

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            ListItem::new(Line::from(vec![
                icon_cell(row.icon.as_deref()),
                Span::raw(" "),
                Span::raw(format!("{:<32} {:<12} {:<12} {}", row.day, row.low, row.high, row.humidity)),
            ]))
        })
        .collect();
    frame.render_stateful_widget(List::new(items), list_area, list);

    if let Some(message) = message {
        let paragraph = Paragraph::new(message.text.as_str())
            .style(message.style)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, message_area);
    }

    frame.render_widget(Paragraph::new(PROMPT), prompt_area);
    frame.set_cursor_position(Position::new(prompt_area.x + PROMPT.len() as u16, prompt_area.y));
}

fn icon_cell(icon: Option<&Icon>) -> Span<'static> {
    match icon.map(Icon::average_color) {
        None => Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)),
        Some(Some([r, g, b])) => Span::styled(ICON_BLOCK, Style::default().fg(Color::Rgb(r, g, b))),
        // fully transparent image
        Some(None) => Span::raw(ICON_BLOCK),
    }
}

impl<B: Backend> ForecastView for TerminalView<B> {
    fn show_rows(&mut self, rows: Vec<ForecastRow>) {
        self.rows = rows;
        self.set_offset(self.list.offset());
        self.redraw();
    }

    fn scroll_to(&mut self, index: usize) {
        self.set_offset(index);
        self.redraw();
    }

    fn scroll_pages(&mut self, pages: isize) {
        let target = self.list.offset() as isize + pages * self.height as isize;
        self.set_offset(target.max(0) as usize);
        self.redraw();
    }

    fn set_icon(&mut self, index: usize, icon: Arc<Icon>) {
        if let Some(row) = self.rows.get_mut(index) {
            debug!("Icon {} ready for row {}", row.icon_url, index);
            row.icon = Some(icon);
            self.redraw();
        }
    }

    fn show_notice(&mut self, notice: &Notice) {
        self.message = Some(Message { text: notice.to_string(), style: Style::default().fg(Color::Red) });
        self.redraw();
    }

    fn show_message(&mut self, message: &str) {
        self.message = Some(Message { text: message.to_string(), style: Style::default() });
        self.redraw();
    }

    fn clear_notice(&mut self) {
        self.message = None;
        // the echoed input line is not part of ratatui's buffer, so repaint everything
        if let Err(e) = self.terminal.clear() {
            warn!("Failed to clear the terminal: {}", e);
        }
        self.redraw();
    }
}
