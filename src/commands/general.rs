use super::{Event, EventSender};
use log::*;
use std::io::BufRead;

pub const COMMAND_PREFIX: u8 = b'!';

pub const HELP: &str = "\
Type the name of a city to load its daily forecast.
  !up / !down   scroll the list by one page
  !help         show this overview
  !quit         leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Quit,
    ScrollUp,
    ScrollDown,
    Unknown(String),
}

/// Interprets one line of user input. Lines starting with `!` are commands, anything else is a city.
pub fn parse_input(mut line: Vec<u8>) -> Event {
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }

    if line.first() != Some(&COMMAND_PREFIX) {
        return Event::Submit(line);
    }

    let name = String::from_utf8_lossy(&line[1..]).trim().to_lowercase();
    let command = match name.as_str() {
        "help" | "h" | "?" => MetaCommand::Help,
        "quit" | "exit" | "q" => MetaCommand::Quit,
        "up" | "u" => MetaCommand::ScrollUp,
        "down" | "d" => MetaCommand::ScrollDown,
        _ => MetaCommand::Unknown(name),
    };
    Event::Command(command)
}

/// Forwards input lines to the shell until the input ends, then asks it to quit.
///
/// Reads with blocking I/O, so it gets a thread of its own instead of a runtime worker.
pub fn read_input<R: BufRead>(mut input: R, events: EventSender) {
    loop {
        let mut line = Vec::new();
        match input.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if events.send(parse_input(line)).is_err() {
                    // shell is gone
                    return;
                }
            },
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            },
        }
    }

    debug!("Input closed");
    let _ = events.send(Event::Command(MetaCommand::Quit));
}
