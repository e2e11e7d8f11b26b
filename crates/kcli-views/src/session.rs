use std::io::Write;
use std::str::FromStr;

use async_channel::{Receiver, Sender, unbounded};
use fluvio_future::task::spawn;
use tracing::{debug, info, warn};

use crate::error::{NavError, Result};
use crate::stack::{Prepared, Stack};

const PROGRESS_EVERY: i64 = 500;

pub const HELP: &str = "\
N | enter N     open row N of the current page
esc             back to the previous view
n / p           next / previous page
j N             jump to offset N (negative counts from the end)
/term | s term  search, an empty term repeats the last search
S term          search a topic, stop at the first match
f [term]        only show messages containing term
F               clear the filter
o N             start every partition of a topic at offset N
d               dump the current view
rows N          page height
h               this help
q               quit";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{command} expects a number, got '{value}'")]
    NotANumber { command: String, value: String },
}

/// A single line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Enter(usize),
    Escape,
    NextPage,
    PrevPage,
    Jump(i64),
    Search {
        term: String,
        first_result_only: bool,
    },
    Filter(String),
    ClearFilter,
    Offset(i64),
    Dump,
    Resize(usize),
    Help,
    Quit,
}

fn number<T: FromStr>(command: &str, value: &str) -> Result<T, CommandError> {
    value.trim().parse().map_err(|_| CommandError::NotANumber {
        command: command.to_owned(),
        value: value.trim().to_owned(),
    })
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if let Some(term) = line.strip_prefix('/') {
            return Ok(Self::Search {
                term: term.trim().to_owned(),
                first_result_only: false,
            });
        }

        let (command, arg) = line
            .split_once(char::is_whitespace)
            .map(|(command, arg)| (command, arg.trim()))
            .unwrap_or((line, ""));

        let parsed = match (command, arg) {
            ("", _) => Self::Show,
            ("esc", "") => Self::Escape,
            ("n", "") => Self::NextPage,
            ("p", "") => Self::PrevPage,
            ("enter", value) => Self::Enter(number(command, value)?),
            ("j", value) => Self::Jump(number(command, value)?),
            ("o", value) => Self::Offset(number(command, value)?),
            ("rows", value) => Self::Resize(number(command, value)?),
            ("s", term) => Self::Search {
                term: term.to_owned(),
                first_result_only: false,
            },
            ("S", term) => Self::Search {
                term: term.to_owned(),
                first_result_only: true,
            },
            ("f", term) => Self::Filter(term.to_owned()),
            ("F", "") => Self::ClearFilter,
            ("d", "") => Self::Dump,
            ("h", "") => Self::Help,
            ("q", "") => Self::Quit,
            (value, "") if value.bytes().all(|b| b.is_ascii_digit()) => {
                Self::Enter(number("enter", value)?)
            }
            _ => return Err(CommandError::Unknown(line.to_owned())),
        };
        Ok(parsed)
    }
}

/// Input of the session loop
#[derive(Debug)]
pub enum Event {
    Command(Command),
    Searched(Result<Prepared>),
    /// Shown in the footer on the next render
    Flash(String),
}

/// Owns the stack and applies commands and search results to it, one at a time
pub struct Session<W> {
    stack: Stack,
    out: W,
    events_tx: Sender<Event>,
    events: Receiver<Event>,
    flash_tx: Sender<String>,
    flash: Receiver<String>,
}

impl<W: Write + Send> Session<W> {
    pub fn new(stack: Stack, out: W) -> Self {
        let (events_tx, events) = unbounded();
        let (flash_tx, flash) = unbounded();
        Self {
            stack,
            out,
            events_tx,
            events,
            flash_tx,
            flash,
        }
    }

    /// Where the front end sends its commands
    pub fn sender(&self) -> Sender<Event> {
        self.events_tx.clone()
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    fn flash(&self, message: impl Into<String>) {
        // the receiver lives as long as the session
        let _ = self.flash_tx.try_send(message.into());
    }

    /// Most recent flash message, older ones are discarded
    pub fn take_flash(&self) -> Option<String> {
        let mut latest = None;
        while let Ok(message) = self.flash.try_recv() {
            latest = Some(message);
        }
        latest
    }

    /// Processes events until the user quits
    pub async fn run(mut self) -> Result<()> {
        self.render()?;
        while self.step().await? {
            self.render()?;
        }
        info!("session closed");
        Ok(())
    }

    /// Waits for one event and handles it, `false` once the session is over
    pub async fn step(&mut self) -> Result<bool> {
        let Ok(event) = self.events.recv().await else {
            return Ok(false);
        };
        match event {
            Event::Command(Command::Quit) => Ok(false),
            Event::Command(command) => {
                self.handle(command).await?;
                Ok(true)
            }
            Event::Searched(result) => {
                let applied = result.and_then(|prepared| self.stack.apply(prepared));
                self.report(applied)?;
                Ok(true)
            }
            Event::Flash(message) => {
                self.flash(message);
                Ok(true)
            }
        }
    }

    /// Runs one command against the stack.
    ///
    /// Only fatal errors are returned, everything else becomes a flash message.
    pub async fn handle(&mut self, command: Command) -> Result<()> {
        debug!(?command, "handling");
        let result = match command {
            Command::Show | Command::Quit => Ok(()),
            Command::Enter(row) => self.stack.enter(row).await,
            Command::Escape => {
                self.stack.escape();
                Ok(())
            }
            Command::NextPage => self.stack.page(1).await,
            Command::PrevPage => self.stack.page(-1).await,
            Command::Jump(n) => self.stack.jump(n).await,
            Command::Search {
                term,
                first_result_only,
            } => {
                self.start_search(&term, first_result_only);
                Ok(())
            }
            Command::Filter(term) => self.stack.filter(&term).await,
            Command::ClearFilter => self.stack.clear_filter().await,
            Command::Offset(n) => self.stack.set_offset(n).await,
            Command::Dump => self.stack.dump(&mut self.out).await,
            Command::Resize(height) => {
                self.stack.resize(height);
                Ok(())
            }
            Command::Help => writeln!(self.out, "{HELP}").map_err(NavError::from),
        };
        self.report(result)
    }

    fn report(&self, result: Result<()>) -> Result<()> {
        match result {
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(%err, "command failed");
                self.flash(err.to_string());
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Runs the search on its own task, the result comes back as an [`Event::Searched`]
    fn start_search(&self, term: &str, first_result_only: bool) {
        let Some(job) = self.stack.prepare_search(term, first_result_only) else {
            self.flash("nothing to search");
            return;
        };

        self.flash(format!("searching for {}", job.term()));
        let client = self.stack.client().clone();
        let events = self.events_tx.clone();
        let flash = self.flash_tx.clone();
        spawn(async move {
            let result = job
                .run(&client, |done, total| {
                    if done == total || done % PROGRESS_EVERY == 0 {
                        let _ = flash.try_send(format!("searching {done}/{total}"));
                    }
                })
                .await;
            // session already gone
            let _ = events.send(Event::Searched(result)).await;
        });
    }

    /// Draws the current window
    pub fn render(&mut self) -> Result<()> {
        let page = self.stack.top().page();
        let cursor = self.stack.cursor();
        writeln!(self.out, "{}", self.stack.header())?;
        for (i, row) in self.stack.rows().iter().enumerate() {
            let marker = if i == cursor { '>' } else { ' ' };
            writeln!(self.out, "{marker}{i:>3} {}", row.value)?;
        }

        let mut footer = format!(
            "-- {} page {}/{} --",
            self.stack.top().name(),
            page.window() + 1,
            page.windows().max(1)
        );
        if let Some(message) = self.take_flash() {
            footer.push(' ');
            footer.push_str(&message);
        }
        writeln!(self.out, "{footer}")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let parse = |line: &str| line.parse::<Command>();

        assert_eq!(parse("3"), Ok(Command::Enter(3)));
        assert_eq!(parse("enter 12"), Ok(Command::Enter(12)));
        assert_eq!(parse(" esc "), Ok(Command::Escape));
        assert_eq!(parse("j -100"), Ok(Command::Jump(-100)));
        assert_eq!(parse("o 40"), Ok(Command::Offset(40)));
        assert_eq!(parse("rows 5"), Ok(Command::Resize(5)));
        assert_eq!(parse("f"), Ok(Command::Filter(String::new())));
        assert_eq!(parse("F"), Ok(Command::ClearFilter));
        assert_eq!(parse(""), Ok(Command::Show));
    }

    #[test]
    fn test_parse_search_commands() {
        assert_eq!(
            "/bob smith".parse::<Command>(),
            Ok(Command::Search {
                term: "bob smith".to_owned(),
                first_result_only: false
            })
        );
        assert_eq!(
            "S bob".parse::<Command>(),
            Ok(Command::Search {
                term: "bob".to_owned(),
                first_result_only: true
            })
        );
        assert_eq!(
            "s".parse::<Command>(),
            Ok(Command::Search {
                term: String::new(),
                first_result_only: false
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "j ten".parse::<Command>(),
            Err(CommandError::NotANumber { .. })
        ));
        assert!(matches!(
            "launch".parse::<Command>(),
            Err(CommandError::Unknown(_))
        ));
    }
}
