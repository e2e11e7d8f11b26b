use std::io::BufRead;
use std::thread::{self, JoinHandle};

use async_channel::Sender;
use tracing::debug;

use kcli_views::{Command, Event};

/// Reads commands from stdin on a dedicated thread
pub fn spawn_stdin(events: Sender<Event>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        read_commands(stdin.lock(), &events);
    })
}

/// Forwards one command per line until the input ends or the user quits.
///
/// Lines that do not parse are reported back as flash messages. The end
/// of the input counts as a quit.
pub fn read_commands(input: impl BufRead, events: &Sender<Event>) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };

        let event = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => Event::Command(command),
            Err(err) => Event::Flash(err.to_string()),
        };
        if events.send_blocking(event).is_err() {
            debug!("session gone, stop reading input");
            return;
        }
    }
    let _ = events.send_blocking(Event::Command(Command::Quit));
}
