//! Navigation over topics, partitions and messages.
//!
//! A [`Stack`] of [`Feeder`]s holds one level per view, from the topic list
//! down to a single message body. A [`Session`] owns the stack and feeds it
//! commands and background search results.

mod error;
mod feeder;
mod format;
mod page;
mod session;
mod stack;

pub use error::{NavError, Result};
pub use feeder::{Feeder, MessageFeeder, PartitionFeeder, TopicFeeder, TopicsFeeder};
pub use format::body_lines;
pub use page::{Page, Row, RowTarget};
pub use session::{Command, CommandError, Event, HELP, Session};
pub use stack::{Prepared, SearchJob, Stack};
