use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KcliError, Result};

/// Offset reported when a search finds nothing
pub const NOT_FOUND: i64 = -1;

/// A partition of a topic together with its known offset boundaries
///
/// `start` is the oldest retained offset and `end` is one past the newest,
/// so `end - start` is the log length. `offset` is where the next read
/// begins and always satisfies `start <= offset <= end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub topic: String,
    pub partition: i32,
    pub start: i64,
    pub end: i64,
    pub offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Partition {
    /// Creates a partition positioned at its oldest offset
    pub fn new(topic: impl Into<String>, partition: i32, start: i64, end: i64) -> Self {
        let start = start.max(0);
        let end = end.max(start);
        Self {
            topic: topic.into(),
            partition,
            start,
            end,
            offset: start,
            filter: None,
        }
    }

    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of offsets between the read cursor and the end of the log
    pub fn remaining(&self) -> i64 {
        self.end - self.offset
    }

    /// Offset of the newest record, if there is one
    pub fn last_offset(&self) -> Option<i64> {
        (!self.is_empty()).then_some(self.end - 1)
    }

    /// Moves the cursor to an absolute offset inside `[start, end)`
    pub fn seek(&mut self, offset: i64) -> Result<()> {
        if offset < self.start || offset >= self.end {
            return Err(KcliError::InvalidOffset {
                offset,
                start: self.start,
                end: self.end,
            });
        }
        self.offset = offset;
        Ok(())
    }

    /// Resolves a relative position into an absolute offset.
    ///
    /// Non negative values count from `start` and are clamped to the newest
    /// record, negative values count back from `end` and are clamped to
    /// `start`.
    pub fn resolve(&self, n: i64) -> Result<i64> {
        let Some(last) = self.last_offset() else {
            return Err(KcliError::InvalidOffset {
                offset: n,
                start: self.start,
                end: self.end,
            });
        };

        let offset = if n >= 0 {
            self.start.saturating_add(n).min(last)
        } else {
            self.end.saturating_add(n).max(self.start)
        };
        Ok(offset)
    }

    /// Copy of this partition positioned at `offset`, clamped into bounds
    pub fn at(&self, offset: i64) -> Self {
        Self {
            offset: offset.clamp(self.start, self.end),
            ..self.clone()
        }
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|term| !term.is_empty());
        self
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

/// A single decoded record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The partition, positioned at this message
    pub partition: Partition,
    #[serde(rename = "msg")]
    pub value: Vec<u8>,
    pub offset: i64,
}

impl Message {
    pub fn value_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Outcome of searching one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub partition: Partition,
    pub offset: Option<i64>,
}

impl SearchResult {
    pub fn is_found(&self) -> bool {
        self.offset.is_some()
    }

    /// The matched offset, or [`NOT_FOUND`]
    pub fn offset_or_sentinel(&self) -> i64 {
        self.offset.unwrap_or(NOT_FOUND)
    }

    /// The partition positioned at the match
    pub fn into_positioned(self) -> Option<Partition> {
        let offset = self.offset?;
        Some(self.partition.at(offset))
    }
}
