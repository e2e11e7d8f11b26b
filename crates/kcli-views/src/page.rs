use kcli_client::{Message, Partition};

/// What a row leads to when it is entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTarget {
    Topic(String),
    Partition(Partition),
    Message(Message),
    Line,
}

/// A display line together with the item it was rendered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub value: String,
    pub target: RowTarget,
}

impl Row {
    pub fn new(value: impl Into<String>, target: RowTarget) -> Self {
        Self {
            value: value.into(),
            target,
        }
    }
}

/// Rows fetched so far, split into windows of `height` rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    windows: Vec<Vec<Row>>,
    window: usize,
    cursor: usize,
    height: usize,
    entered_at: Option<usize>,
    pub(crate) search: Option<String>,
}

impl Page {
    pub fn new(rows: Vec<Row>, height: usize) -> Self {
        let height = height.max(1);
        Self {
            windows: split(rows, height),
            height,
            ..Default::default()
        }
    }

    pub(crate) fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search;
        self
    }

    /// Rows of the current window
    pub fn rows(&self) -> &[Row] {
        self.windows
            .get(self.window)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn all_rows(&self) -> impl Iterator<Item = &Row> {
        self.windows.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.windows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn windows(&self) -> usize {
        self.windows.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.windows.first().and_then(|rows| rows.first())
    }

    pub fn last_row(&self) -> Option<&Row> {
        self.windows.last().and_then(|rows| rows.last())
    }

    /// Row under the cursor
    pub fn current_row(&self) -> Option<&Row> {
        self.rows().get(self.cursor)
    }

    /// Row `row` of the current window
    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows().get(row)
    }

    /// Moves the cursor inside the current window
    pub fn select(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.rows().len().saturating_sub(1));
    }

    /// Index of `row` of the current window among all rows
    fn absolute(&self, row: usize) -> usize {
        self.windows[..self.window].iter().map(Vec::len).sum::<usize>() + row
    }

    /// Shows the window holding the row with absolute index `index`
    pub fn focus(&mut self, index: usize) -> bool {
        let mut skipped = 0;
        for (window, rows) in self.windows.iter().enumerate() {
            if index < skipped + rows.len() {
                self.window = window;
                self.cursor = index - skipped;
                return true;
            }
            skipped += rows.len();
        }
        false
    }

    pub(crate) fn mark_entered(&mut self, row: usize) {
        self.cursor = row;
        self.entered_at = Some(self.absolute(row));
    }

    /// Puts the cursor back on the row that was last entered
    pub(crate) fn restore_entered(&mut self) {
        if let Some(index) = self.entered_at.take() {
            self.focus(index);
        }
    }

    pub(crate) fn forward(&mut self) -> bool {
        if self.window + 1 >= self.windows.len() {
            return false;
        }
        self.window += 1;
        self.select(self.cursor);
        true
    }

    pub(crate) fn back(&mut self) -> bool {
        if self.window == 0 {
            return false;
        }
        self.window -= 1;
        self.select(self.cursor);
        true
    }

    /// Appends a freshly fetched window and shows it
    pub(crate) fn push_window(&mut self, rows: Vec<Row>) {
        if rows.is_empty() {
            return;
        }
        self.windows.push(rows);
        self.window = self.windows.len() - 1;
        self.select(self.cursor);
    }

    /// Re-windows every row for a new height, back at the first window
    pub fn resize(&mut self, height: usize) {
        let height = height.max(1);
        let rows = std::mem::take(&mut self.windows)
            .into_iter()
            .flatten()
            .collect();
        self.windows = split(rows, height);
        self.height = height;
        self.window = 0;
        self.cursor = 0;
    }

    pub(crate) fn replace_rows(&mut self, rows: impl IntoIterator<Item = Row>) {
        let rows = rows.into_iter().collect();
        self.windows = split(rows, self.height);
        if self.window >= self.windows.len() {
            self.window = self.windows.len().saturating_sub(1);
        }
        self.select(self.cursor);
    }
}

pub fn split(rows: Vec<Row>, size: usize) -> Vec<Vec<Row>> {
    let size = size.max(1);
    let mut windows = Vec::with_capacity(rows.len().div_ceil(size));
    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        windows.push(rows.by_ref().take(size).collect());
    }
    windows
}
