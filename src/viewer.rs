use crate::photo::GeneratedPhoto;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    #[error("There are no generated portraits to show")]
    EmptyResultSet,
}

/// Read-only cursor over the results of one generation run.
#[derive(Debug, Clone, Default)]
pub struct ResultViewer {
    results: Vec<GeneratedPhoto>,
    cursor: usize,
}

impl ResultViewer {
    pub fn new(results: Vec<GeneratedPhoto>) -> Self {
        Self { results, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn index(&self) -> usize {
        self.cursor
    }

    pub fn results(&self) -> &[GeneratedPhoto] {
        &self.results
    }

    pub fn current(&self) -> Result<&GeneratedPhoto, ViewerError> {
        self.results
            .get(self.cursor)
            .ok_or(ViewerError::EmptyResultSet)
    }

    /// Clamped at the last result.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.results.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Clamped at the first result.
    pub fn previous(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.results.len()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    /// One-based "2 / 3" label.
    pub fn position_label(&self) -> String {
        if self.results.is_empty() {
            "0 / 0".to_string()
        } else {
            format!("{} / {}", self.cursor + 1, self.results.len())
        }
    }
}
