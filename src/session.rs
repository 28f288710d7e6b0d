// src/session.rs

/// Transient UI selections: the current label and the highlighted sample.
/// Derived from disk listings and never authoritative; operations take this
/// state explicitly instead of reaching into the display layer.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub current_label: Option<String>,
    pub samples: Vec<String>,
    pub selected: Option<usize>,
}

impl SessionState {
    pub fn select_label(&mut self, label: Option<String>) {
        self.current_label = label;
        self.samples.clear();
        self.selected = None;
    }

    /// Replaces the sample listing, clamping any existing selection back into
    /// bounds.
    pub fn set_samples(&mut self, samples: Vec<String>) {
        self.selected = match self.selected {
            Some(index) if !samples.is_empty() => Some(index.min(samples.len() - 1)),
            _ => None,
        };
        self.samples = samples;
    }

    pub fn select(&mut self, index: usize) {
        self.selected = (index < self.samples.len()).then_some(index);
    }

    /// Samples are listed newest first, so the newest is index 0.
    pub fn select_newest(&mut self) {
        self.selected = (!self.samples.is_empty()).then_some(0);
    }

    pub fn selected_sample(&self) -> Option<&str> {
        self.selected
            .and_then(|index| self.samples.get(index))
            .map(String::as_str)
    }

    /// Selection to restore after deleting `deleted` from a listing now
    /// `new_len` long: the item that moved up into the slot keeps the index,
    /// and deleting the last item falls back to the one above it.
    pub fn next_selection_after_delete(deleted: usize, new_len: usize) -> Option<usize> {
        if new_len == 0 {
            None
        } else {
            Some(deleted.min(new_len - 1))
        }
    }
}
