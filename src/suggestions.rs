//! Autocomplete for the guess input.
//!
//! [`SuggestionEngine`] owns the typed text, the suggestion list and the
//! highlighted entry. It is driven by the session controller; keyboard and
//! pointer events come in as [`NavKey`]s and [`SuggestionEngine::commit_at`].

use crate::debug_log;
use std::time::{Duration, Instant};

pub const MAX_SUGGESTIONS: usize = 8;
/// How long a focus loss waits before closing the panel, so a pointer commit
/// that triggered the blur can land first.
pub const BLUR_GRACE: Duration = Duration::from_millis(150);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Enter,
    Escape,
}

/// What the caller should do after a key was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// State changed (or nothing happened); nothing else to do.
    Handled,
    /// A suggestion replaced the input text.
    Accepted(String),
    /// Submit the typed text as a guess.
    Submit(String),
}

/// Up to [`MAX_SUGGESTIONS`] roster names containing `input`, ignoring case.
///
/// Names containing `?` are placeholders and never suggested.
pub fn filter_suggestions(roster: &[String], input: &str) -> Vec<String> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    roster
        .iter()
        .filter(|name| !name.contains('?') && name.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
pub struct SuggestionEngine {
    input: String,
    suggestions: Vec<String>,
    /// `None` means nothing is highlighted.
    selected: Option<usize>,
    open: bool,
    close_deadline: Option<Instant>,
}

impl SuggestionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn navigable(&self) -> bool {
        self.open && !self.suggestions.is_empty()
    }

    /// Replace the input text and recompute suggestions.
    pub fn set_input(&mut self, text: &str, roster: &[String]) {
        self.input = text.to_string();
        self.selected = None;
        self.close_deadline = None;

        if text.trim().is_empty() {
            self.suggestions.clear();
            self.open = false;
        } else {
            self.suggestions = filter_suggestions(roster, text);
            self.open = true;
        }
        debug_log!(
            "set_input('{}') -> {} suggestions",
            self.input,
            self.suggestions.len()
        );
    }

    /// Close the panel and drop the list, keeping the input text.
    pub fn close(&mut self) {
        self.suggestions.clear();
        self.selected = None;
        self.open = false;
        self.close_deadline = None;
    }

    /// Clear everything, including the input text.
    pub fn reset(&mut self) {
        self.input.clear();
        self.close();
    }

    pub fn handle_key(&mut self, key: NavKey) -> KeyOutcome {
        if key == NavKey::Escape {
            self.close();
            return KeyOutcome::Handled;
        }
        if !self.navigable() {
            return match key {
                NavKey::Enter => KeyOutcome::Submit(self.input.clone()),
                _ => KeyOutcome::Handled,
            };
        }

        let count = self.suggestions.len();
        match key {
            NavKey::Down => {
                self.selected = Some(self.selected.map_or(0, |i| (i + 1) % count));
                KeyOutcome::Handled
            }
            NavKey::Up => {
                self.selected = Some(match self.selected {
                    None | Some(0) => count - 1,
                    Some(i) => i - 1,
                });
                KeyOutcome::Handled
            }
            NavKey::Escape => KeyOutcome::Handled,
            NavKey::Enter => match self.selected {
                Some(index) => self.accept(index),
                None => KeyOutcome::Submit(self.input.clone()),
            },
        }
    }

    /// Pointer selection of the suggestion at `index`.
    ///
    /// Behaves like Enter with `index` highlighted and cancels a pending
    /// blur-close.
    pub fn commit_at(&mut self, index: usize) -> KeyOutcome {
        self.close_deadline = None;
        if index >= self.suggestions.len() {
            return KeyOutcome::Handled;
        }
        self.accept(index)
    }

    fn accept(&mut self, index: usize) -> KeyOutcome {
        let name = self.suggestions[index].clone();
        self.input.clone_from(&name);
        self.close();
        KeyOutcome::Accepted(name)
    }

    /// The input lost focus; close after [`BLUR_GRACE`].
    pub fn blur(&mut self, now: Instant) {
        if self.open {
            self.close_deadline = Some(now + BLUR_GRACE);
        }
    }

    /// Apply a deferred blur-close whose deadline has passed.
    ///
    /// Returns `true` when the panel was closed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.close_deadline {
            Some(deadline) if now >= deadline => {
                self.close();
                true
            }
            _ => false,
        }
    }
}
