use std::collections::BTreeMap;

/// Maximum number of guesses kept in the ranked history.
pub const MAX_HISTORY: usize = 15;
/// Score that means the guess is the target.
pub const WINNING_SCORE: u8 = 100;

/// Breakdown keys that are bookkeeping rather than contributing factors.
const HIDDEN_FACTORS: [&str; 2] = ["total", "shared_seasons_detail"];

/// A scored guess.
#[derive(Clone, Debug, PartialEq)]
pub struct GuessResult {
    pub matched_name: String,
    pub score: u8,
    pub breakdown: BTreeMap<String, f64>,
}

impl GuessResult {
    pub fn new(matched_name: impl Into<String>, score: u8) -> Self {
        Self {
            matched_name: matched_name.into(),
            score,
            breakdown: BTreeMap::new(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.score == WINNING_SCORE
    }

    /// Breakdown entries worth showing: positive and not bookkeeping.
    pub fn contributing_factors(&self) -> impl Iterator<Item = (&str, f64)> {
        self.breakdown
            .iter()
            .filter(|(key, value)| **value > 0.0 && !HIDDEN_FACTORS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), *value))
    }
}

#[derive(Debug, PartialEq)]
pub enum Insertion {
    Inserted,
    Duplicate,
}

/// Guesses ranked by score, best first, capped at [`MAX_HISTORY`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    entries: Vec<GuessResult>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, matched_name: &str) -> bool {
        self.entries.iter().any(|e| e.matched_name == matched_name)
    }

    /// Insert a result unless its `matched_name` is already present.
    ///
    /// Ties keep insertion order; entries ranked past the cap are dropped.
    pub fn insert(&mut self, result: GuessResult) -> Insertion {
        if self.contains(&result.matched_name) {
            return Insertion::Duplicate;
        }
        self.entries.push(result);
        // sort_by is stable
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_HISTORY);
        Insertion::Inserted
    }

    pub fn entries(&self) -> &[GuessResult] {
        &self.entries
    }

    pub fn best(&self) -> Option<&GuessResult> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_ranked(history: &History) -> bool {
        history.entries().windows(2).all(|w| w[0].score >= w[1].score)
    }

    #[test]
    fn test_insert_keeps_descending_order() {
        let mut history = History::new();
        history.insert(GuessResult::new("Stephen Curry", 42));
        history.insert(GuessResult::new("James Harden", 91));
        history.insert(GuessResult::new("Chris Paul", 10));

        let names: Vec<_> = history.entries().iter().map(|e| e.matched_name.as_str()).collect();
        assert_eq!(names, vec!["James Harden", "Stephen Curry", "Chris Paul"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut history = History::new();
        history.insert(GuessResult::new("First", 50));
        history.insert(GuessResult::new("Second", 50));
        history.insert(GuessResult::new("Top", 70));
        history.insert(GuessResult::new("Third", 50));

        let names: Vec<_> = history.entries().iter().map(|e| e.matched_name.as_str()).collect();
        assert_eq!(names, vec!["Top", "First", "Second", "Third"]);
    }

    #[test]
    fn test_duplicate_rejected_case_sensitive() {
        let mut history = History::new();
        assert_eq!(history.insert(GuessResult::new("Kevin Durant", 40)), Insertion::Inserted);
        assert_eq!(history.insert(GuessResult::new("Kevin Durant", 40)), Insertion::Duplicate);
        assert_eq!(history.insert(GuessResult::new("kevin durant", 40)), Insertion::Inserted);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_truncates_to_top_fifteen() {
        let mut history = History::new();
        for i in 0..30u8 {
            history.insert(GuessResult::new(format!("Player {i}"), (i * 7) % 100));
            assert!(history.len() <= MAX_HISTORY);
            assert!(is_ranked(&history));
        }
        assert_eq!(history.len(), MAX_HISTORY);

        // A low score does not displace anything once full.
        history.insert(GuessResult::new("Bench Warmer", 0));
        assert!(!history.contains("Bench Warmer"));
    }

    #[test]
    fn test_overflow_drops_lowest_regardless_of_recency() {
        let mut history = History::new();
        for i in 0..MAX_HISTORY {
            history.insert(GuessResult::new(format!("Old {i}"), 50));
        }
        history.insert(GuessResult::new("Newcomer", 60));
        assert_eq!(history.best().unwrap().matched_name, "Newcomer");
        assert!(!history.contains("Old 14"));
        assert!(history.contains("Old 0"));
    }

    #[test]
    fn test_contributing_factors_skip_hidden_and_zero() {
        let mut result = GuessResult::new("Kevin Durant", 62);
        result.breakdown.insert("total".to_string(), 62.0);
        result.breakdown.insert("shared_teams".to_string(), 20.0);
        result.breakdown.insert("position_match".to_string(), 0.0);
        result.breakdown.insert("shared_seasons_detail".to_string(), 3.0);

        let factors: Vec<_> = result.contributing_factors().collect();
        assert_eq!(factors, vec![("shared_teams", 20.0)]);
    }

    #[test]
    fn test_win_detection() {
        assert!(GuessResult::new("Kevin Durant", WINNING_SCORE).is_win());
        assert!(!GuessResult::new("Kevin Durant", 99).is_win());
    }
}
