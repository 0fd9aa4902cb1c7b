//! Bounded-window trimming for conversation histories.

use crate::conversation::turn::{Role, Turn};

/// Default number of non-system turns retained per conversation.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Keep the leading system turn and at most `window` of the most recent other turns.
///
/// Survivors keep their relative order. Returns the number of turns dropped.
pub fn trim_history(turns: &mut Vec<Turn>, window: usize) -> usize {
    let pinned = usize::from(turns.first().is_some_and(|turn| turn.role() == Role::System));
    let rest = turns.len() - pinned;
    if rest <= window {
        return 0;
    }

    let excess = rest - window;
    turns.drain(pinned..pinned + excess);
    excess
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(pairs: usize) -> Vec<Turn> {
        let mut turns = vec![Turn::system("rules")];
        for i in 0..pairs {
            turns.push(Turn::user(format!("q{i}")));
            turns.push(Turn::assistant(format!("a{i}")));
        }
        turns
    }

    fn contents(turns: &[Turn]) -> Vec<&str> {
        turns.iter().map(Turn::content).collect()
    }

    #[test]
    fn test_under_window_is_untouched() {
        let mut turns = history(3);
        assert_eq!(trim_history(&mut turns, 20), 0);
        assert_eq!(turns.len(), 7);
    }

    #[test]
    fn test_exactly_window_is_untouched() {
        let mut turns = history(10);
        assert_eq!(trim_history(&mut turns, 20), 0);
        assert_eq!(turns.len(), 21);
    }

    #[test]
    fn test_drops_oldest_non_system_turns() {
        let mut turns = history(3);
        let dropped = trim_history(&mut turns, 4);

        assert_eq!(dropped, 2);
        assert_eq!(contents(&turns), vec!["rules", "q1", "a1", "q2", "a2"]);
    }

    #[test]
    fn test_system_turn_survives_zero_window() {
        let mut turns = history(2);
        trim_history(&mut turns, 0);

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role(), Role::System);
    }

    #[test]
    fn test_odd_overflow_keeps_most_recent() {
        let mut turns = history(2);
        turns.push(Turn::user("q2"));
        trim_history(&mut turns, 2);

        assert_eq!(contents(&turns), vec!["rules", "a1", "q2"]);
    }

    #[test]
    fn test_without_system_turn_nothing_is_pinned() {
        let mut turns = vec![Turn::user("a"), Turn::user("b"), Turn::user("c")];
        assert_eq!(trim_history(&mut turns, 2), 1);
        assert_eq!(contents(&turns), vec!["b", "c"]);
    }

    #[test]
    fn test_empty_history() {
        let mut turns = Vec::new();
        assert_eq!(trim_history(&mut turns, 0), 0);
    }
}
