//! Property-Based Tests for answer evaluation and lesson walks
//!
//! Tests the following invariants:
//! - Exactly one choice of any item is correct
//! - Out-of-range choices are never correct
//! - Answering every core item correctly with unmet challenge thresholds
//!   finishes with one completed question per core item
//! - Hint reveals never exceed the item's hint list

use proptest::prelude::*;

use ax_progression::content::{GradeLevel, Item};
use ax_progression::evaluator::is_correct;
use ax_progression::session::LessonSession;

mod common;
use common::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_item() -> impl Strategy<Value = Item> {
    (2usize..=6)
        .prop_flat_map(|n| (Just(n), 0..n))
        .prop_map(|(n, correct)| {
            let mut item = item("q", correct);
            item.choices = (0..n).map(|i| i.to_string()).collect();
            item
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn exactly_one_choice_is_correct(item in arb_item()) {
        let correct = (0..item.choices.len())
            .filter(|&i| is_correct(&item, i, None))
            .count();
        prop_assert_eq!(correct, 1);
    }

    #[test]
    fn out_of_range_choice_is_wrong(item in arb_item(), extra in 0usize..100) {
        prop_assert!(!is_correct(&item, item.choices.len() + extra, None));
    }

    #[test]
    fn all_correct_walk_finishes_after_core(
        keys in prop::collection::vec(0usize..3, 1..12),
        slack in 1usize..5,
    ) {
        let items: Vec<Item> = keys
            .iter()
            .enumerate()
            .map(|(i, &key)| item(&format!("q{i}"), key))
            .collect();
        let core = items.len();
        let mut l = lesson("walk", GradeLevel::Grade1, items);
        l.challenge_sets = vec![challenge_set("never", core + slack, vec![item("c", 0)])];

        let services = services(vec![l.clone()], Vec::new());
        let mut session = LessonSession::immediate(services, l).unwrap();
        for &key in &keys {
            session.answer(key).unwrap();
        }

        prop_assert!(session.is_finished());
        prop_assert_eq!(session.completed_questions(), core);
        prop_assert_eq!(session.core_correct(), core);
    }

    #[test]
    fn hint_reveals_are_bounded(hint_count in 0usize..5, misses in 0usize..10) {
        let hints: Vec<String> = (0..hint_count).map(|i| format!("hint {i}")).collect();
        let refs: Vec<&str> = hints.iter().map(String::as_str).collect();
        let l = lesson("hints", GradeLevel::Kindergarten, vec![item_with_hints("q1", &refs)]);

        let services = services(vec![l.clone()], Vec::new());
        let mut session = LessonSession::immediate(services.clone(), l).unwrap();
        let mut last = Vec::new();
        for _ in 0..misses {
            last = session.answer(1).unwrap().revealed_hints;
        }

        prop_assert_eq!(last.len(), misses.min(hint_count));
        prop_assert_eq!(services.events.count("HINT_SHOWN"), misses.min(hint_count));
    }
}
