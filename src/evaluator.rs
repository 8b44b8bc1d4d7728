//! Answer evaluation
//!
//! Pure checks of a selected choice against an item's answer key.

use crate::content::Item;

/// Whether `choice_index` is the right answer for `item`.
///
/// With a `step_index` on a multi-step item the step's key is used and the
/// item's own key is ignored. Out-of-range choices are simply wrong.
pub fn is_correct(item: &Item, choice_index: usize, step_index: Option<usize>) -> bool {
    match correct_choice(item, step_index) {
        Some((correct, count)) => choice_index < count && choice_index == correct,
        None => false,
    }
}

/// The correct index and choice count that apply, or `None` when a step
/// was requested that the item does not have.
fn correct_choice(item: &Item, step_index: Option<usize>) -> Option<(usize, usize)> {
    match step_index {
        Some(step) if item.has_steps() => item
            .step(step)
            .map(|step| (step.correct_index, step.choices.len())),
        _ => Some((item.correct_index, item.choices.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{InteractionKind, Step};

    fn item_with_steps() -> Item {
        Item {
            id: "wp".into(),
            prompt: "Mia has 2 coins and finds 3 more".into(),
            choices: vec!["4".into(), "5".into(), "6".into()],
            correct_index: 1,
            steps: vec![
                Step {
                    prompt: "How many coins first?".into(),
                    choices: vec!["2".into(), "3".into()],
                    correct_index: 0,
                    hint: None,
                },
                Step {
                    prompt: "How many altogether?".into(),
                    choices: vec!["4".into(), "5".into()],
                    correct_index: 1,
                    hint: None,
                },
            ],
            hints: Vec::new(),
            voice_prompt: None,
            tactile_guidance: None,
            kind: InteractionKind::WordProblem,
        }
    }

    #[test]
    fn step_key_overrides_item_key() {
        let item = item_with_steps();
        assert!(is_correct(&item, 0, Some(0)));
        assert!(!is_correct(&item, 1, Some(0)));
        assert!(is_correct(&item, 1, Some(1)));
        assert!(is_correct(&item, 1, None));
    }

    #[test]
    fn out_of_range_is_incorrect() {
        let item = item_with_steps();
        assert!(!is_correct(&item, 7, None));
        assert!(!is_correct(&item, 2, Some(0)));
        assert!(!is_correct(&item, 0, Some(9)));
    }

    #[test]
    fn step_index_ignored_without_steps() {
        let mut item = item_with_steps();
        item.steps.clear();
        assert!(is_correct(&item, 1, Some(3)));
    }
}
