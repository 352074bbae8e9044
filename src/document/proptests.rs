//! Property-based tests for the document model

use super::*;
use proptest::prelude::*;

fn arb_step() -> impl Strategy<Value = Step> {
    (any::<String>(), any::<String>()).prop_map(|(subject, body)| Step { subject, body })
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    proptest::collection::vec(arb_step(), 0..8)
}

proptest! {
    #[test]
    fn prop_round_trip(steps in arb_steps()) {
        prop_assert_eq!(parse(&serialize(&steps)), steps);
    }

    #[test]
    fn prop_fenced_round_trip(steps in arb_steps()) {
        let fenced = format!("```json\n{}\n```", serialize(&steps));
        prop_assert_eq!(parse(&fenced), steps);
    }

    #[test]
    fn prop_parse_never_panics(text in any::<String>()) {
        let _ = parse(&text);
    }

    #[test]
    fn prop_add_step_appends_one(steps in arb_steps()) {
        let next = add_step(&steps);
        prop_assert_eq!(next.len(), steps.len() + 1);
        prop_assert_eq!(&next[..steps.len()], &steps[..]);
        let expected = format!("Follow-up {}", steps.len() + 1);
        prop_assert_eq!(&next[steps.len()].subject, &expected);
    }

    #[test]
    fn prop_edit_then_parse(steps in proptest::collection::vec(arb_step(), 1..6), value in any::<String>()) {
        let index = steps.len() - 1;
        let edited = edit_step(&steps, index, StepField::Body, value.clone()).unwrap();
        let reparsed = parse(&serialize(&edited));
        prop_assert_eq!(&reparsed[index].body, &value);
        prop_assert_eq!(reparsed.len(), steps.len());
    }
}
