//! Property-based tests for domain value objects
//!
//! These tests use proptest to verify invariants across many random inputs.

use domain::{DetectorState, RecognitionState, SpeakToken, Transcript, normalize};
use proptest::prelude::*;

// ============================================================================
// Normalization Property Tests
// ============================================================================

mod normalize_tests {
    use super::*;

    proptest! {
        #[test]
        fn normalize_is_idempotent(text in "[a-zA-Z0-9 .,!?\\t]{0,64}") {
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_ignores_case(text in "[a-zA-Z ]{0,40}") {
            prop_assert_eq!(normalize(&text.to_uppercase()), normalize(&text.to_lowercase()));
        }

        #[test]
        fn normalize_never_has_double_spaces(text in "[a-z \\t\\n]{0,40}") {
            let normalized = normalize(&text);
            prop_assert!(!normalized.contains("  "));
            prop_assert_eq!(normalized.trim(), normalized.as_str());
        }

        #[test]
        fn trailing_punctuation_does_not_matter(
            text in "[a-z]{1,10}( [a-z]{1,10}){0,3}",
            punct in "[.!?,]{0,3}"
        ) {
            prop_assert_eq!(normalize(&format!("{text}{punct}")), normalize(&text));
        }
    }
}

// ============================================================================
// Transcript Property Tests
// ============================================================================

mod transcript_tests {
    use super::*;

    proptest! {
        #[test]
        fn blank_text_is_rejected(text in "[ \\t\\n]{0,10}") {
            prop_assert!(Transcript::new(text).is_err());
        }

        #[test]
        fn text_is_trimmed(
            pad_left in "[ ]{0,3}",
            body in "[a-z]{1,8}( [a-z]{1,8}){0,2}",
            pad_right in "[ ]{0,3}"
        ) {
            let transcript = Transcript::new(format!("{pad_left}{body}{pad_right}")).unwrap();
            prop_assert_eq!(transcript.text(), body.as_str());
        }

        #[test]
        fn confidence_is_clamped(confidence in -10.0f32..10.0f32) {
            let transcript = Transcript::new("take photo").unwrap().with_confidence(confidence);
            let stored = transcript.confidence().unwrap();
            prop_assert!((0.0..=1.0).contains(&stored));
        }
    }
}

// ============================================================================
// State Machine Property Tests
// ============================================================================

mod state_machine_tests {
    use super::*;

    fn recognition_state() -> impl Strategy<Value = RecognitionState> {
        prop_oneof![
            Just(RecognitionState::Idle),
            Just(RecognitionState::Starting),
            Just(RecognitionState::Listening),
            Just(RecognitionState::Stopping),
        ]
    }

    fn detector_state() -> impl Strategy<Value = DetectorState> {
        prop_oneof![
            Just(DetectorState::Idle),
            Just(DetectorState::Starting),
            Just(DetectorState::Active),
        ]
    }

    proptest! {
        #[test]
        fn every_recognition_state_can_reach_idle(state in recognition_state()) {
            let reachable = state == RecognitionState::Idle
                || state.can_transition_to(RecognitionState::Idle);
            prop_assert!(reachable);
        }

        #[test]
        fn recognition_never_self_loops(state in recognition_state()) {
            prop_assert!(!state.can_transition_to(state));
        }

        #[test]
        fn transition_agrees_with_can_transition(
            from in recognition_state(),
            to in recognition_state()
        ) {
            prop_assert_eq!(from.transition(to).is_ok(), from.can_transition_to(to));
        }

        #[test]
        fn detector_only_activates_from_starting(from in detector_state()) {
            prop_assert_eq!(
                from.can_transition_to(DetectorState::Active),
                from == DetectorState::Starting
            );
        }
    }
}

// ============================================================================
// Speak Token Property Tests
// ============================================================================

mod speak_token_tests {
    use super::*;

    proptest! {
        #[test]
        fn freshly_minted_tokens_are_distinct(count in 2usize..32) {
            let tokens: std::collections::HashSet<SpeakToken> =
                (0..count).map(|_| SpeakToken::new()).collect();
            prop_assert_eq!(tokens.len(), count);
        }

        #[test]
        fn display_parses_back(_seed in any::<u8>()) {
            let token = SpeakToken::new();
            prop_assert_eq!(SpeakToken::parse(&token.to_string()).unwrap(), token);
        }
    }
}
