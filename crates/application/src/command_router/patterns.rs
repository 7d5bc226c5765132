//! Transcript patterns for registered voice commands

use std::fmt;
use std::sync::Arc;

use aho_corasick::{AhoCorasick, MatchKind};
use domain::normalize;

use crate::error::ApplicationError;

/// How a registered command recognizes a transcript
///
/// All patterns see the normalized transcript (lowercase, collapsed
/// whitespace, no trailing punctuation).
#[derive(Clone)]
pub enum CommandPattern {
    /// Transcript contains the phrase
    Phrase(String),
    /// Transcript contains any of several phrases
    AnyOf(AnyOfMatcher),
    /// Transcript is exactly the phrase
    Exact(String),
    /// Custom matcher
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl fmt::Debug for CommandPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phrase(phrase) => f.debug_tuple("Phrase").field(phrase).finish(),
            Self::AnyOf(matcher) => f.debug_tuple("AnyOf").field(&matcher.phrases).finish(),
            Self::Exact(phrase) => f.debug_tuple("Exact").field(phrase).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl CommandPattern {
    /// Match when the transcript contains `phrase`
    pub fn phrase(phrase: &str) -> Self {
        Self::Phrase(normalize(phrase))
    }

    /// Match when the whole transcript equals `phrase`
    pub fn exact(phrase: &str) -> Self {
        Self::Exact(normalize(phrase))
    }

    /// Match when the transcript contains any of `phrases`
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Configuration` if no usable phrase is given
    /// or the automaton cannot be built.
    pub fn any_of<I, S>(phrases: I) -> Result<Self, ApplicationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        AnyOfMatcher::new(phrases).map(Self::AnyOf)
    }

    /// Match with a custom function over the normalized transcript
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Check a normalized transcript against this pattern
    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Self::Phrase(phrase) => !phrase.is_empty() && normalized.contains(phrase.as_str()),
            Self::AnyOf(matcher) => matcher.is_match(normalized),
            Self::Exact(phrase) => normalized == phrase,
            Self::Predicate(f) => f(normalized),
        }
    }
}

/// Multi-phrase matcher backed by one Aho-Corasick automaton
#[derive(Clone)]
pub struct AnyOfMatcher {
    phrases: Vec<String>,
    automaton: AhoCorasick,
}

impl fmt::Debug for AnyOfMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyOfMatcher")
            .field("phrases", &self.phrases)
            .finish_non_exhaustive()
    }
}

impl AnyOfMatcher {
    fn new<I, S>(phrases: I) -> Result<Self, ApplicationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        if phrases.is_empty() {
            return Err(ApplicationError::Configuration(
                "AnyOf pattern needs at least one phrase".to_string(),
            ));
        }

        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(&phrases)
            .map_err(|e| ApplicationError::Configuration(format!("Invalid phrase set: {e}")))?;

        Ok(Self { phrases, automaton })
    }

    /// The normalized phrases
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    fn is_match(&self, normalized: &str) -> bool {
        self.automaton.is_match(normalized)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tokio_test::assert_err;

    use super::*;

    #[test]
    fn phrase_matches_substring_case_insensitively() {
        let pattern = CommandPattern::phrase("Take Photo");
        assert!(pattern.matches(&normalize("Please TAKE PHOTO now!")));
        assert!(!pattern.matches(&normalize("take a photo")));
    }

    #[test]
    fn exact_ignores_trailing_punctuation() {
        let pattern = CommandPattern::exact("stop");
        assert!(pattern.matches(&normalize("Stop.")));
        assert!(pattern.matches(&normalize("  STOP!  ")));
        assert!(!pattern.matches(&normalize("stop it")));
    }

    #[test]
    fn any_of_matches_each_phrase() {
        let pattern = CommandPattern::any_of(["cheese", "snap it", "take photo"]).unwrap();
        assert!(pattern.matches(&normalize("Say cheese")));
        assert!(pattern.matches(&normalize("ok snap it")));
        assert!(pattern.matches(&normalize("take photo")));
        assert!(!pattern.matches(&normalize("hello")));
    }

    #[test]
    fn any_of_rejects_empty_phrase_set() {
        assert_err!(CommandPattern::any_of(Vec::<String>::new()));
        assert_err!(CommandPattern::any_of(["  ", "?"]));
    }

    #[test]
    fn empty_phrase_never_matches() {
        assert!(!CommandPattern::phrase("...").matches("anything"));
    }

    #[test]
    fn predicate_sees_normalized_text() {
        let pattern = CommandPattern::predicate(|t| t.starts_with("zoom"));
        assert!(pattern.matches(&normalize("Zoom in.")));
        assert!(!pattern.matches(&normalize("please zoom")));
    }

    #[test]
    fn debug_hides_predicate() {
        let pattern = CommandPattern::predicate(|_| true);
        assert_eq!(format!("{pattern:?}"), "Predicate(..)");
    }

    proptest! {
        #[test]
        fn phrase_matches_wherever_it_appears(
            before in "([a-z]{1,6} ){0,3}",
            after in "( [a-z]{1,6}){0,3}",
            punct in "[.!?]{0,2}"
        ) {
            let pattern = CommandPattern::phrase("take photo");
            let text = format!("{before}TAKE photo{after}{punct}");
            prop_assert!(pattern.matches(&normalize(&text)));
        }

        #[test]
        fn exact_rejects_any_extra_word(extra in "[a-z]{1,6}") {
            let pattern = CommandPattern::exact("stop");
            let text = format!("stop {extra}");
            prop_assert!(!pattern.matches(&normalize(&text)));
        }
    }
}
