use crate::config::{ClassifierConfig, KeywordRule};
use crate::events::BowlEvent;
use tracing::trace;

/// Maps a free-text scene description to a [`BowlEvent`].
///
/// Keyword groups are tested in configuration order and the first group with
/// a keyword contained in the lower-cased description wins, so with the
/// default rules "empty" beats "full" beats "partially".
#[derive(Debug, Clone)]
pub struct EventClassifier {
    rules: Vec<KeywordRule>,
}

impl EventClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let rules = config
            .rules
            .iter()
            .map(|rule| KeywordRule {
                event: rule.event,
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();

        Self { rules }
    }

    pub fn classify(&self, description: &str) -> Option<BowlEvent> {
        let description = description.to_lowercase();

        let matched = self.rules.iter().find_map(|rule| {
            rule.keywords
                .iter()
                .find(|keyword| description.contains(keyword.as_str()))
                .map(|keyword| (rule.event, keyword))
        });

        match matched {
            Some((event, keyword)) => {
                trace!("Description matched '{}' -> {}", keyword, event.event_type());
                Some(event)
            }
            None => {
                trace!("Description matched no keyword group");
                None
            }
        }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_keywords() {
        let classifier = EventClassifier::default();

        assert_eq!(
            classifier.classify("The bowl is EMPTY."),
            Some(BowlEvent::BowlEmpty)
        );
        assert_eq!(
            classifier.classify("Looks like the kibble is all gone"),
            Some(BowlEvent::BowlEmpty)
        );
    }

    #[test]
    fn test_empty_wins_over_later_groups() {
        let classifier = EventClassifier::default();

        assert_eq!(
            classifier.classify("It was full this morning, now it's empty"),
            Some(BowlEvent::BowlEmpty)
        );
        assert_eq!(
            classifier.classify("Partially eaten earlier, now all gone"),
            Some(BowlEvent::BowlEmpty)
        );
    }

    #[test]
    fn test_refilled_and_partial() {
        let classifier = EventClassifier::default();

        assert_eq!(
            classifier.classify("The bowl looks FULL now"),
            Some(BowlEvent::BowlRefilled)
        );
        assert_eq!(
            classifier.classify("Someone refilled it"),
            Some(BowlEvent::BowlRefilled)
        );
        assert_eq!(
            classifier.classify("The bowl is partially eaten, some food remains"),
            Some(BowlEvent::PartiallyEaten)
        );
        assert_eq!(
            classifier.classify("There is Some Food left"),
            Some(BowlEvent::PartiallyEaten)
        );
        assert_eq!(
            classifier.classify("It is full, though partially covered"),
            Some(BowlEvent::BowlRefilled)
        );
    }

    #[test]
    fn test_unrecognized_text() {
        let classifier = EventClassifier::default();

        assert_eq!(classifier.classify("no idea"), None);
        assert_eq!(classifier.classify(""), None);
        assert_eq!(classifier.classify("Could not analyze image."), None);
    }

    #[test]
    fn test_custom_rules_are_normalized() {
        let classifier = EventClassifier::new(&ClassifierConfig {
            rules: vec![KeywordRule {
                event: BowlEvent::BowlRefilled,
                keywords: vec!["  Topped Up ".to_string(), "".to_string()],
            }],
        });

        assert_eq!(classifier.rules()[0].keywords, vec!["topped up"]);
        assert_eq!(
            classifier.classify("the bowl was TOPPED UP"),
            Some(BowlEvent::BowlRefilled)
        );
        assert_eq!(classifier.classify("the bowl is empty"), None);
    }
}
