//! Sentence binding
//!
//! Groups entity spans by the sentence that fully contains them. Entities
//! straddling a sentence boundary belong to no group and therefore never
//! take part in a relationship.

use entrel_core::{EntityGroup, EntitySpan, EntrelError, Result, Sentence};

/// Bind entities to the sentences that contain them.
///
/// Returns one group per sentence, in sentence order, including sentences
/// with no entities. Within a group entities are ordered by `start_token`;
/// ties keep the order the recognizer reported them in.
pub fn bind(sentences: &[Sentence], entities: &[EntitySpan]) -> Result<Vec<EntityGroup>> {
    validate_sentences(sentences)?;
    for entity in entities {
        entity.validate()?;
    }

    let mut ordered: Vec<&EntitySpan> = entities.iter().collect();
    ordered.sort_by_key(|e| e.start_token);

    let groups = sentences
        .iter()
        .map(|sentence| {
            let first = ordered.partition_point(|e| e.start_token < sentence.start_token);
            let members = ordered[first..]
                .iter()
                .take_while(|e| e.start_token <= sentence.end_token)
                .filter(|e| sentence.contains(e))
                .map(|e| (*e).clone())
                .collect();

            EntityGroup {
                sentence: *sentence,
                entities: members,
            }
        })
        .collect();

    Ok(groups)
}

/// Sentences must be well formed, ordered and non-overlapping
fn validate_sentences(sentences: &[Sentence]) -> Result<()> {
    for (index, sentence) in sentences.iter().enumerate() {
        if sentence.start_token > sentence.end_token {
            return Err(EntrelError::ValidationError(format!(
                "sentence {index} starts at token {} after its end {}",
                sentence.start_token, sentence.end_token
            )));
        }
    }

    for (index, pair) in sentences.windows(2).enumerate() {
        if pair[1].start_token < pair[0].end_token {
            return Err(EntrelError::ValidationError(format!(
                "sentence {} overlaps or precedes sentence {index}",
                index + 1
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, start: usize, end: usize) -> EntitySpan {
        EntitySpan::new(text, "PERSON", start, end)
    }

    fn texts(group: &EntityGroup) -> Vec<&str> {
        group.entities.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_bind_single_sentence() {
        let groups = bind(
            &[Sentence::new(0, 4)],
            &[span("Alice", 0, 1), span("Bob", 2, 3)],
        )
        .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(texts(&groups[0]), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_bind_separate_sentences() {
        let groups = bind(
            &[Sentence::new(0, 3), Sentence::new(3, 6)],
            &[span("Alice", 0, 1), span("Bob", 3, 4)],
        )
        .unwrap();

        assert_eq!(texts(&groups[0]), vec!["Alice"]);
        assert_eq!(texts(&groups[1]), vec!["Bob"]);
    }

    #[test]
    fn test_straddling_entity_is_dropped() {
        let entities = [span("Alice", 0, 1), span("Bob Carol", 2, 5)];
        let groups = bind(&[Sentence::new(0, 4), Sentence::new(4, 8)], &entities).unwrap();

        assert_eq!(texts(&groups[0]), vec!["Alice"]);
        assert!(groups[1].entities.is_empty());
    }

    #[test]
    fn test_empty_sentences_still_grouped() {
        let groups = bind(&[Sentence::new(0, 2), Sentence::new(2, 5)], &[]).unwrap();

        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.entities.is_empty()));
    }

    #[test]
    fn test_orders_by_start_token_stably() {
        let entities = [
            span("Carol", 5, 6),
            span("Alice", 1, 2),
            span("A", 3, 4),
            span("B", 3, 5),
        ];
        let groups = bind(&[Sentence::new(0, 8)], &entities).unwrap();

        assert_eq!(texts(&groups[0]), vec!["Alice", "A", "B", "Carol"]);
    }

    #[test]
    fn test_zero_width_entity_on_boundary() {
        let groups = bind(
            &[Sentence::new(0, 2), Sentence::new(2, 2), Sentence::new(2, 4)],
            &[span("empty", 2, 2)],
        )
        .unwrap();

        // Containment is inclusive at both ends
        assert!(groups.iter().all(|g| texts(g) == vec!["empty"]));
    }

    #[test]
    fn test_rejects_inverted_span() {
        let err = bind(&[Sentence::new(0, 4)], &[span("bad", 3, 1)]).unwrap_err();
        assert!(matches!(err, EntrelError::ValidationError(_)));
    }

    #[test]
    fn test_rejects_inverted_sentence() {
        let err = bind(&[Sentence::new(4, 0)], &[]).unwrap_err();
        assert!(matches!(err, EntrelError::ValidationError(_)));
    }

    #[test]
    fn test_rejects_overlapping_sentences() {
        let err = bind(&[Sentence::new(0, 5), Sentence::new(3, 8)], &[]).unwrap_err();
        assert!(matches!(err, EntrelError::ValidationError(_)));

        let err = bind(&[Sentence::new(5, 8), Sentence::new(0, 5)], &[]).unwrap_err();
        assert!(matches!(err, EntrelError::ValidationError(_)));
    }
}
