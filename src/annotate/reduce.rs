use std::collections::HashSet;

use crate::ner::Entity;

/// Result written when no entity survives the threshold.
pub const UNKNOWN: &str = "Unknown";

/// Keep entities scoring at least `threshold`.
pub fn filter_by_threshold(entities: Vec<Entity>, threshold: f32) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|e| e.score >= threshold)
        .collect()
}

/// Collapse a row's entities to one display string.
///
/// * no entities → `"Unknown"`
/// * one requested label → unique spans, `", "`-joined
/// * several labels → unique `span:label` pairs, `", "`-joined
///
/// Duplicates collapse; the first occurrence fixes the position.
pub fn reduce_entities(entities: &[Entity], label_count: usize) -> String {
    if entities.is_empty() {
        return UNKNOWN.to_string();
    }
    let mut seen = HashSet::new();
    let parts: Vec<String> = entities
        .iter()
        .map(|e| {
            if label_count == 1 {
                e.text.clone()
            } else {
                format!("{}:{}", e.text, e.label)
            }
        })
        .filter(|part| seen.insert(part.clone()))
        .collect();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ent(text: &str, label: &str, score: f32) -> Entity {
        Entity {
            text: text.into(),
            label: label.into(),
            score,
        }
    }

    #[test]
    fn empty_is_unknown_for_any_label_count() {
        for n in 0..4 {
            assert_eq!(reduce_entities(&[], n), UNKNOWN);
        }
    }

    #[test]
    fn single_label_joins_unique_spans_without_label() {
        let entities = [
            ent("Paris", "location", 0.9),
            ent("Lyon", "location", 0.8),
            ent("Paris", "location", 0.6),
        ];
        let out = reduce_entities(&entities, 1);
        assert_eq!(out, "Paris, Lyon");
        assert!(!out.contains(':'));
    }

    #[test]
    fn several_labels_use_span_label_pairs() {
        let labels = ["person", "location"];
        let entities = [
            ent("Barack Obama", "person", 0.95),
            ent("Paris", "location", 0.9),
            ent("Barack Obama", "person", 0.4),
        ];
        let out = reduce_entities(&entities, labels.len());
        let segments: Vec<&str> = out.split(", ").collect();
        assert_eq!(segments.len(), 2);
        for seg in segments {
            let (_, label) = seg.rsplit_once(':').unwrap();
            assert!(labels.contains(&label));
        }
    }

    #[test]
    fn same_span_with_different_labels_is_kept_twice() {
        let entities = [ent("Jordan", "person", 0.7), ent("Jordan", "location", 0.6)];
        assert_eq!(reduce_entities(&entities, 2), "Jordan:person, Jordan:location");
    }

    #[test]
    fn threshold_bounds() {
        let entities = vec![ent("a", "x", 0.0), ent("b", "x", 0.5), ent("c", "x", 1.0)];
        assert_eq!(filter_by_threshold(entities.clone(), 0.0).len(), 3);

        let top = filter_by_threshold(entities, 1.0);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].text, "c");

        let none = filter_by_threshold(vec![ent("b", "x", 0.99)], 1.0);
        assert_eq!(reduce_entities(&none, 1), UNKNOWN);
    }
}
