//! Relation scoring module
//!
//! Derives `related_to` relationships from entities that share a sentence.
//! Every ordered pair (earlier, later) inside a group yields one record
//! whose strength decays with the token gap between the two mentions:
//!
//! ```text
//! strength = 1 / max(1, later.start_token - earlier.end_token)
//! ```
//!
//! Adjacent or overlapping mentions score 1.0.

use entrel_core::{EntityGroup, EntitySpan, EntrelError, RelationshipRecord, Result, RELATED_TO};

/// Signed token gap from the end of `earlier` to the start of `later`
pub fn token_distance(earlier: &EntitySpan, later: &EntitySpan) -> i64 {
    later.start_token as i64 - earlier.end_token as i64
}

/// Proximity strength in (0, 1]
pub fn proximity_strength(earlier: &EntitySpan, later: &EntitySpan) -> f32 {
    1.0 / token_distance(earlier, later).max(1) as f32
}

/// Score every entity pair within one group, in (i, j) order
pub fn score_group(group: &EntityGroup) -> Vec<RelationshipRecord> {
    let entities = &group.entities;
    let mut records = Vec::with_capacity(group.pair_count());

    for (i, earlier) in entities.iter().enumerate() {
        for later in &entities[i + 1..] {
            records.push(RelationshipRecord {
                source: earlier.text.clone(),
                target: later.text.clone(),
                relation: RELATED_TO.to_string(),
                strength: proximity_strength(earlier, later),
            });
        }
    }

    records
}

/// Score all groups, concatenating records in group order
pub fn score(groups: &[EntityGroup]) -> Vec<RelationshipRecord> {
    groups.iter().flat_map(score_group).collect()
}

/// Keep only records at or above `threshold`.
///
/// The threshold must be a finite number in `[0, 1]`.
pub fn filter_by_strength(
    records: Vec<RelationshipRecord>,
    threshold: f32,
) -> Result<Vec<RelationshipRecord>> {
    validate_threshold(threshold)?;
    Ok(records
        .into_iter()
        .filter(|r| r.strength >= threshold)
        .collect())
}

/// Reject thresholds outside `[0, 1]`
pub fn validate_threshold(threshold: f32) -> Result<()> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(EntrelError::ValidationError(format!(
            "relationship_threshold must be between 0 and 1, got {threshold}"
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
