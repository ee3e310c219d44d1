//! Change classification
//!
//! Turns a [`Mapping`] into one [`ChangeRecord`] per line of either version.

use crate::matcher::Mapping;
use crate::models::{ChangeRecord, ChangeStatus, LineRecord};

/// Classify every line given the committed mapping.
///
/// Old-side records (mapped and deleted) come first in old-index order,
/// then inserted records in new-index order. A mapped line is `moved` when
/// its displacement exceeds `displacement_threshold`.
pub fn classify(
    old: &[LineRecord],
    new: &[LineRecord],
    mapping: &Mapping,
    displacement_threshold: usize,
) -> Vec<ChangeRecord> {
    let mut records = Vec::with_capacity(old.len() + new.len() - mapping.len());

    for line in old {
        let record = match mapping.pair_for_old(line.index) {
            Some(pair) => {
                let counterpart = &new[pair.new_index - 1];
                let status = if line.normalized_text == counterpart.normalized_text {
                    ChangeStatus::Unchanged
                } else {
                    ChangeStatus::Modified
                };
                let displacement = pair.displacement();
                ChangeRecord {
                    status,
                    moved: displacement > displacement_threshold,
                    old_index: Some(line.index),
                    new_index: Some(pair.new_index),
                    displacement: Some(displacement),
                    similarity: Some(pair.similarity),
                }
            }
            None => ChangeRecord::deleted(line.index),
        };
        records.push(record);
    }

    records.extend(
        new.iter()
            .filter(|line| mapping.old_for_new(line.index).is_none())
            .map(|line| ChangeRecord::inserted(line.index)),
    );

    records
}
