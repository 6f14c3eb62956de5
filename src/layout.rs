//! Section Layout - Extent per Category
//!
//! An empty category takes no space: zero items yields an extent of 0.

use serde::{Deserialize, Serialize};

use crate::account::AccountLists;
use crate::config::WallConfig;

/// Pixel height needed to lay out `count` items in rows of `row_capacity`.
///
/// `row_capacity` and `row_height` are positive by config contract.
pub fn section_extent(count: usize, row_capacity: u32, row_height: f64) -> f64 {
    let capacity = row_capacity.max(1) as usize;
    let rows = count.div_ceil(capacity);
    rows as f64 * row_height
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionExtents {
    pub contributors_height: f64,
    pub collaborators_height: f64,
    pub bots_height: f64,
}

impl SectionExtents {
    pub fn compute(lists: &AccountLists, config: &WallConfig) -> Self {
        let extent = |count| section_extent(count, config.row_capacity, config.row_height);
        Self {
            contributors_height: extent(lists.contributors.len()),
            collaborators_height: extent(lists.collaborators.len()),
            bots_height: extent(lists.bots.len()),
        }
    }

    /// Template names paired with their values
    pub fn named(&self) -> [(&'static str, f64); 3] {
        [
            ("contributorsHeight", self.contributors_height),
            ("collaboratorsHeight", self.collaborators_height),
            ("botsHeight", self.bots_height),
        ]
    }
}
