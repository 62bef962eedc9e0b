use tracing::info;

use crate::geometry::Point;
use crate::projection::Projection;
use crate::store::{BlockDevice, RecordStore, StoreError};

/// A catalog record paired with its distance to the focal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub index: usize,
    pub distance: u32,
}

/// Filters and orders the whole catalog by distance from a focal point.
///
/// The candidate buffer is sized to the catalog once and reused by every
/// query, so ranking never grows memory past the catalog size.
#[derive(Debug, Default)]
pub struct RankingEngine {
    candidates: Vec<Candidate>,
}

impl RankingEngine {
    pub fn with_capacity(catalog_len: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(catalog_len),
        }
    }

    /// Rank every record rated at least `min_rating` by Manhattan distance
    /// to `focal`, nearest first. Ties are broken by record index.
    ///
    /// A storage fault aborts the query and leaves no candidates behind.
    pub fn rank<D: BlockDevice, P: Projection>(
        &mut self,
        store: &mut RecordStore<D>,
        projection: &P,
        focal: Point,
        min_rating: u8,
    ) -> Result<&[Candidate], StoreError> {
        self.candidates.clear();
        for index in 0..store.len() {
            let record = match store.fetch(index) {
                Ok(record) => record,
                Err(e) => {
                    self.candidates.clear();
                    return Err(e);
                }
            };
            if record.rating < min_rating {
                continue;
            }
            let position = projection.project(record.lat, record.lon);
            self.candidates.push(Candidate {
                index,
                distance: position.manhattan(focal),
            });
        }

        order_candidates(&mut self.candidates);
        info!(
            focal_x = focal.x,
            focal_y = focal.y,
            min_rating,
            count = self.candidates.len(),
            "ranking complete"
        );
        Ok(&self.candidates)
    }

    /// Candidates of the most recent successful query.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

/// Sort ascending by `(distance, index)`; unstable sort with an
/// `O(n log n)` worst case, deterministic because the key is unique.
pub fn order_candidates(candidates: &mut [Candidate]) {
    candidates.sort_unstable_by_key(|c| (c.distance, c.index));
}
