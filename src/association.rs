//! Track table and greedy nearest-neighbour association.
//!
//! Candidates are visited in input order. Each one claims the closest live
//! track that no earlier candidate claimed, provided it lies within the gating
//! distance of that track's last smoothed position; otherwise it opens a new
//! track. With the jump guard enabled the gate is tested on the damped
//! candidate. The assignment is greedy, not globally optimal: two objects whose
//! paths cross may swap identities.

use crate::{
    config::{AssociationConfig, FilterConfig, JumpGuardConfig},
    filters::{create_filter, JumpGuard, PositionFilter},
};
use log::{debug, warn};
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::fmt;

/// Stable track identifier
pub type TrackId = u64;

/// A tracked object with its own filter
pub struct Track {
    id: TrackId,
    last_position: Point3<f64>,
    filter: Box<dyn PositionFilter>,
    missed_frames: u32,
    age: u32,
}

impl Track {
    /// Track identifier
    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Last smoothed position
    #[must_use]
    pub fn last_position(&self) -> Point3<f64> {
        self.last_position
    }

    /// Consecutive frames without a matching candidate
    #[must_use]
    pub fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    /// Number of measurements absorbed, including the first
    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    /// The track's filter
    #[must_use]
    pub fn filter(&self) -> &dyn PositionFilter {
        self.filter.as_ref()
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("last_position", &self.last_position)
            .field("filter", &self.filter.name())
            .field("missed_frames", &self.missed_frames)
            .field("age", &self.age)
            .finish()
    }
}

/// Live tracks plus the id counter
#[derive(Debug, Default)]
pub struct TrackTable {
    tracks: BTreeMap<TrackId, Track>,
    next_id: TrackId,
}

impl TrackTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live tracks
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether no track is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Look up a track
    #[must_use]
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Live tracks in id order
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// The id the next new track will receive
    #[must_use]
    pub fn next_id(&self) -> TrackId {
        self.next_id
    }

    /// Last smoothed position of every live track
    #[must_use]
    pub fn last_positions(&self) -> BTreeMap<TrackId, Point3<f64>> {
        self.tracks.iter().map(|(&id, track)| (id, track.last_position)).collect()
    }

    fn allocate_id(&mut self) -> TrackId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Greedy nearest-neighbour associator
#[derive(Debug, Clone)]
pub struct TrackAssociator {
    gating_distance: f64,
    max_missed_frames: u32,
    filter: FilterConfig,
    jump_guard: Option<JumpGuard>,
}

impl TrackAssociator {
    /// Create an associator from configuration
    #[must_use]
    pub fn new(association: &AssociationConfig, filter: &FilterConfig, jump_guard: &JumpGuardConfig) -> Self {
        Self {
            gating_distance: association.gating_distance,
            max_missed_frames: association.max_missed_frames,
            filter: filter.clone(),
            jump_guard: JumpGuard::from_config(jump_guard),
        }
    }

    /// Match candidates to live tracks without touching the table
    ///
    /// Entry `i` is the track claimed by candidate `i`, or `None` when the
    /// candidate should open a new track. Ties go to the lowest id. With a jump
    /// guard the nearest track is gated on the damped candidate, so a large
    /// jump is pulled back onto its track instead of opening a new one.
    #[must_use]
    pub fn associate(&self, table: &TrackTable, candidates: &[Point3<f64>]) -> Vec<Option<TrackId>> {
        let mut used: Vec<TrackId> = Vec::new();

        candidates
            .iter()
            .map(|candidate| {
                let mut best: Option<(TrackId, f64)> = None;
                for (&id, track) in &table.tracks {
                    if used.contains(&id) {
                        continue;
                    }
                    let distance = nalgebra::distance(candidate, &track.last_position);
                    if best.map_or(true, |(_, d)| distance < d) {
                        best = Some((id, distance));
                    }
                }

                let (id, distance) = best?;
                let track = &table.tracks[&id];
                if self.gated_distance(&track.last_position, candidate, distance) < self.gating_distance {
                    used.push(id);
                    Some(id)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Associate candidates, run the filters and age unmatched tracks
    ///
    /// Returns the smoothed position of every track that received a candidate
    /// this frame. Tracks missing `max_missed_frames` frames in a row are
    /// evicted.
    pub fn update(&self, table: &mut TrackTable, candidates: &[Point3<f64>]) -> BTreeMap<TrackId, Point3<f64>> {
        let assignments = self.associate(table, candidates);
        let mut positions = BTreeMap::new();

        for (candidate, assignment) in candidates.iter().zip(assignments) {
            match assignment.and_then(|id| table.tracks.get_mut(&id)) {
                Some(track) => {
                    let measurement = match &self.jump_guard {
                        Some(guard) => guard.apply(&track.last_position, candidate),
                        None => *candidate,
                    };
                    // One prediction per frame elapsed since the last update
                    for _ in 0..=track.missed_frames {
                        track.filter.predict();
                    }
                    let smoothed = track.filter.update(&measurement);
                    track.last_position = smoothed;
                    track.missed_frames = 0;
                    track.age += 1;
                    positions.insert(track.id, smoothed);
                }
                None => {
                    let id = table.allocate_id();
                    let track = Track {
                        id,
                        last_position: *candidate,
                        filter: create_filter(&self.filter, *candidate),
                        missed_frames: 0,
                        age: 1,
                    };
                    debug!("Opened track {} at {:?}", id, candidate.coords.as_slice());
                    table.tracks.insert(id, track);
                    positions.insert(id, *candidate);
                }
            }
        }

        let max_missed = self.max_missed_frames;
        table.tracks.retain(|id, track| {
            if positions.contains_key(id) {
                return true;
            }
            track.missed_frames += 1;
            if track.missed_frames >= max_missed {
                warn!("Evicting track {} after {} missed frames", id, track.missed_frames);
                false
            } else {
                true
            }
        });

        positions
    }

    /// Distance tested against the gate: the damped jump when a guard is active
    fn gated_distance(&self, previous: &Point3<f64>, candidate: &Point3<f64>, raw_distance: f64) -> f64 {
        match &self.jump_guard {
            Some(guard) => nalgebra::distance(&guard.apply(previous, candidate), previous),
            None => raw_distance,
        }
    }

    /// Gating distance in world units
    #[must_use]
    pub fn gating_distance(&self) -> f64 {
        self.gating_distance
    }
}
