//! Signals (candidate sites) and the store that owns them.

use serde::{Deserialize, Serialize};

use crate::category::{Category, Quirk, SizeClass};
use crate::geometry::Point;
use crate::spatial::PointIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u16);

impl ZoneId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A candidate site on the sector map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub pos: Point,
    pub size: SizeClass,
    pub category: Category,
    pub quirk: Option<Quirk>,
    pub zone: ZoneId,
    /// Locked signals are never reassigned (mandatory structures).
    pub locked: bool,
    #[serde(skip)]
    pub classified: bool,
}

/// Owns every signal of one generation run, plus a position index.
///
/// Ids are dense scatter-order indices and are never reused; removal
/// leaves a hole so ids held elsewhere stay valid.
#[derive(Default)]
pub struct SignalStore {
    slots: Vec<Option<Signal>>,
    index: PointIndex<SignalId>,
    live: usize,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unclassified signal.
    pub fn push(&mut self, pos: Point, zone: ZoneId) -> SignalId {
        let id = SignalId(self.slots.len() as u32);
        self.slots.push(Some(Signal {
            id,
            pos,
            size: SizeClass::Small,
            category: Category::Empty,
            quirk: None,
            zone,
            locked: false,
            classified: false,
        }));
        self.index.insert(pos, id);
        self.live += 1;
        id
    }

    pub fn get(&self, id: SignalId) -> Option<&Signal> {
        self.slots.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: SignalId) -> Option<&mut Signal> {
        self.slots.get_mut(id.0 as usize).and_then(|s| s.as_mut())
    }

    /// Category of a live signal, `None` if removed.
    pub fn category(&self, id: SignalId) -> Option<Category> {
        self.get(id).map(|s| s.category)
    }

    /// Set a live signal's category. Returns the previous one.
    pub fn set_category(&mut self, id: SignalId, category: Category) -> Option<Category> {
        let signal = self.get_mut(id)?;
        Some(std::mem::replace(&mut signal.category, category))
    }

    /// Remove a signal from the map. Zone membership is the caller's job.
    pub fn remove(&mut self, id: SignalId) -> Option<Signal> {
        let signal = self.slots.get_mut(id.0 as usize)?.take()?;
        self.index.remove(signal.pos, id);
        self.live -= 1;
        Some(signal)
    }

    /// Live signals in id (scatter) order.
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn ids(&self) -> Vec<SignalId> {
        self.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live signals within `radius` of `pos`, closest first.
    pub fn within(&self, pos: Point, radius: f64) -> Vec<(SignalId, f64)> {
        self.index.within(pos, radius)
    }

    /// Up to `n` live signals nearest `pos` within `max_distance`.
    pub fn nearest(&self, pos: Point, n: usize, max_distance: f64) -> Vec<(SignalId, f64)> {
        self.index.nearest(pos, n, max_distance)
    }

    pub fn any_within(&self, pos: Point, radius: f64) -> bool {
        self.index.any_within(pos, radius)
    }

    /// Owned copy of every live signal.
    pub fn snapshot(&self) -> Vec<Signal> {
        self.iter().cloned().collect()
    }
}
