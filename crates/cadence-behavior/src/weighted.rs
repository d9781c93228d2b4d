//! Weighted random ordering without replacement.
//!
//! Every shuffle draws `u ~ U(0, 1)` per entry and sorts ascending by `-u^(1/w)`. The
//! probability that an entry lands first is `w / Σw`, and the whole order is a weighted sample
//! without replacement, from a single pass of draws.

use rand::Rng;

use crate::BehaviorError;

/// How [`WeightedList::shuffle`] treats the canonical list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShuffleMode {
    /// Produce a fresh order and leave the canonical list untouched. Safe while a caller still
    /// iterates an earlier order.
    #[default]
    Snapshot,
    /// Reorder the canonical list itself. Cheaper; requires exclusive access.
    InPlace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEntry<T> {
    item: T,
    weight: u32,
    draw_key: f64,
}

impl<T> WeightedEntry<T> {
    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

fn draw_key<R: Rng + ?Sized>(weight: u32, rng: &mut R) -> f64 {
    let u: f64 = rng.gen();
    -u.powf(1.0 / f64::from(weight))
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedList<T> {
    entries: Vec<WeightedEntry<T>>,
    mode: ShuffleMode,
}

impl<T> Default for WeightedList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            mode: ShuffleMode::default(),
        }
    }
}

impl<T> WeightedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: ShuffleMode) -> Self {
        Self {
            entries: Vec::new(),
            mode,
        }
    }

    pub fn mode(&self) -> ShuffleMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ShuffleMode) {
        self.mode = mode;
    }

    /// Append `item`. A zero weight is a construction defect.
    pub fn push(&mut self, item: T, weight: u32) -> Result<(), BehaviorError> {
        if weight == 0 {
            tracing::error!(weight, "rejecting weighted entry with non-positive weight");
            return Err(BehaviorError::InvalidWeight { weight });
        }
        self.entries.push(WeightedEntry {
            item,
            weight,
            draw_key: 0.0,
        });
        Ok(())
    }

    pub fn with(mut self, item: T, weight: u32) -> Result<Self, BehaviorError> {
        self.push(item, weight)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.weight)).sum()
    }

    pub fn entries(&self) -> &[WeightedEntry<T>] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index).map(|e| &e.item)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index).map(|e| &mut e.item)
    }

    /// Items in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|e| &e.item)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.entries.iter_mut().map(|e| &mut e.item)
    }

    /// A weighted random order over canonical indices. The list itself is not modified.
    pub fn shuffled_indices<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut keyed: Vec<(f64, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (draw_key(e.weight, rng), i))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        keyed.into_iter().map(|(_, i)| i).collect()
    }

    /// A weighted random order over the items themselves.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<&T> {
        self.shuffled_indices(rng)
            .into_iter()
            .map(|i| &self.entries[i].item)
            .collect()
    }

    /// Reorder the canonical list by fresh draw keys.
    pub fn shuffle_in_place<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for entry in &mut self.entries {
            entry.draw_key = draw_key(entry.weight, rng);
        }
        self.entries.sort_by(|a, b| a.draw_key.total_cmp(&b.draw_key));
    }

    /// Shuffle according to [`mode`](Self::mode) and return the traversal order as canonical
    /// indices (after the shuffle, for `InPlace`).
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<usize> {
        match self.mode {
            ShuffleMode::Snapshot => self.shuffled_indices(rng),
            ShuffleMode::InPlace => {
                self.shuffle_in_place(rng);
                (0..self.entries.len()).collect()
            }
        }
    }
}

impl<T> FromIterator<(T, u32)> for WeightedList<T> {
    /// Zero weights are dropped with an error log, the same way `push` rejects them.
    fn from_iter<I: IntoIterator<Item = (T, u32)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (item, weight) in iter {
            if list.push(item, weight).is_err() {
                continue;
            }
        }
        list
    }
}
