use super::{Buffers, Hypothesis};
use std::fmt::{self, Display, Formatter};

/// A handle of a hypothesis in a `HypothesisArena`.
///
/// Slots are reused after a hypothesis is released; the generation tells a
/// handle of the new occupant apart from one of the old.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HypoId {
    index: u32,
    generation: u32,
}

impl HypoId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        HypoId { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl Display for HypoId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    hypo: Option<Hypothesis>,
}

/// Owns the hypotheses of one worker. Released hypotheses leave their
/// buffers behind for the next hypothesis that is created, so that decoding
/// many sentences does not allocate the same vectors over and over again.
pub struct HypothesisArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    spare: Vec<Buffers>,
    pool_capacity: usize,
    live: usize,
}

impl HypothesisArena {
    /// An arena that keeps the buffers of at most `pool_capacity` released
    /// hypotheses.
    pub fn with_capacity(pool_capacity: usize) -> Self {
        HypothesisArena {
            slots: Vec::new(),
            free: Vec::new(),
            spare: Vec::new(),
            pool_capacity,
            live: 0,
        }
    }

    /// Number of live hypotheses.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of buffer sets waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.spare.len()
    }

    pub fn contains(&self, id: HypoId) -> bool {
        self.try_get(id).is_some()
    }

    pub fn try_get(&self, id: HypoId) -> Option<&Hypothesis> {
        match self.slots.get(id.index()) {
            Some(slot) if slot.generation == id.generation => slot.hypo.as_ref(),
            _ => None,
        }
    }

    pub fn get(&self, id: HypoId) -> &Hypothesis {
        match self.try_get(id) {
            Some(h) => h,
            None => panic!("stale hypothesis handle {}", id),
        }
    }

    pub fn get_mut(&mut self, id: HypoId) -> &mut Hypothesis {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation);
        match slot.and_then(|slot| slot.hypo.as_mut()) {
            Some(h) => h,
            None => panic!("stale hypothesis handle {}", id),
        }
    }

    /// Empty buffers for a new hypothesis, reused if possible.
    pub(crate) fn take_buffers(&mut self) -> Buffers {
        self.spare.pop().unwrap_or_default()
    }

    pub(crate) fn insert(&mut self, hypo: Hypothesis) -> HypoId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.hypo = Some(hypo);
            HypoId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                hypo: Some(hypo),
            });
            HypoId::new(index, 0)
        }
    }

    /// Frees the slot of `id` and keeps its buffers for reuse. The handle
    /// becomes stale.
    pub fn release(&mut self, id: HypoId) {
        let hypo = match self.slots.get_mut(id.index()) {
            Some(slot) if slot.generation == id.generation && slot.hypo.is_some() => {
                slot.generation = slot.generation.wrapping_add(1);
                slot.hypo.take()
            }
            _ => None,
        };
        match hypo {
            Some(h) => {
                self.live -= 1;
                self.free.push(id.index);
                self.recycle(h);
            }
            None => panic!("stale hypothesis handle {}", id),
        }
    }

    fn recycle(&mut self, hypo: Hypothesis) {
        if self.spare.len() < self.pool_capacity {
            self.spare.push(hypo.into_buffers());
        }
    }

    /// Releases every live hypothesis at once, e.g. after a sentence has
    /// been decoded.
    pub fn reset(&mut self) {
        let mut released = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(h) = slot.hypo.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                released.push(h);
            }
        }
        tracing::trace!(released = released.len(), "reset hypothesis arena");
        for h in released {
            self.recycle(h);
        }
        self.live = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (HypoId, &Hypothesis)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.hypo
                .as_ref()
                .map(|h| (HypoId::new(i as u32, slot.generation), h))
        })
    }
}
