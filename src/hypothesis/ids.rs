use std::sync::{PoisonError, RwLock};

/// Hands out diagnostic hypothesis ids. Shared by all workers of a decoding
/// run; incrementing takes the lock exclusively, reading the count shares it.
/// The counter wraps around instead of overflowing.
#[derive(Debug, Default)]
pub struct HypothesisIds {
    created: RwLock<u32>,
}

impl HypothesisIds {
    pub fn new() -> Self {
        HypothesisIds::default()
    }

    pub fn next_id(&self) -> u32 {
        let mut created = self.created.write().unwrap_or_else(PoisonError::into_inner);
        *created = created.wrapping_add(1);
        *created
    }

    /// The number of ids handed out since the last reset.
    pub fn count(&self) -> u32 {
        *self.created.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts counting from zero, e.g. between independent decoding runs.
    pub fn reset(&self) {
        *self.created.write().unwrap_or_else(PoisonError::into_inner) = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn monotone_and_resettable() {
        let ids = HypothesisIds::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.count(), 2);
        ids.reset();
        assert_eq!(ids.count(), 0);
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn wraps_around() {
        let ids = HypothesisIds::new();
        *ids.created.write().unwrap() = u32::MAX - 1;
        assert_eq!(ids.next_id(), u32::MAX);
        assert_eq!(ids.next_id(), 0);
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn unique_across_threads() {
        let ids = HypothesisIds::new();
        let handed_out: Vec<Vec<u32>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| (0..250).map(|_| ids.next_id()).collect::<Vec<_>>()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        let unique: HashSet<u32> = handed_out.into_iter().flatten().collect();
        assert_eq!(unique.len(), 1000);
        assert_eq!(ids.count(), 1000);
    }
}
