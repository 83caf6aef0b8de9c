use crate::error::DecoderError;
use std::any::Any;

/// Mutable per-worker resources of stateful features, e.g. the scratch
/// buffers of a neural model instance.
///
/// Every decoding thread owns exactly one `WorkerContext` and passes it to
/// every hypothesis it scores. The context is `Send` (it may be moved into a
/// worker thread) but not `Sync`, so an instance can never be used by two
/// workers at once.
pub struct WorkerContext {
    worker: usize,
    // indexed by stateful feature slot
    scratch: Vec<Option<Box<dyn Any + Send>>>,
}

impl WorkerContext {
    pub fn new(worker: usize) -> Self {
        WorkerContext {
            worker,
            scratch: Vec::new(),
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker
    }

    pub fn is_initialised(&self, slot: usize) -> bool {
        self.scratch.get(slot).map_or(false, Option::is_some)
    }

    /// Returns the scratch instance of the stateful feature in `slot`,
    /// constructing it on first use.
    ///
    /// Construction failures are reported while features are loaded, so a
    /// failure at this point is treated as fatal.
    pub fn get_or_init<T, F>(&mut self, slot: usize, feature: &str, init: F) -> &mut T
    where
        T: Any + Send,
        F: FnOnce() -> Result<T, DecoderError>,
    {
        if slot >= self.scratch.len() {
            self.scratch.resize_with(slot + 1, || None);
        }
        if self.scratch[slot].is_none() {
            let instance = init().unwrap_or_else(|err| panic!("{}", err));
            tracing::debug!(worker = self.worker, feature, "constructed worker instance");
            self.scratch[slot] = Some(Box::new(instance));
        }
        match self.scratch[slot].as_mut().and_then(|s| s.downcast_mut::<T>()) {
            Some(instance) => instance,
            None => panic!(
                "worker instance of `{}` in slot {} has an unexpected type",
                feature, slot
            ),
        }
    }
}
