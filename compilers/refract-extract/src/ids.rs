use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use refract_protocol::FrameId;

use crate::ExtractError;

/// Supplier of frame ids. Ids never repeat within one source and never
/// decrease in acquisition order.
pub trait IdSource {
    fn next_id(&mut self) -> Result<FrameId, ExtractError>;
}

impl<T: IdSource + ?Sized> IdSource for &mut T {
    fn next_id(&mut self) -> Result<FrameId, ExtractError> {
        (**self).next_id()
    }
}

/// Plain counter for single-worker runs.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    next: u64,
    exhausted: bool,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting at `seed`.
    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: seed,
            exhausted: false,
        }
    }

    /// The id the next call will hand out, if any is left.
    pub fn peek(&self) -> Option<u64> {
        (!self.exhausted).then_some(self.next)
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> Result<FrameId, ExtractError> {
        if self.exhausted {
            return Err(ExtractError::IdsExhausted { namespace: None });
        }
        let id = self.next;
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => self.exhausted = true,
        }
        Ok(FrameId(id))
    }
}

/// Counter confined to the upper 32 bits `namespace`, so workers with
/// distinct namespaces never collide and need no coordination.
#[derive(Debug, Clone)]
pub struct NamespacedIds {
    namespace: u32,
    local: u32,
    exhausted: bool,
}

impl NamespacedIds {
    pub fn new(namespace: u32) -> Self {
        Self {
            namespace,
            local: 0,
            exhausted: false,
        }
    }

    pub fn namespace(&self) -> u32 {
        self.namespace
    }
}

impl IdSource for NamespacedIds {
    fn next_id(&mut self) -> Result<FrameId, ExtractError> {
        if self.exhausted {
            return Err(ExtractError::IdsExhausted {
                namespace: Some(self.namespace),
            });
        }
        let id = (u64::from(self.namespace) << 32) | u64::from(self.local);
        match self.local.checked_add(1) {
            Some(next) => self.local = next,
            None => self.exhausted = true,
        }
        Ok(FrameId(id))
    }
}

/// Counter shared between threads. Clones hand out from the same sequence.
#[derive(Debug, Clone, Default)]
pub struct SharedIds {
    next: Arc<AtomicU64>,
    /// Set once `u64::MAX` has been handed out.
    exhausted: Arc<AtomicBool>,
}

impl SharedIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(seed)),
            exhausted: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl IdSource for SharedIds {
    fn next_id(&mut self) -> Result<FrameId, ExtractError> {
        match self.next.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1)) {
            Ok(id) => Ok(FrameId(id)),
            // The counter sits at u64::MAX: only the first caller gets it.
            Err(last) if !self.exhausted.swap(true, Ordering::Relaxed) => Ok(FrameId(last)),
            Err(_) => Err(ExtractError::IdsExhausted { namespace: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequential_returns_then_increments() {
        let mut ids = SequentialIds::starting_at(41);
        assert_eq!(ids.next_id().unwrap(), FrameId(41));
        assert_eq!(ids.next_id().unwrap(), FrameId(42));
        assert_eq!(ids.peek(), Some(43));

        let mut last = SequentialIds::starting_at(u64::MAX);
        assert_eq!(last.next_id().unwrap(), FrameId(u64::MAX));
        assert_eq!(last.peek(), None);
        assert!(matches!(last.next_id(), Err(ExtractError::IdsExhausted { namespace: None })));
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let mut a = NamespacedIds::new(0);
        let mut b = NamespacedIds::new(1);
        assert_eq!(a.next_id().unwrap(), FrameId(0));
        assert_eq!(b.next_id().unwrap(), FrameId(1 << 32));
        assert_eq!(b.next_id().unwrap(), FrameId((1 << 32) + 1));
        assert_eq!(b.namespace(), 1);
    }

    #[test]
    fn test_namespace_exhaustion_is_an_error() {
        let mut ids = NamespacedIds {
            namespace: 3,
            local: u32::MAX,
            exhausted: false,
        };
        assert_eq!(ids.next_id().unwrap(), FrameId((3 << 32) | u64::from(u32::MAX)));
        assert!(matches!(ids.next_id(), Err(ExtractError::IdsExhausted { namespace: Some(3) })));
    }

    #[test]
    fn test_shared_ids_do_not_wrap() {
        let mut ids = SharedIds::starting_at(u64::MAX - 1);
        let mut clone = ids.clone();
        assert_eq!(ids.next_id().unwrap(), FrameId(u64::MAX - 1));
        assert_eq!(clone.next_id().unwrap(), FrameId(u64::MAX));
        assert!(matches!(ids.next_id(), Err(ExtractError::IdsExhausted { namespace: None })));
        assert!(matches!(clone.next_id(), Err(ExtractError::IdsExhausted { namespace: None })));
    }

    #[test]
    fn test_shared_ids_across_threads() {
        let ids = SharedIds::starting_at(5);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mut ids = ids.clone();
                std::thread::spawn(move || (0..100).map(|_| ids.next_id().unwrap()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 400);
        assert!(seen.iter().all(|id| id.0 >= 5 && id.0 < 405));
    }
}
