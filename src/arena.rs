use std::sync::Mutex;

use index_vec::{Idx, IndexVec};

/// Thread-safe arena handing out typed index handles.
///
/// Slots are only ever appended; the whole arena is released at once via
/// [`Arena::into_inner`] (or by dropping it), never slot by slot. Concurrent
/// `alloc` calls from the parallel build contend only on a short append under
/// the lock.
#[derive(Debug)]
pub struct Arena<I: Idx, T> {
    items: Mutex<IndexVec<I, T>>,
    capacity: Option<usize>,
}

impl<I: Idx, T> Default for Arena<I, T> {
    fn default() -> Arena<I, T> {
        Arena::new()
    }
}

impl<I: Idx, T> Arena<I, T> {
    pub fn new() -> Arena<I, T> {
        Arena {
            items: Mutex::new(IndexVec::new()),
            capacity: None,
        }
    }

    /// Pre-sized arena with a hard limit. Exceeding the limit is fatal;
    /// arenas are expected to be sized for the whole build up front.
    pub fn bounded(capacity: usize) -> Arena<I, T> {
        Arena {
            items: Mutex::new(IndexVec::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    pub fn alloc(&self, value: T) -> I {
        let mut items = self.items.lock().expect("Poisoned lock!");
        if let Some(capacity) = self.capacity {
            assert!(items.len() < capacity, "arena exhausted ({capacity} slots)");
        }
        items.push(value)
    }

    pub fn update<R>(&self, index: I, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.items.lock().expect("Poisoned lock!")[index])
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("Poisoned lock!").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases the arena, returning the backing storage in one piece.
    pub fn into_inner(self) -> IndexVec<I, T> {
        self.items.into_inner().expect("Poisoned lock!")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use assert2::assert;

    index_vec::define_index_type! {
        struct TestIdx = u32;
    }

    #[test]
    fn alloc_returns_sequential_handles() {
        let arena: Arena<TestIdx, &str> = Arena::new();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert!(a.raw() == 0);
        assert!(b.raw() == 1);

        let items = arena.into_inner();
        assert!(items[a] == "a");
        assert!(items[b] == "b");
    }

    #[test]
    fn update_mutates_slot() {
        let arena: Arena<TestIdx, u32> = Arena::new();
        let id = arena.alloc(1);
        arena.update(id, |slot| *slot += 10);
        assert!(arena.into_inner()[id] == 11);
    }

    #[test]
    fn concurrent_alloc_keeps_every_item() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;

        let arena: Arena<TestIdx, usize> = Arena::new();
        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let arena = &arena;
                scope.spawn(move || {
                    for i in 0..PER_THREAD {
                        arena.alloc(t * PER_THREAD + i);
                    }
                });
            }
        });

        let mut items: Vec<usize> = arena.into_inner().into_iter().collect();
        items.sort_unstable();
        assert!(items == (0..THREADS * PER_THREAD).collect::<Vec<_>>());
    }

    #[test]
    fn bounded_arena_allows_up_to_capacity() {
        let arena: Arena<TestIdx, u32> = Arena::bounded(2);
        arena.alloc(1);
        arena.alloc(2);
        assert!(arena.len() == 2);
    }

    #[test]
    #[should_panic(expected = "arena exhausted")]
    fn bounded_arena_panics_on_exhaustion() {
        let arena: Arena<TestIdx, u32> = Arena::bounded(2);
        arena.alloc(1);
        arena.alloc(2);
        arena.alloc(3);
    }
}
