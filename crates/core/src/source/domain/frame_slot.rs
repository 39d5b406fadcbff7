use std::sync::{Arc, Mutex, MutexGuard};

use crate::shared::frame::Frame;
use crate::source::domain::frame_source::FrameSource;

/// Single-value publish/subscribe cell shared between threads.
///
/// Writers swap in a complete `Arc<T>`; readers clone the current `Arc`.
/// The lock only guards the pointer swap, so readers never observe a
/// partially written value and never block on detection or rendering.
pub struct SharedSlot<T> {
    state: Mutex<SlotState<T>>,
}

struct SlotState<T> {
    value: Option<Arc<T>>,
    generation: u64,
}

/// Slot holding the most recently captured (or rendered) frame.
pub type FrameSlot = SharedSlot<Frame>;

impl<T> SharedSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                generation: 0,
            }),
        }
    }

    /// Publishes a new value and returns its generation.
    pub fn publish(&self, value: T) -> u64 {
        self.publish_shared(Arc::new(value))
    }

    pub fn publish_shared(&self, value: Arc<T>) -> u64 {
        let mut state = self.lock();
        state.value = Some(value);
        state.generation += 1;
        state.generation
    }

    pub fn latest(&self) -> Option<Arc<T>> {
        self.lock().value.clone()
    }

    /// Current value together with the generation it was published at.
    pub fn snapshot(&self) -> (Option<Arc<T>>, u64) {
        let state = self.lock();
        (state.value.clone(), state.generation)
    }

    /// Number of publishes so far; 0 means nothing was ever published.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Empties the slot. The generation still advances so pollers notice.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.value = None;
        state.generation += 1;
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        // A panicking writer cannot leave a half-swapped Arc behind.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for SharedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FrameSlot {
    fn current(&self) -> Option<Arc<Frame>> {
        self.latest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_slot() {
        let slot = FrameSlot::new();
        assert!(slot.latest().is_none());
        assert_eq!(slot.generation(), 0);
        assert!(slot.current().is_none());
    }

    #[test]
    fn test_publish_replaces_value_and_advances_generation() {
        let slot = FrameSlot::new();
        assert_eq!(slot.publish(Frame::filled(2, 2, [1, 1, 1])), 1);
        assert_eq!(slot.publish(Frame::filled(2, 2, [2, 2, 2])), 2);

        let (frame, generation) = slot.snapshot();
        assert_eq!(generation, 2);
        assert_eq!(frame.unwrap().pixel(0, 0), [2, 2, 2]);
    }

    #[test]
    fn test_readers_keep_their_frame_after_republish() {
        let slot = FrameSlot::new();
        slot.publish(Frame::filled(2, 2, [1, 1, 1]));
        let held = slot.latest().unwrap();
        slot.publish(Frame::filled(4, 4, [9, 9, 9]));
        assert_eq!(held.dimensions(), (2, 2));
        assert_eq!(held.pixel(1, 1), [1, 1, 1]);
    }

    #[test]
    fn test_clear_empties_and_advances() {
        let slot = SharedSlot::<u32>::new();
        slot.publish(5);
        slot.clear();
        assert!(slot.latest().is_none());
        assert_eq!(slot.generation(), 2);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_frames() {
        let slot = Arc::new(FrameSlot::new());
        let writer_slot = slot.clone();

        let writer = thread::spawn(move || {
            for i in 0..200u32 {
                let value = (i % 256) as u8;
                writer_slot.publish(Frame::filled(16, 8, [value, value, value]));
            }
        });

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let slot = slot.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        if let Some(frame) = slot.latest() {
                            let first = frame.data()[0];
                            assert!(frame.data().iter().all(|&b| b == first));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(slot.generation(), 200);
    }
}
