use std::collections::VecDeque;

/// Holds outbound items until the frame is ready, then releases them in
/// submission order.
///
/// The gate opens once per lifetime; later `mark_ready` calls are no-ops.
#[derive(Debug)]
pub struct ReadyGate<T> {
    ready: bool,
    queue: VecDeque<T>,
}

impl<T> ReadyGate<T> {
    pub fn new() -> Self {
        Self {
            ready: false,
            queue: VecDeque::new(),
        }
    }

    /// Queue `item` if the gate is closed. Hands it back if the caller
    /// should transmit it right away.
    pub fn submit(&mut self, item: T) -> Option<T> {
        if self.ready {
            Some(item)
        } else {
            self.queue.push_back(item);
            None
        }
    }

    /// Open the gate. Returns the queued items (FIFO) on the first call,
    /// `None` afterwards.
    pub fn mark_ready(&mut self) -> Option<Vec<T>> {
        if self.ready {
            return None;
        }
        self.ready = true;
        Some(self.queue.drain(..).collect())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of items waiting for the gate to open.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Discard everything still queued.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<T> Default for ReadyGate<T> {
    fn default() -> Self {
        Self::new()
    }
}
