use std::collections::VecDeque;

/// Load-order record of resident pages. New loads go in at the back, the
/// eviction victim always comes off the front.
pub struct FifoTracker {
    queue: VecDeque<u64>,
}

impl FifoTracker {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn record_load(&mut self, pgn: u64) {
        self.queue.push_back(pgn);
    }

    /// Removes and returns the oldest-loaded page. `None` means nothing was
    /// ever loaded; during an active fault the caller treats that as an
    /// accounting invariant violation and aborts.
    pub fn select_victim(&mut self) -> Option<u64> {
        self.queue.pop_front()
    }

    /// Undoes a `select_victim` when a fault aborts after victim selection.
    pub fn restore_oldest(&mut self, pgn: u64) {
        self.queue.push_front(pgn);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Current load order, oldest first.
    pub fn snapshot(&self) -> Vec<u64> {
        self.queue.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for FifoTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victim_is_oldest_load() {
        let mut fifo = FifoTracker::new();
        fifo.record_load(3);
        fifo.record_load(1);
        fifo.record_load(7);
        assert_eq!(fifo.select_victim(), Some(3));
        assert_eq!(fifo.select_victim(), Some(1));
        assert_eq!(fifo.select_victim(), Some(7));
        assert_eq!(fifo.select_victim(), None);
    }

    #[test]
    fn restore_puts_page_back_at_the_oldest_end() {
        let mut fifo = FifoTracker::new();
        fifo.record_load(2);
        fifo.record_load(5);
        let victim = fifo.select_victim().unwrap();
        fifo.restore_oldest(victim);
        assert_eq!(fifo.snapshot(), vec![2, 5]);
    }
}
