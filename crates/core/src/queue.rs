use parking_lot::Mutex;
use std::collections::VecDeque;

/// FIFO of scripts waiting for the game client to poll them.
pub struct ExecutionQueue {
    items: Mutex<VecDeque<String>>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub fn enqueue(&self, code: String) {
        let mut items = self.items.lock();
        items.push_back(code);
        tracing::debug!("Queued script ({} pending)", items.len());
    }

    /// Take the oldest script. Never waits.
    pub fn dequeue(&self) -> Option<String> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl Default for ExecutionQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fifo_order_with_duplicates() {
        let queue = ExecutionQueue::new();
        queue.enqueue("a".to_string());
        queue.enqueue("b".to_string());
        queue.enqueue("a".to_string());

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue().as_deref(), Some("a"));
        assert_eq!(queue.dequeue().as_deref(), Some("b"));
        assert_eq!(queue.dequeue().as_deref(), Some("a"));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let queue = Arc::new(ExecutionQueue::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        queue.enqueue(format!("{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 800);

        // Each producer's items keep their relative order.
        let mut last_seen = [None::<usize>; 8];
        while let Some(item) = queue.dequeue() {
            let (t, i) = item.split_once('-').unwrap();
            let (t, i): (usize, usize) = (t.parse().unwrap(), i.parse().unwrap());
            if let Some(prev) = last_seen[t] {
                assert!(i > prev);
            }
            last_seen[t] = Some(i);
        }
    }
}
