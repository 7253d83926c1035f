//! Unordered multiset of endpoints with random polling.

use rand::Rng;
use std::sync::Mutex;

/// A thread-safe bag of elements with non-blocking `offer`, best-effort
/// `remove`, and `poll_random`.
///
/// The only ordering contract is that there is none: no caller may assume
/// FIFO or LIFO behavior. Polling removes and returns an element chosen
/// uniformly at random from the current contents.
#[derive(Debug)]
pub struct RandomizedQueue<T> {
    items: Mutex<Vec<T>>,
}

impl<T> RandomizedQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Add an element.
    pub fn offer(&self, item: T) {
        self.items.lock().expect("queue lock poisoned").push(item);
    }

    /// Remove and return a random element, or `None` if the queue is empty.
    pub fn poll_random(&self) -> Option<T> {
        let mut items = self.items.lock().expect("queue lock poisoned");
        if items.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..items.len());
        Some(items.swap_remove(idx))
    }

    /// Get the current element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().expect("queue lock poisoned").len()
    }

    /// Check whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: PartialEq> RandomizedQueue<T> {
    /// Remove one occurrence of `item`. Best-effort: returns `false` if the
    /// item was not present.
    pub fn remove(&self, item: &T) -> bool {
        let mut items = self.items.lock().expect("queue lock poisoned");
        if let Some(idx) = items.iter().position(|i| i == item) {
            items.swap_remove(idx);
            true
        } else {
            false
        }
    }
}

impl<T> Default for RandomizedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_offer_and_poll() {
        let queue = RandomizedQueue::new();
        assert!(queue.is_empty());

        queue.offer(1);
        queue.offer(2);
        queue.offer(3);
        assert_eq!(queue.len(), 3);

        let mut drained = HashSet::new();
        while let Some(item) = queue.poll_random() {
            drained.insert(item);
        }

        assert_eq!(drained, HashSet::from([1, 2, 3]));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_poll_empty_returns_none() {
        let queue: RandomizedQueue<u32> = RandomizedQueue::new();
        assert_eq!(queue.poll_random(), None);
    }

    #[test]
    fn test_remove() {
        let queue = RandomizedQueue::new();
        queue.offer("a");
        queue.offer("b");

        assert!(queue.remove(&"a"));
        assert!(!queue.remove(&"a"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.poll_random(), Some("b"));
    }

    #[test]
    fn test_remove_one_occurrence() {
        let queue = RandomizedQueue::new();
        queue.offer(7);
        queue.offer(7);

        assert!(queue.remove(&7));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_concurrent_offer_and_poll() {
        let queue = Arc::new(RandomizedQueue::new());
        let mut handles = Vec::new();

        for t in 0..4 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    queue.offer(t * 100 + i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut drained = 0;
        while queue.poll_random().is_some() {
            drained += 1;
        }
        assert_eq!(drained, 400);
    }
}
