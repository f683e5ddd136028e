//! Frontier of page URLs waiting to be visited
//!
//! The frontier owns both the pending queue and the visited set so the two
//! can never overlap: a URL is enqueued at most once until visited, and once
//! visited it is never enqueued again.

use std::collections::{HashSet, VecDeque};

/// Deduplicated FIFO work queue of page URLs
#[derive(Debug, Default)]
pub struct Frontier {
    /// Pending URLs in discovery order
    queue: VecDeque<String>,

    /// Membership index for `queue`
    pending: HashSet<String>,

    /// URLs already dequeued and visited
    visited: HashSet<String>,

    /// Visit order, kept for results export
    visit_order: Vec<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL to the pending queue
    ///
    /// Returns false without changing anything if the URL is already
    /// pending or has already been visited.
    pub fn enqueue(&mut self, url: &str) -> bool {
        if self.visited.contains(url) || self.pending.contains(url) {
            return false;
        }

        self.pending.insert(url.to_string());
        self.queue.push_back(url.to_string());
        true
    }

    /// Removes and returns the oldest pending URL
    pub fn dequeue(&mut self) -> Option<String> {
        let url = self.queue.pop_front()?;
        self.pending.remove(&url);
        Some(url)
    }

    /// Records a URL as visited, dropping it from the pending set if present
    ///
    /// Returns false if the URL was already visited.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        if !self.visited.insert(url.to_string()) {
            return false;
        }

        if self.pending.remove(url) {
            self.queue.retain(|u| u != url);
        }
        self.visit_order.push(url.to_string());
        true
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    #[cfg(test)]
    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains(url)
    }

    /// Returns the number of URLs waiting to be visited
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Visited URLs in the order they were visited
    pub fn visited_urls(&self) -> &[String] {
        &self.visit_order
    }

    /// Pending URLs in the order they will be dequeued
    #[cfg(test)]
    pub fn pending_urls(&self) -> impl Iterator<Item = &String> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(frontier: &Frontier) {
        for url in frontier.pending_urls() {
            assert!(!frontier.is_visited(url), "{} is both pending and visited", url);
        }
    }

    #[test]
    fn test_new_frontier() {
        let frontier = Frontier::new();
        assert!(frontier.is_empty());
        assert_eq!(frontier.len(), 0);
        assert!(frontier.visited_urls().is_empty());
    }

    #[test]
    fn test_enqueue_deduplicates() {
        let mut frontier = Frontier::new();
        assert!(frontier.enqueue("https://a/1"));
        assert!(!frontier.enqueue("https://a/1"));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_dequeue_is_fifo() {
        let mut frontier = Frontier::new();
        frontier.enqueue("https://a/1");
        frontier.enqueue("https://a/2");
        frontier.enqueue("https://a/3");

        assert_eq!(frontier.dequeue().as_deref(), Some("https://a/1"));
        assert_eq!(frontier.dequeue().as_deref(), Some("https://a/2"));
        assert_eq!(frontier.dequeue().as_deref(), Some("https://a/3"));
        assert_eq!(frontier.dequeue(), None);
    }

    #[test]
    fn test_visited_url_is_never_requeued() {
        let mut frontier = Frontier::new();
        frontier.enqueue("https://a/1");
        let url = frontier.dequeue().unwrap();
        assert!(frontier.mark_visited(&url));

        assert!(!frontier.enqueue("https://a/1"));
        assert!(frontier.is_empty());
        assert_disjoint(&frontier);
    }

    #[test]
    fn test_mark_visited_is_idempotent() {
        let mut frontier = Frontier::new();
        assert!(frontier.mark_visited("https://a/1"));
        assert!(!frontier.mark_visited("https://a/1"));
        assert_eq!(frontier.visited_urls(), &["https://a/1".to_string()]);
    }

    #[test]
    fn test_mark_visited_removes_pending_entry() {
        let mut frontier = Frontier::new();
        frontier.enqueue("https://a/1");
        frontier.enqueue("https://a/2");

        frontier.mark_visited("https://a/1");

        assert!(!frontier.is_pending("https://a/1"));
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.dequeue().as_deref(), Some("https://a/2"));
        assert_disjoint(&frontier);
    }
}
