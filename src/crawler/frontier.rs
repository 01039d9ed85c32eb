//! Crawl frontier
//!
//! Tracks which URLs have been dispatched and which are still waiting.
//! A URL moves to the visited set the moment it is handed out, so the
//! visited and pending sets are disjoint by construction and a URL is
//! dispatched at most once per frontier lifetime.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// Deduplicating work queue for one crawl pass
#[derive(Debug, Default)]
pub struct Frontier {
    visited: HashSet<Url>,
    pending: VecDeque<Url>,
    pending_set: HashSet<Url>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a URL for crawling
    ///
    /// Returns `true` if the URL was accepted, `false` if it was already
    /// visited or already pending.
    pub fn offer(&mut self, url: Url) -> bool {
        if self.visited.contains(&url) || self.pending_set.contains(&url) {
            return false;
        }
        self.pending_set.insert(url.clone());
        self.pending.push_back(url);
        true
    }

    /// Takes the next URL to dispatch, marking it visited
    pub fn next(&mut self) -> Option<Url> {
        let url = self.pending.pop_front()?;
        self.pending_set.remove(&url);
        self.visited.insert(url.clone());
        debug_assert!(self.visited.is_disjoint(&self.pending_set));
        Some(url)
    }

    /// URLs dispatched so far
    pub fn visited(&self) -> &HashSet<Url> {
        &self.visited
    }

    /// Number of URLs dispatched so far
    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Number of URLs still waiting to be dispatched
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True once nothing is waiting to be dispatched
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
