//! Best-first frontier for the deep crawl

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A URL waiting to be visited
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub url: String,
    pub depth: u32,
    /// Relevance in `[0, 1]`
    pub score: f64,
}

#[derive(Debug)]
struct Entry {
    candidate: Candidate,
    seq: u64,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Highest score first, then earliest insertion
        self.candidate
            .score
            .total_cmp(&other.candidate.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Entry {}

/// Priority queue of candidates ordered by score, ties by insertion order
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mut candidate: Candidate) {
        candidate.score = clamp_score(candidate.score);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { candidate, seq });
    }

    pub fn pop(&mut self) -> Option<Candidate> {
        self.heap.pop().map(|entry| entry.candidate)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
