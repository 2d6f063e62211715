//! Cost-indexed buckets of shapes awaiting expansion.
//!
//! A shape sits in at most one bucket; rescheduling moves it.

use std::collections::{BTreeSet, HashMap};

use crate::shape::Shape;

#[derive(Debug)]
pub struct Frontier {
    buckets: Vec<BTreeSet<Shape>>,
    placed: HashMap<Shape, u32>,
}

impl Frontier {
    /// Buckets `0..max_cost`.
    pub fn new(max_cost: u32) -> Self {
        Self {
            buckets: vec![BTreeSet::new(); max_cost as usize],
            placed: HashMap::new(),
        }
    }

    pub fn max_cost(&self) -> u32 {
        self.buckets.len() as u32
    }

    /// Place `shape` in bucket `cost`, leaving any previous bucket.
    /// Returns false (and changes nothing) when `cost` is out of range.
    pub fn schedule(&mut self, shape: Shape, cost: u32) -> bool {
        if cost >= self.max_cost() {
            return false;
        }
        if let Some(old) = self.placed.insert(shape, cost) {
            if old != cost {
                self.buckets[old as usize].remove(&shape);
            }
        }
        self.buckets[cost as usize].insert(shape);
        true
    }

    /// Bucket currently holding `shape`.
    pub fn bucket_of(&self, shape: Shape) -> Option<u32> {
        self.placed.get(&shape).copied()
    }

    /// Remove and return up to `n` of the smallest shapes in bucket `cost`.
    pub fn take_batch(&mut self, cost: u32, n: usize) -> Vec<Shape> {
        let Some(bucket) = self.buckets.get_mut(cost as usize) else {
            return Vec::new();
        };
        let taken = match bucket.iter().nth(n).copied() {
            Some(first_kept) => {
                let rest = bucket.split_off(&first_kept);
                std::mem::replace(bucket, rest)
            }
            None => std::mem::take(bucket),
        };
        for shape in &taken {
            self.placed.remove(shape);
        }
        taken.into_iter().collect()
    }

    pub fn pending(&self, cost: u32) -> usize {
        self.buckets.get(cost as usize).map_or(0, BTreeSet::len)
    }

    pub fn total(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    /// Lowest non-empty bucket.
    pub fn lowest(&self) -> Option<u32> {
        self.buckets
            .iter()
            .position(|bucket| !bucket.is_empty())
            .map(|i| i as u32)
    }

    /// `(cost, count)` for every non-empty bucket.
    pub fn summary(&self) -> Vec<(u32, usize)> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(cost, bucket)| (cost as u32, bucket.len()))
            .collect()
    }
}
