//! Shape totals by layer count, symmetry class and cost.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::shape::{Shape, NUM_LAYERS};
use crate::solver::Build;

/// Shapes with at most `max_layers` layers, and how many of them are keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerCensus {
    pub max_layers: u32,
    pub shapes: usize,
    pub keys: usize,
}

/// Cumulative totals for 1..=4 layers.
pub fn layer_census(shapes: &[Shape]) -> Vec<LayerCensus> {
    let (by_layer, keys_by_layer) = shapes
        .par_iter()
        .fold(
            || ([0usize; 5], [0usize; 5]),
            |(mut all, mut keys), &shape| {
                let n = shape.layer_count() as usize;
                all[n] += 1;
                if shape.is_key() {
                    keys[n] += 1;
                }
                (all, keys)
            },
        )
        .reduce(
            || ([0usize; 5], [0usize; 5]),
            |(a, ka), (b, kb)| {
                let mut all = [0usize; 5];
                let mut keys = [0usize; 5];
                for i in 0..5 {
                    all[i] = a[i] + b[i];
                    keys[i] = ka[i] + kb[i];
                }
                (all, keys)
            },
        );
    (1..=NUM_LAYERS)
        .map(|max_layers| {
            let upto = max_layers as usize + 1;
            LayerCensus {
                max_layers,
                shapes: by_layer[1..upto].iter().sum(),
                keys: keys_by_layer[1..upto].iter().sum(),
            }
        })
        .collect()
}

/// Number of records per cost.
pub fn cost_histogram<'a>(records: impl IntoIterator<Item = &'a (Shape, Build)>) -> BTreeMap<u32, usize> {
    let mut out = BTreeMap::new();
    for (_, build) in records {
        *out.entry(build.cost).or_insert(0) += 1;
    }
    out
}
