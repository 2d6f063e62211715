//! Pure shape transforms: cutting, stacking, pins and crystals.
//!
//! All functions are total over `u32`; physically meaningless inputs produce a
//! well-defined value, and `0` stands for "nothing left".

use crate::shape::{Shape, CRYSTAL_MASK, LAYER_MASK, NUM_LAYERS, NUM_QUADS, NUM_SPOTS, PIN_MASK};

/// Spot adjacency that never crosses the vertical cut (quads 0|1 and 2|3 stay
/// apart from each other) plus vertical neighbours.
const CUT_MESH: [&[u8]; NUM_SPOTS as usize] = [
    &[1, 4],
    &[0, 5],
    &[3, 6],
    &[2, 7],
    &[0, 5, 8],
    &[1, 4, 9],
    &[2, 7, 10],
    &[3, 6, 11],
    &[4, 9, 12],
    &[5, 8, 13],
    &[6, 11, 14],
    &[7, 10, 15],
    &[8, 13],
    &[9, 12],
    &[10, 15],
    &[11, 14],
];

/// Full ring adjacency for layers 0..=2; the top layer is pushed out by a pin
/// push so its spots have no outgoing edges.
const RING_MESH: [&[u8]; NUM_SPOTS as usize] = [
    &[1, 3, 4],
    &[0, 2, 5],
    &[1, 3, 6],
    &[0, 2, 7],
    &[0, 5, 7, 8],
    &[1, 4, 6, 9],
    &[2, 5, 7, 10],
    &[3, 4, 6, 11],
    &[4, 9, 11, 12],
    &[5, 8, 10, 13],
    &[6, 9, 11, 14],
    &[7, 8, 10, 15],
    &[],
    &[],
    &[],
    &[],
];

#[inline]
fn occupied(value: u32) -> u32 {
    (value & 0xffff) | (value >> 16)
}

/// Crystal bits of every spot connected (through crystal spots) to `seeds`.
///
/// Iterative flood fill with a worklist and a visited bitset.
fn connected_crystals(shape: u32, seeds: &[u32], mesh: &[&[u8]; NUM_SPOTS as usize]) -> u32 {
    let mut visited: u16 = 0;
    let mut todo: Vec<u32> = Vec::with_capacity(NUM_SPOTS as usize);
    for &spot in seeds {
        if visited & (1 << spot) == 0 {
            visited |= 1 << spot;
            todo.push(spot);
        }
    }
    let mut found = 0;
    while let Some(spot) = todo.pop() {
        found |= CRYSTAL_MASK << spot;
        for &next in mesh[spot as usize] {
            let next = u32::from(next);
            if visited & (1 << next) != 0 {
                continue;
            }
            if (shape >> next) & CRYSTAL_MASK == CRYSTAL_MASK {
                visited |= 1 << next;
                todo.push(next);
            }
        }
    }
    found
}

/// Pin bit for `spot`, or nothing when the spot is above the top layer.
#[inline]
fn pin_at(spot: u32) -> u32 {
    if spot < NUM_SPOTS {
        PIN_MASK << spot
    } else {
        0
    }
}

/// Drop a single rigid `part` (solid bits of one layer) that starts at `layer`
/// onto `base`. Anything landing above the top layer is lost.
fn drop_part(base: u32, part: u32, layer: u32) -> u32 {
    if part == 0 {
        return base;
    }
    let occ = occupied(base);
    for offset in (1..=layer).rev() {
        if (part << (4 * (offset - 1))) & occ != 0 {
            return base | ((part << (4 * offset)) & 0xffff);
        }
    }
    base | part
}

/// Drop a pin in column `quad` starting at `layer` onto `base`.
fn drop_pin(base: u32, quad: u32, layer: u32) -> u32 {
    let column = 1u32 << quad;
    let occ = occupied(base);
    for offset in (1..=layer).rev() {
        if (column << (4 * (offset - 1))) & occ != 0 {
            return base | pin_at(4 * offset + quad);
        }
    }
    base | (PIN_MASK << quad)
}

/// Split a one-layer part into its rigid pieces: the diagonal pairs `0x5` and
/// `0xa` fall apart, everything else holds together.
#[inline]
fn pieces(part: u32) -> [u32; 2] {
    match part & 0xf {
        0x5 => [part & CRYSTAL_MASK, part & (CRYSTAL_MASK << 2)],
        0xa => [part & (CRYSTAL_MASK << 1), part & (CRYSTAL_MASK << 3)],
        _ => [part, 0],
    }
}

/// Let every layer above the bottom settle. Only `quads` are searched for pins.
///
/// Pins fall straight down their column. Pieces touching the settled layer
/// below stay; the rest lose their crystals and drop as solids.
fn collapse(shape: u32, quads: &[u32]) -> u32 {
    let mut result = shape & LAYER_MASK;
    for layer in 1..NUM_LAYERS {
        let mut part = (shape >> (4 * layer)) & LAYER_MASK;
        if part == 0 {
            continue;
        }
        for &quad in quads {
            if (part >> quad) & CRYSTAL_MASK == PIN_MASK {
                part &= !(PIN_MASK << quad);
                result = drop_pin(result, quad, layer);
            }
        }
        let below = occupied((result >> (4 * (layer - 1))) & LAYER_MASK);
        for piece in pieces(part) {
            if piece == 0 {
                continue;
            }
            if piece & below != 0 {
                result |= piece << (4 * layer);
                continue;
            }
            let solid = piece & !((piece >> 16) * CRYSTAL_MASK);
            for rest in pieces(solid) {
                result = drop_part(result, rest, layer);
            }
        }
    }
    result
}

/// Cut the shape and keep the left half (quads 2, 3).
pub fn cut_left(shape: Shape) -> Shape {
    Shape(cut(shape.0, [3, 2], 0xcccc_cccc, &[2, 3]))
}

/// Cut the shape and keep the right half (quads 0, 1).
pub fn cut_right(shape: Shape) -> Shape {
    Shape(cut(shape.0, [0, 1], 0x3333_3333, &[0, 1]))
}

/// `seed_quads`: the kept-side quads next to the 3|0 and 1|2 seams.
fn cut(shape: u32, seed_quads: [u32; 2], keep: u32, quads: &[u32]) -> u32 {
    let mut seeds = Vec::with_capacity(2 * NUM_LAYERS as usize);
    for (layer, bits) in Shape(shape).layers().iter().enumerate() {
        let layer = layer as u32;
        if bits & 0x99 == 0x99 {
            seeds.push(NUM_QUADS * layer + seed_quads[0]);
        }
        if bits & 0x66 == 0x66 {
            seeds.push(NUM_QUADS * layer + seed_quads[1]);
        }
    }
    let broken = connected_crystals(shape, &seeds, &CUT_MESH);
    collapse(shape & !broken & keep, quads)
}

/// Turn the occupied bottom quads into pins and lift everything one layer.
///
/// Crystals bridging layer 2 and the pushed-out top layer shatter first.
pub fn pin_push(shape: Shape) -> Shape {
    let mut value = shape.0;
    let pins = (occupied(value) & 0xf) * PIN_MASK;

    let seeds: Vec<u32> = (8..12)
        .filter(|&spot| {
            (value >> spot) & CRYSTAL_MASK == CRYSTAL_MASK
                && (value >> (spot + 4)) & CRYSTAL_MASK == CRYSTAL_MASK
        })
        .collect();
    value &= !connected_crystals(value, &seeds, &RING_MESH);

    let (v1, v2) = (value & 0xffff, value >> 16);
    let lifted = ((v2 & 0x0fff) << 20) | ((v1 & 0x0fff) << 4) | pins;
    Shape(collapse(lifted, &[0, 1, 2, 3]))
}

/// Fill every gap and pin of each occupied layer with crystal.
pub fn crystallize(shape: Shape) -> Shape {
    let mut value = shape.0;
    for layer in 0..shape.layer_count() {
        let gaps = !value & (0xf << (4 * layer));
        value |= gaps | (gaps << 16);
    }
    Shape(value)
}

/// Crystallize only when the shape has exactly one gap (pins count as gaps).
pub fn crystallize_one(shape: Shape) -> Shape {
    let spots = shape.layer_count() * NUM_QUADS;
    let gaps = (0..spots).filter(|&spot| shape.0 & (1 << spot) == 0).count();
    if gaps == 1 {
        crystallize(shape)
    } else {
        Shape::EMPTY
    }
}

/// Right half of `left` joined with the left half of `right`.
pub fn swap_left(left: Shape, right: Shape) -> Shape {
    Shape(cut_left(right).0 | cut_right(left).0)
}

/// Left half of `left` joined with the right half of `right`.
pub fn swap_right(left: Shape, right: Shape) -> Shape {
    Shape(cut_left(left).0 | cut_right(right).0)
}

/// Join two halves without cutting. Callers guarantee the halves are disjoint
/// (one operand left-only, the other right-only); otherwise the result is
/// meaningless.
#[inline]
pub fn fast_swap(a: Shape, b: Shape) -> Shape {
    Shape(a.0 | b.0)
}

/// Drop `top` layer by layer onto `bottom`.
///
/// Crystals in `top` shatter, its pins fall down their columns, and the
/// remaining solids of each layer drop as rigid pieces.
pub fn stack(top: Shape, bottom: Shape) -> Shape {
    let top = top.0 & !((top.v1() & top.v2()) * CRYSTAL_MASK);
    let mut bottom = bottom.0;
    for layer in 0..NUM_LAYERS {
        let mut part = (top >> (4 * layer)) & LAYER_MASK;
        if part == 0 {
            continue;
        }
        for quad in 0..NUM_QUADS {
            if (part >> quad) & CRYSTAL_MASK == PIN_MASK {
                part &= !(PIN_MASK << quad);
                bottom = drop_pin(bottom, quad, NUM_LAYERS);
            }
        }
        for piece in pieces(part) {
            bottom = drop_part(bottom, piece, NUM_LAYERS);
        }
    }
    Shape(bottom)
}

/// `stack` restricted to a one-layer, crystal-free `top`; `0` otherwise.
pub fn fast_stack(top: Shape, bottom: Shape) -> Shape {
    if !top.is_one_layer() || top.has_crystal() {
        return Shape::EMPTY;
    }
    stack(top, bottom)
}
