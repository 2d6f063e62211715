//! Bit-packed shapes: 4 layers × 4 quadrants × 2 attribute bits.
//!
//! Layout
//! - `v1` (low 16 bits): solid-presence bit per spot.
//! - `v2` (high 16 bits): pin/crystal bit per spot.
//! - Spot `4 * layer + quad`; layer 0 is the bottom, quads 0/1 form the right
//!   half and quads 2/3 the left half.
//! - Per spot `(v2, v1)`: `00` gap, `01` solid, `10` pin, `11` crystal.
//!
//! Invariants
//! - A *valid* shape is non-zero and has no empty layer below its topmost
//!   occupied layer (`has_gap() == false`).
//! - Every `u32` is a representable shape; validity is a separate predicate.
//!
//! References
//! - Code cross-refs: `code` (text codec), `crate::ops` (transition function).

mod code;

pub use code::ShapeCodeError;

use std::fmt;

/// Pin bit of spot 0 (shift by spot to address other spots).
pub const PIN_MASK: u32 = 0x0001_0000;
/// Solid bit of spot 0.
pub const SOLID_MASK: u32 = 0x0000_0001;
/// Both bits of spot 0; a spot equal to this mask holds a crystal.
pub const CRYSTAL_MASK: u32 = 0x0001_0001;
/// Both halves of layer 0.
pub const LAYER_MASK: u32 = 0x000f_000f;

pub const NUM_LAYERS: u32 = 4;
pub const NUM_QUADS: u32 = 4;
pub const NUM_SPOTS: u32 = NUM_LAYERS * NUM_QUADS;

/// One-layer solids with one quadrant.
pub const FLAT_1: [Shape; 4] = [Shape(0x1), Shape(0x2), Shape(0x4), Shape(0x8)];
/// One-layer solids with two quadrants.
pub const FLAT_2: [Shape; 6] = [
    Shape(0x3),
    Shape(0x5),
    Shape(0x6),
    Shape(0x9),
    Shape(0xa),
    Shape(0xc),
];
/// One-layer solids with three quadrants.
pub const FLAT_3: [Shape; 4] = [Shape(0x7), Shape(0xb), Shape(0xd), Shape(0xe)];
/// The full one-layer solid.
pub const FLAT_4: [Shape; 1] = [Shape(0xf)];
/// Single pins on the bottom layer.
pub const PIN_1: [Shape; 4] = [
    Shape(0x1_0000),
    Shape(0x2_0000),
    Shape(0x4_0000),
    Shape(0x8_0000),
];
/// A full layer of pins.
pub const PIN_4: [Shape; 1] = [Shape(0xf_0000)];

/// A shape value. Ordering is unsigned numeric order of the packed value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Shape(pub u32);

impl Shape {
    pub const EMPTY: Shape = Shape(0);

    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Solid-presence half (low 16 bits).
    #[inline]
    pub const fn v1(self) -> u32 {
        self.0 & 0xffff
    }

    /// Pin/crystal half (high 16 bits).
    #[inline]
    pub const fn v2(self) -> u32 {
        self.0 >> 16
    }

    /// Occupancy of every spot regardless of kind.
    #[inline]
    pub const fn occupied(self) -> u32 {
        self.v1() | self.v2()
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Layers from bottom to top, each packed as `(v2 nibble << 4) | v1 nibble`.
    pub fn layers(self) -> [u8; NUM_LAYERS as usize] {
        let mut out = [0u8; NUM_LAYERS as usize];
        let (mut v1, mut v2) = (self.v1(), self.v2());
        for slot in out.iter_mut() {
            *slot = (((v2 & 0xf) << 4) | (v1 & 0xf)) as u8;
            v1 >>= 4;
            v2 >>= 4;
        }
        out
    }

    /// Number of layers up to and including the topmost occupied one.
    pub const fn layer_count(self) -> u32 {
        let occ = self.occupied();
        if occ == 0 {
            0
        } else if occ <= 0xf {
            1
        } else if occ <= 0xff {
            2
        } else if occ <= 0xfff {
            3
        } else {
            4
        }
    }

    /// An interior layer is empty while a higher layer is occupied.
    pub fn has_gap(self) -> bool {
        let n = self.layer_count();
        (0..n.saturating_sub(1)).any(|layer| self.0 & (LAYER_MASK << (4 * layer)) == 0)
    }

    pub fn is_valid(self) -> bool {
        !self.is_empty() && !self.has_gap()
    }

    /// Some spot carries both bits.
    #[inline]
    pub const fn has_crystal(self) -> bool {
        self.v1() & self.v2() != 0
    }

    #[inline]
    pub const fn is_one_layer(self) -> bool {
        self.0 & LAYER_MASK == self.0
    }

    /// Only quadrants 2/3 are occupied.
    #[inline]
    pub const fn is_left_half(self) -> bool {
        self.occupied() & 0x3333 == 0
    }

    /// Only quadrants 0/1 are occupied.
    #[inline]
    pub const fn is_right_half(self) -> bool {
        self.occupied() & 0xcccc == 0
    }

    /// Mirror image across the vertical axis (quad `q` ↔ quad `3 - q`).
    pub const fn mirror(self) -> Shape {
        let mut shape = self.0;
        let mut result = 0u32;
        let mut i = 0;
        while i < 4 {
            result = (result << 1) | (shape & 0x1111_1111);
            shape >>= 1;
            i += 1;
        }
        Shape(result)
    }

    /// Cyclic quadrant shift by `steps` to the right (mod 4).
    pub const fn rotated(self, steps: u32) -> Shape {
        let l_shift = steps & 0x3;
        let r_shift = 4 - l_shift;
        let mask = (0xf >> r_shift) * 0x1111_1111;
        Shape(((self.0 >> r_shift) & mask) | ((self.0 << l_shift) & !mask))
    }

    /// Smallest value among all rotations and mirror images.
    pub fn key(self) -> Shape {
        let mirrored = self.mirror();
        (1..4).fold(self.min(mirrored), |acc, steps| {
            acc.min(self.rotated(steps)).min(mirrored.rotated(steps))
        })
    }

    #[inline]
    pub fn is_key(self) -> bool {
        self == self.key()
    }
}

impl From<u32> for Shape {
    fn from(value: u32) -> Self {
        Shape(value)
    }
}

impl From<Shape> for u32 {
    fn from(shape: Shape) -> Self {
        shape.0
    }
}

impl fmt::LowerHex for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Renders the shape code, e.g. `RrRr----`.
impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}
