//! Shape code text ⇄ packed value.
//!
//! Grammar: 1–4 layers joined by `:`, each layer exactly four 2-char tokens:
//! `[CRSW][urygcbmw]` solid, `c[urygcbmw]` crystal, `P-` pin, `--` gap.
//! The first token of a layer is quadrant 0. Piece types and colors are
//! accepted but not stored; rendering uses `R`/`c` with the layer color
//! `r g b w` (bottom to top).

use std::fmt;
use std::str::FromStr;

use super::{Shape, NUM_LAYERS, NUM_QUADS};

const SEP: char = ':';
const COLORS: [char; NUM_LAYERS as usize] = ['r', 'g', 'b', 'w'];
const PAINT: &str = "urygcbmw";

/// Malformed shape code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeCodeError {
    /// Fewer than 1 or more than 4 layers.
    LayerCount { count: usize },
    /// A layer that is not exactly 8 characters.
    LayerLength { layer: usize, len: usize },
    /// A 2-char token outside the grammar.
    BadToken {
        layer: usize,
        quad: usize,
        token: String,
    },
}

impl fmt::Display for ShapeCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LayerCount { count } => {
                write!(f, "invalid shape code: {count} layers (expected 1 to 4)")
            }
            Self::LayerLength { layer, len } => write!(
                f,
                "invalid shape code: layer {layer} has {len} chars (expected 8)"
            ),
            Self::BadToken { layer, quad, token } => write!(
                f,
                "invalid shape code: token {token:?} at layer {layer}, quad {quad}"
            ),
        }
    }
}

impl std::error::Error for ShapeCodeError {}

/// Spot bits `(v2, v1)` for a single token.
fn parse_token(token: &[u8]) -> Option<(u32, u32)> {
    match token {
        [b'-', b'-'] => Some((0, 0)),
        [b'P', b'-'] => Some((1, 0)),
        [b'C' | b'R' | b'S' | b'W', c] if PAINT.as_bytes().contains(c) => Some((0, 1)),
        [b'c', c] if PAINT.as_bytes().contains(c) => Some((1, 1)),
        _ => None,
    }
}

impl Shape {
    /// Parse a shape code. Purely syntactic; no physics validation.
    pub fn from_code(code: &str) -> Result<Shape, ShapeCodeError> {
        let layers: Vec<&str> = code.split(SEP).collect();
        if layers.is_empty() || layers.len() > NUM_LAYERS as usize {
            return Err(ShapeCodeError::LayerCount {
                count: layers.len(),
            });
        }
        let (mut v1, mut v2) = (0u32, 0u32);
        for (layer, text) in layers.iter().enumerate() {
            let bytes = text.as_bytes();
            if bytes.len() != 2 * NUM_QUADS as usize {
                return Err(ShapeCodeError::LayerLength {
                    layer,
                    len: text.chars().count(),
                });
            }
            for (quad, token) in bytes.chunks_exact(2).enumerate() {
                let (b2, b1) = parse_token(token).ok_or_else(|| ShapeCodeError::BadToken {
                    layer,
                    quad,
                    token: String::from_utf8_lossy(token).into_owned(),
                })?;
                let spot = NUM_QUADS as usize * layer + quad;
                v1 |= b1 << spot;
                v2 |= b2 << spot;
            }
        }
        Ok(Shape((v2 << 16) | v1))
    }

    /// Render the shape code. Total: every value renders, empty layers above
    /// the topmost occupied layer are omitted (one layer minimum).
    pub fn code(self) -> String {
        let shown = self.layer_count().max(1) as usize;
        let mut out = String::with_capacity(shown * 9);
        for (layer, bits) in self.layers().iter().take(shown).enumerate() {
            if layer > 0 {
                out.push(SEP);
            }
            for quad in 0..NUM_QUADS {
                let b1 = (bits >> quad) & 1;
                let b2 = (bits >> (quad + 4)) & 1;
                match (b2, b1) {
                    (0, 0) => out.push_str("--"),
                    (0, _) => {
                        out.push('R');
                        out.push(COLORS[layer]);
                    }
                    (_, 0) => out.push_str("P-"),
                    _ => {
                        out.push('c');
                        out.push(COLORS[layer]);
                    }
                }
            }
        }
        out
    }
}

impl FromStr for Shape {
    type Err = ShapeCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Shape::from_code(s)
    }
}
