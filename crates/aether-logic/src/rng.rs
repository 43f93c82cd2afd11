//! Seeded random stream for a single match.
//!
//! Mulberry32: a 32-bit state advanced by a fixed odd increment and mixed
//! with two multiply-xorshift rounds. Small, fast, and byte-identical across
//! platforms, which is what replayable spawn traces need.

const INCREMENT: u32 = 0x6D2B_79F5;

/// Deterministic float stream in `[0, 1)` seeded from a `u32`.
#[derive(Debug, Clone)]
pub struct MatchRng {
    state: u32,
}

impl MatchRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: seed.wrapping_add(INCREMENT),
        }
    }

    /// Next raw 32-bit output.
    pub fn next_raw(&mut self) -> u32 {
        self.state = self.state.wrapping_add(INCREMENT);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(t | 1);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(r | 61));
        r ^ (r >> 14)
    }

    /// Next float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.next_raw() as f64 / 4_294_967_296.0
    }

    /// Uniform index into a slice of length `len`. `len` must be non-zero.
    pub fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }

    /// Symmetric jitter in `[-half_width, half_width)`.
    pub fn jitter(&mut self, half_width: f32) -> f32 {
        ((self.next_f64() - 0.5) * 2.0 * half_width as f64) as f32
    }

    /// `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}
