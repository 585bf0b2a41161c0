use std::f64::consts::TAU;
use std::sync::Arc;

use bevy::prelude::*;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::math;

use super::HASH_GRID_SIZE;

/// Side length of the generated noise texture in texels.
pub const NOISE_TEXTURE_SIZE: usize = 64;

/// Tileable four-channel noise texture, sampled bilinearly with repeat wrap.
///
/// Texels are shared behind an [`Arc`], so cloning is cheap.
#[derive(Clone, Debug)]
pub struct NoiseTexture {
    size: usize,
    texels: Arc<Vec<Vec4>>,
}

impl NoiseTexture {
    /// Bakes a texture from four `Fbm<Perlin>` generators seeded from `seed`.
    ///
    /// Each texel samples a 4-D torus so both texture axes tile seamlessly.
    pub fn generate(seed: u32, size: usize) -> Self {
        let size = size.max(1);
        let channels: [Fbm<Perlin>; 4] =
            std::array::from_fn(|i| Fbm::new(seed.wrapping_add(i as u32)).set_octaves(3));
        let radius = 1.5;

        let mut texels = Vec::with_capacity(size * size);
        for row in 0..size {
            let b = row as f64 / size as f64 * TAU;
            for col in 0..size {
                let a = col as f64 / size as f64 * TAU;
                let point = [a.cos() * radius, a.sin() * radius, b.cos() * radius, b.sin() * radius];
                let sample = |i: usize| math::map_noise_to_range(channels[i].get(point), 0.0, 1.0);
                texels.push(
                    Vec4::new(sample(0), sample(1), sample(2), sample(3)).clamp(Vec4::ZERO, Vec4::ONE),
                );
            }
        }
        Self {
            size,
            texels: Arc::new(texels),
        }
    }

    fn texel(&self, col: i64, row: i64) -> Vec4 {
        let n = self.size as i64;
        let col = col.rem_euclid(n) as usize;
        let row = row.rem_euclid(n) as usize;
        self.texels[row * self.size + col]
    }

    /// Bilinear sample at normalized texture coordinates; repeats outside `[0, 1)`.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> Vec4 {
        let x = u * self.size as f32 - 0.5;
        let y = v * self.size as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let (c, r) = (x0 as i64, y0 as i64);

        let bottom = self.texel(c, r).lerp(self.texel(c + 1, r), tx);
        let top = self.texel(c, r + 1).lerp(self.texel(c + 1, r + 1), tx);
        bottom.lerp(top, ty)
    }
}

/// Five independent random values attached to a hash-grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct HexHash {
    /// Urban feature roll.
    pub a: f32,
    /// Farm feature roll.
    pub b: f32,
    /// Plant feature roll.
    pub c: f32,
    /// Variant choice.
    pub d: f32,
    /// Rotation / tower roll.
    pub e: f32,
}

impl HexHash {
    /// Draws a hash whose values all lie in `[0, 0.999)`.
    pub fn create(rng: &mut impl Rng) -> Self {
        let mut roll = || rng.gen_range(0.0f32..1.0) * 0.999;
        Self {
            a: roll(),
            b: roll(),
            c: roll(),
            d: roll(),
            e: roll(),
        }
    }
}

/// Seeded grid of [`HexHash`] values used for stable feature placement.
#[derive(Clone, Debug)]
pub struct HashGrid {
    cells: Arc<Vec<HexHash>>,
}

impl HashGrid {
    /// Fills the grid from a dedicated ChaCha stream.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let cells = (0..HASH_GRID_SIZE * HASH_GRID_SIZE)
            .map(|_| HexHash::create(&mut rng))
            .collect();
        Self {
            cells: Arc::new(cells),
        }
    }

    /// Hash at integer grid coordinates, both wrapped into range.
    pub fn get(&self, x: i32, z: i32) -> HexHash {
        let size = HASH_GRID_SIZE as i32;
        let mut x = x % size;
        if x < 0 {
            x += size;
        }
        let mut z = z % size;
        if z < 0 {
            z += size;
        }
        self.cells[(x + z * size) as usize]
    }
}
