// Copyright (c) 2024, BlockProject 3D
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without modification,
// are permitted provided that the following conditions are met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above copyright notice,
//       this list of conditions and the following disclaimer in the documentation
//       and/or other materials provided with the distribution.
//     * Neither the name of BlockProject 3D nor the names of its contributors
//       may be used to endorse or promote products derived from this software
//       without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Linear RGB colour arithmetic and the gamma/dither bridge to 8-bit display space.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use std::ops::{Add, AddAssign, Mul, MulAssign};

/// Default display gamma (matches sRGB-ish 2.2 used throughout the original renderer).
pub const DEFAULT_GAMMA: f32 = 2.2;

/// A triple of colour channels. `ColourRgb<f32>` is the linear working space;
/// `ColourRgb<u8>` is the gamma-encoded display space.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ColourRgb<T> {
    pub red: T,
    pub green: T,
    pub blue: T,
}

impl<T> ColourRgb<T> {
    pub const fn new(red: T, green: T, blue: T) -> Self {
        ColourRgb { red, green, blue }
    }
}

impl ColourRgb<f32> {
    pub const BLACK: ColourRgb<f32> = ColourRgb::new(0.0, 0.0, 0.0);

    /// Arithmetic mean of the three channels.
    pub fn average(&self) -> f32 {
        (self.red + self.green + self.blue) / 3.0
    }

    /// Largest of the three channels.
    pub fn max(&self) -> f32 {
        self.red.max(self.green).max(self.blue)
    }

    pub fn is_finite(&self) -> bool {
        self.red.is_finite() && self.green.is_finite() && self.blue.is_finite()
    }

    /// Converts to 8-bit display space: `floor(clamp((c^(1/gamma) + dither) * 256, 0, 255))`.
    ///
    /// `dither` is drawn fresh per channel from `rng`, matching the original's
    /// `thread_local` uniform distribution over `[-0.5/255, 0.5/255]`.
    pub fn to_u8<R: Rng + ?Sized>(&self, rng: &mut R, gamma: f32) -> ColourRgb<u8> {
        let dist = Uniform::new_inclusive(-0.5 / 255.0, 0.5 / 255.0);
        let map = |c: f32| -> u8 {
            let dithered = (c.max(0.0).powf(1.0 / gamma) + dist.sample(rng)) * 256.0;
            dithered.clamp(0.0, 255.0).floor() as u8
        };
        ColourRgb::new(map(self.red), map(self.green), map(self.blue))
    }
}

impl ColourRgb<u8> {
    /// Converts from 8-bit display space back to the linear working space: `(c/255)^gamma`.
    pub fn to_f32(&self, gamma: f32) -> ColourRgb<f32> {
        let map = |c: u8| (c as f32 / 255.0).powf(gamma);
        ColourRgb::new(map(self.red), map(self.green), map(self.blue))
    }
}

impl<T: Add<Output = T>> Add for ColourRgb<T> {
    type Output = ColourRgb<T>;

    fn add(self, rhs: Self) -> Self::Output {
        ColourRgb::new(self.red + rhs.red, self.green + rhs.green, self.blue + rhs.blue)
    }
}

impl<T: AddAssign> AddAssign for ColourRgb<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.red += rhs.red;
        self.green += rhs.green;
        self.blue += rhs.blue;
    }
}

impl<T: Mul<Output = T> + Copy> Mul<T> for ColourRgb<T> {
    type Output = ColourRgb<T>;

    fn mul(self, rhs: T) -> Self::Output {
        ColourRgb::new(self.red * rhs, self.green * rhs, self.blue * rhs)
    }
}

impl<T: MulAssign + Copy> MulAssign<T> for ColourRgb<T> {
    fn mul_assign(&mut self, rhs: T) {
        self.red *= rhs;
        self.green *= rhs;
        self.blue *= rhs;
    }
}

impl<T: Mul<Output = T> + Copy> Mul<ColourRgb<T>> for ColourRgb<T> {
    type Output = ColourRgb<T>;

    /// Component-wise (Hadamard) product, used throughout the kernel to tint radiance
    /// by a surface's base colour.
    fn mul(self, rhs: ColourRgb<T>) -> Self::Output {
        ColourRgb::new(self.red * rhs.red, self.green * rhs.green, self.blue * rhs.blue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn average_and_max() {
        let c = ColourRgb::new(0.2f32, 0.4, 0.6);
        assert!((c.average() - 0.4).abs() < 1e-6);
        assert_eq!(c.max(), 0.6);
    }

    #[test]
    fn arithmetic() {
        let a = ColourRgb::new(1.0f32, 2.0, 3.0);
        let b = ColourRgb::new(0.5f32, 0.5, 0.5);
        assert_eq!(a + b, ColourRgb::new(1.5, 2.5, 3.5));
        assert_eq!(a * 2.0, ColourRgb::new(2.0, 4.0, 6.0));
        assert_eq!(a * b, ColourRgb::new(0.5, 1.0, 1.5));
    }

    #[test]
    fn u8_roundtrip_within_dither() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let original = ColourRgb::new(10u8, 128, 250);
        let linear = original.to_f32(DEFAULT_GAMMA);
        let back = linear.to_u8(&mut rng, DEFAULT_GAMMA);
        assert!((original.red as i32 - back.red as i32).abs() <= 1);
        assert!((original.green as i32 - back.green as i32).abs() <= 1);
        assert!((original.blue as i32 - back.blue as i32).abs() <= 1);
    }

    #[test]
    fn f32_roundtrip_within_gamma_error() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let original = ColourRgb::new(0.3f32, 0.6, 0.9);
        let byte = original.to_u8(&mut rng, DEFAULT_GAMMA);
        let back = byte.to_f32(DEFAULT_GAMMA);
        assert!((original.red - back.red).abs() < 1.0 / 255.0 + 0.02);
        assert!((original.green - back.green).abs() < 1.0 / 255.0 + 0.02);
        assert!((original.blue - back.blue).abs() < 1.0 / 255.0 + 0.02);
    }
}
