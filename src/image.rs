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

//! Cache-line-aligned row-major pixel buffer.

use crate::colour::ColourRgb;
use std::mem::size_of;
use thiserror::Error;

const CACHE_LINE_BYTES: usize = 64;

/// Failure constructing an [`Image`].
#[derive(Debug, Error)]
pub enum ImageError {
    /// The requested dimensions overflow `usize` arithmetic or exceed what the
    /// allocator is willing to provide.
    #[error("image dimensions {width}x{height} are not allocatable")]
    Alloc { width: usize, height: usize },
}

fn gcd(a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let tmp = b;
        b = a % b;
        a = tmp;
    }
    a
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

/// A rectangular buffer of pixels of type `P`, padded so each row begins on a
/// cache-line boundary. Rows are independent and may be written concurrently
/// by disjoint workers without external synchronization.
#[derive(Debug)]
pub struct Image<P> {
    data: Box<[P]>,
    width: usize,
    height: usize,
    stride: usize,
}

impl<P: Default + Copy> Image<P> {
    /// Allocates a zero-initialized image of the given dimensions.
    pub fn new(width: usize, height: usize) -> Result<Self, ImageError> {
        let block = lcm(CACHE_LINE_BYTES, size_of::<P>()) / size_of::<P>().max(1);
        let block = block.max(1);
        let stride = ((width + block - 1) / block) * block;
        let len = stride
            .checked_mul(height)
            .ok_or(ImageError::Alloc { width, height })?;
        let data = vec![P::default(); len].into_boxed_slice();
        Ok(Image {
            data,
            width,
            height,
            stride,
        })
    }
}

impl<P> Image<P> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the `i`-th row as an immutable slice of length `width` (not `stride`).
    pub fn row(&self, i: usize) -> &[P] {
        let start = i * self.stride;
        &self.data[start..start + self.width]
    }

    /// Returns the `i`-th row as a mutable slice of length `width` (not `stride`).
    ///
    /// Two calls with different `i` borrow disjoint regions of `data`, so the
    /// borrow checker lets callers hold `row_mut(i)` and `row_mut(j)` (`i != j`)
    /// concurrently via [`Image::rows_mut`] without any unsafe code in callers.
    pub fn row_mut(&mut self, i: usize) -> &mut [P] {
        let start = i * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Iterates over all rows immutably.
    pub fn rows(&self) -> impl Iterator<Item = &[P]> {
        (0..self.height).map(move |i| self.row(i))
    }

    /// Splits the buffer into one independent mutable row slice per row index.
    /// Used by the thread pool to hand out exactly one row per dispatched
    /// `Problem` to a worker thread.
    pub fn rows_mut(&mut self) -> Vec<&mut [P]> {
        self.data
            .chunks_mut(self.stride)
            .take(self.height)
            .map(|chunk| &mut chunk[..self.width])
            .collect()
    }
}

impl Image<ColourRgb<f32>> {
    /// Encodes this HDR image to an 8-bit RGBA buffer, applying gamma + dither
    /// per pixel, and saves it to `path` through the `image` crate.
    #[cfg(feature = "png")]
    pub fn save(&self, path: impl AsRef<std::path::Path>, gamma: f32) -> Result<(), image::ImageError> {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::from_entropy();
        let mut buf = image::RgbaImage::new(self.width as u32, self.height as u32);
        for (y, row) in self.rows().enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                let byte = pixel.to_u8(&mut rng, gamma);
                buf.put_pixel(
                    x as u32,
                    y as u32,
                    image::Rgba([byte.red, byte.green, byte.blue, 255]),
                );
            }
        }
        buf.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_at_least_width_and_cache_aligned() {
        let img: Image<ColourRgb<f32>> = Image::new(5, 3).unwrap();
        assert!(img.stride() >= img.width());
        let block = lcm(CACHE_LINE_BYTES, size_of::<ColourRgb<f32>>()) / size_of::<ColourRgb<f32>>();
        assert_eq!(img.stride() % block, 0);
    }

    #[test]
    fn zero_initialized() {
        let img: Image<ColourRgb<f32>> = Image::new(4, 4).unwrap();
        for row in img.rows() {
            for px in row {
                assert_eq!(*px, ColourRgb::default());
            }
        }
    }

    #[test]
    fn row_length_is_width_not_stride() {
        let img: Image<ColourRgb<f32>> = Image::new(3, 2).unwrap();
        assert_eq!(img.row(0).len(), 3);
    }

    #[test]
    fn disjoint_rows_are_independently_writable() {
        let mut img: Image<u8> = Image::new(8, 4).unwrap();
        {
            let mut rows = img.rows_mut();
            for (i, row) in rows.iter_mut().enumerate() {
                row[0] = i as u8;
            }
        }
        for i in 0..4 {
            assert_eq!(img.row(i)[0], i as u8);
        }
    }
}
