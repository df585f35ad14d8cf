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

//! Maps a pixel and jitter offset into a world-space primary ray.

use crate::geometry::Ray;
use nalgebra::{Point3, Vector3};
use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub location: Point3<f64>,
    pub direction: Vector3<f64>,
    pub up: Vector3<f64>,
    pub focal_length: f64,
    right: Vector3<f64>,
}

impl Camera {
    pub fn new(location: Point3<f64>, direction: Vector3<f64>, up: Vector3<f64>, focal_length: f64) -> Self {
        let direction = direction.normalize();
        let right = direction.cross(&up);
        Camera {
            location,
            direction,
            up,
            focal_length,
            right,
        }
    }

    /// A jittered primary ray through pixel `(x, y)` of a `width x height`
    /// image. A fresh jitter is drawn from `rng` on every call, including for
    /// a single-sample render: the original renderer's unjittered
    /// `AntiAliaserNone` path and its jittered `AntiAliaserRandom<1>` path are
    /// the same code, so box-filtered softening is always applied.
    pub fn sample_ray(&self, x: u32, y: u32, width: u32, height: u32, rng: &mut impl Rng) -> Ray {
        let (w, h) = (width as f64, height as f64);
        let half_x = (w / h) / 2.0;
        let half_y = 0.5;
        let xf = 1.0 - 2.0 * x as f64 / w;
        let yf = 1.0 - 2.0 * y as f64 / h;
        let jitter_x: f64 = rng.gen_range(-1.0..=1.0);
        let jitter_y: f64 = rng.gen_range(-1.0..=1.0);
        let direction = (self.right * ((xf + jitter_x / w) * half_x))
            + (self.up * ((yf + jitter_y / h) * half_y))
            + (self.direction * self.focal_length);
        Ray::new(self.location, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_pixel_points_close_to_camera_direction() {
        let camera = Camera::new(
            Point3::origin(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
            2.0,
        );
        let mut rng = rand::rngs::mock::StepRng::new(1 << 63, 0);
        let ray = camera.sample_ray(32, 32, 64, 64, &mut rng);
        assert!(ray.direction.dot(&camera.direction) > 0.9);
    }

    #[test]
    fn every_sampled_ray_has_unit_direction() {
        let camera = Camera::new(
            Point3::origin(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
            1.0,
        );
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let ray = camera.sample_ray(10, 20, 64, 64, &mut rng);
            assert!((ray.direction.norm() - 1.0).abs() < 1e-9);
        }
    }
}
