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

use crate::geometry::Ray;
use crate::surface::Surface;
use nalgebra::{Point3, Vector3};
use rand::Rng;
use std::sync::Arc;

const EPSILON: f64 = 1e-10;

/// A bounded parallelogram: corner `origin`, two edge vectors `v0`/`v1`
/// (not necessarily orthogonal). Precomputes the dot products its
/// point-in-parallelogram test needs so every intersection query is O(1).
#[derive(Debug, Clone)]
pub struct Rectangle {
    pub origin: Point3<f64>,
    pub v0: Vector3<f64>,
    pub v1: Vector3<f64>,
    normal: Vector3<f64>,
    v0_v0: f64,
    v1_v1: f64,
    v0_v1: f64,
    recip_denominator: f64,
    pub surface: Arc<Surface>,
}

impl Rectangle {
    pub fn new(origin: Point3<f64>, v0: Vector3<f64>, v1: Vector3<f64>, surface: Arc<Surface>) -> Self {
        let normal = v0.cross(&v1).normalize();
        let v0_v0 = v0.dot(&v0);
        let v1_v1 = v1.dot(&v1);
        let v0_v1 = v0.dot(&v1);
        let recip_denominator = 1.0 / (v0_v0 * v1_v1 - v0_v1 * v0_v1);
        Rectangle {
            origin,
            v0,
            v1,
            normal,
            v0_v0,
            v1_v1,
            v0_v1,
            recip_denominator,
            surface,
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f64> {
        let denom = self.normal.dot(&ray.direction);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = self.normal.dot(&(self.origin - ray.origin)) / denom;
        if t <= EPSILON {
            return None;
        }
        let p = ray.at(t) - self.origin;
        let p_v0 = p.dot(&self.v0);
        let p_v1 = p.dot(&self.v1);
        let u = (p_v0 * self.v1_v1 - p_v1 * self.v0_v1) * self.recip_denominator;
        let v = (p_v1 * self.v0_v0 - p_v0 * self.v0_v1) * self.recip_denominator;
        if (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v) {
            Some(t)
        } else {
            None
        }
    }

    pub fn normal_at(&self, _point: Point3<f64>) -> Vector3<f64> {
        self.normal
    }

    /// Uniform sample over the parallelogram's area, for direct-light sampling.
    pub fn sample_surface(&self, rng: &mut impl Rng) -> Point3<f64> {
        let u: f64 = rng.gen_range(0.0..=1.0);
        let v: f64 = rng.gen_range(0.0..=1.0);
        self.origin + self.v0 * u + self.v1 * v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourRgb;

    fn unit_square_xy() -> Rectangle {
        let surface = Arc::new(Surface::new(ColourRgb::new(1.0, 1.0, 1.0), 1.0, 0.0, 0.0, 0.0, 1.0).unwrap());
        Rectangle::new(
            Point3::origin(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            surface,
        )
    }

    #[test]
    fn ray_through_center_hits() {
        let rect = unit_square_xy();
        let ray = Ray::new(Point3::new(0.5, 0.5, 1.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(rect.intersect(&ray).is_some());
    }

    #[test]
    fn ray_outside_bounds_misses_despite_hitting_the_infinite_plane() {
        let rect = unit_square_xy();
        let ray = Ray::new(Point3::new(2.0, 2.0, 1.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(rect.intersect(&ray).is_none());
    }

    #[test]
    fn sampled_surface_points_lie_within_bounds() {
        let rect = unit_square_xy();
        let mut rng = rand::rngs::mock::StepRng::new(0, 1 << 20);
        for _ in 0..8 {
            let p = rect.sample_surface(&mut rng);
            assert!(p.x >= -1e-9 && p.x <= 1.0 + 1e-9);
            assert!(p.y >= -1e-9 && p.y <= 1.0 + 1e-9);
        }
    }
}
