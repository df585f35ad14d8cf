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
use std::sync::Arc;

/// An infinite plane through `origin`, spanned by `u` and `v` (not
/// necessarily orthogonal; the outward normal is `normalize(u x v)`).
#[derive(Debug, Clone)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub u: Vector3<f64>,
    pub v: Vector3<f64>,
    normal: Vector3<f64>,
    pub surface: Arc<Surface>,
}

const EPSILON: f64 = 1e-10;

impl Plane {
    pub fn new(origin: Point3<f64>, u: Vector3<f64>, v: Vector3<f64>, surface: Arc<Surface>) -> Self {
        let normal = u.cross(&v).normalize();
        Plane { origin, u, v, normal, surface }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f64> {
        let denom = self.normal.dot(&ray.direction);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = self.normal.dot(&(self.origin - ray.origin)) / denom;
        if t > EPSILON {
            Some(t)
        } else {
            None
        }
    }

    pub fn normal_at(&self, _point: Point3<f64>) -> Vector3<f64> {
        self.normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourRgb;

    fn xy_plane() -> Plane {
        let surface = Arc::new(Surface::new(ColourRgb::new(1.0, 1.0, 1.0), 1.0, 0.0, 0.0, 0.0, 1.0).unwrap());
        Plane::new(
            Point3::origin(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            surface,
        )
    }

    #[test]
    fn straight_down_ray_hits_at_distance_one() {
        let plane = xy_plane();
        let ray = Ray::new(Point3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0));
        let t = plane.intersect(&ray).unwrap();
        assert!((t - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalized_diagonal_ray_hits_at_distance_sqrt2() {
        let plane = xy_plane();
        let ray = Ray::new(Point3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 0.0, -1.0));
        let t = plane.intersect(&ray).unwrap();
        assert!((t - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn parallel_ray_never_hits() {
        let plane = xy_plane();
        let ray = Ray::new(Point3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 0.0, 0.0));
        assert!(plane.intersect(&ray).is_none());
    }
}
