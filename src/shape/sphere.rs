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

#[derive(Debug, Clone)]
pub struct Sphere {
    pub center: Point3<f64>,
    pub radius: f64,
    pub surface: Arc<Surface>,
}

impl Sphere {
    pub fn new(center: Point3<f64>, radius: f64, surface: Arc<Surface>) -> Self {
        Sphere { center, radius, surface }
    }

    /// Nearest strictly-positive root of `|ray.at(t) - center| = radius`, or
    /// `None` if the ray misses or both roots are behind the origin.
    pub fn intersect(&self, ray: &Ray) -> Option<f64> {
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let t0 = -b - sqrt_d;
        let t1 = -b + sqrt_d;
        if t0 > 0.0 {
            Some(t0)
        } else if t1 > 0.0 {
            Some(t1)
        } else {
            None
        }
    }

    pub fn normal_at(&self, point: Point3<f64>) -> Vector3<f64> {
        (point - self.center).normalize()
    }

    /// Uniform sample on the sphere's surface, used for direct-light sampling
    /// of emissive spheres.
    pub fn sample_surface(&self, rng: &mut impl Rng) -> Point3<f64> {
        let z = rng.gen_range(-1.0..=1.0);
        let theta = rng.gen_range(0.0..std::f64::consts::TAU);
        let r = (1.0 - z * z).max(0.0).sqrt();
        self.center + Vector3::new(r * theta.cos(), r * theta.sin(), z) * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourRgb;

    fn unit_sphere_at_origin() -> Sphere {
        let surface = Arc::new(Surface::new(ColourRgb::new(1.0, 1.0, 1.0), 1.0, 0.0, 0.0, 0.0, 1.0).unwrap());
        Sphere::new(Point3::origin(), 1.0, surface)
    }

    #[test]
    fn ray_straight_at_sphere_hits_at_near_surface() {
        let sphere = unit_sphere_at_origin();
        let ray = Ray::new(Point3::new(0.0, 0.0, 2.0), Vector3::new(0.0, 0.0, -1.0));
        let t = sphere.intersect(&ray).unwrap();
        assert!((t - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ray_missing_sphere_returns_none() {
        let sphere = unit_sphere_at_origin();
        let ray = Ray::new(Point3::new(2.0, 0.0, 0.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn normal_points_outward_from_center() {
        let sphere = unit_sphere_at_origin();
        let n = sphere.normal_at(Point3::new(1.0, 0.0, 0.0));
        assert!((n - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }
}
