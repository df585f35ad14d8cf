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

//! Scene geometry: a tagged enum over the shape kinds the kernel knows how to
//! intersect, in place of the original's virtual `Shape` base class.

mod boxed;
mod plane;
mod rectangle;
mod sphere;

pub use boxed::BoxShape;
pub use plane::Plane;
pub use rectangle::Rectangle;
pub use sphere::Sphere;

use crate::geometry::Ray;
use crate::surface::Surface;
use nalgebra::{Point3, Vector3};
use rand::Rng;
use std::sync::Arc;

const SELF_INTERSECTION_EPSILON: f64 = 1e-10;

/// Dispatches to one of the four supported primitives. Shared via `Arc`
/// because a shape can appear both in `Scene::geometry()` and, if emissive,
/// in the precomputed `Scene::lights()` sub-list.
#[derive(Debug, Clone)]
pub enum Shape {
    Plane(Plane),
    Rectangle(Rectangle),
    Box(BoxShape),
    Sphere(Sphere),
}

impl Shape {
    pub fn surface(&self) -> &Arc<Surface> {
        match self {
            Shape::Plane(p) => &p.surface,
            Shape::Rectangle(r) => &r.surface,
            Shape::Box(b) => &b.surface,
            Shape::Sphere(s) => &s.surface,
        }
    }

    fn intersect_distance(&self, ray: &Ray) -> Option<f64> {
        match self {
            Shape::Plane(p) => p.intersect(ray),
            Shape::Rectangle(r) => r.intersect(ray),
            Shape::Box(b) => b.intersect(ray).map(|(t, _)| t),
            Shape::Sphere(s) => s.intersect(ray),
        }
    }

    fn normal_at(&self, ray: &Ray, point: Point3<f64>) -> Vector3<f64> {
        match self {
            Shape::Plane(p) => p.normal_at(point),
            Shape::Rectangle(r) => r.normal_at(point),
            Shape::Box(b) => {
                let (_, face) = b.intersect(ray).expect("normal requested for a ray that missed");
                b.normal_at(face, point)
            }
            Shape::Sphere(s) => s.normal_at(point),
        }
    }

    /// `None` for shapes this crate has no emissive-sampling strategy for
    /// (there are none today, but the seam exists so a future primitive can
    /// opt out of direct-light sampling without a runtime error elsewhere).
    pub fn sample_surface(&self, rng: &mut impl Rng) -> Option<Point3<f64>> {
        match self {
            Shape::Plane(_) => None,
            Shape::Rectangle(r) => Some(r.sample_surface(rng)),
            Shape::Box(b) => Some(b.sample_surface(rng)),
            Shape::Sphere(s) => Some(s.sample_surface(rng)),
        }
    }
}

/// Derived result of a ray hitting a shape: everything the kernel needs
/// without re-deriving it from the raw distance.
#[derive(Clone)]
pub struct IntersectionInfo<'a> {
    pub shape: &'a Shape,
    pub distance: f64,
    pub location: Point3<f64>,
    /// Outward normal, flipped to oppose the incident ray.
    pub normal: Vector3<f64>,
    /// Always non-negative.
    pub cos_angle_of_incidence: f64,
    /// True if the ray opposes the shape's geometric (un-flipped) normal.
    pub entering_surface: bool,
}

/// Whether any shape blocks `ray` strictly before `max_distance`. Used for
/// shadow rays in direct-light sampling; unlike [`intersect_scene`] it can
/// stop at the first blocker instead of finding the nearest one.
pub fn occluded(ray: &Ray, shapes: &[Arc<Shape>], max_distance: f64) -> bool {
    shapes.iter().any(|shape| {
        shape
            .intersect_distance(ray)
            .map(|t| t > SELF_INTERSECTION_EPSILON && t < max_distance)
            .unwrap_or(false)
    })
}

/// Linear scan over `shapes`, keeping the nearest hit past the
/// self-intersection epsilon. Mirrors the original's sentinel-distance
/// nearest-hit loop, re-expressed as `Option` instead of a `+inf` sentinel.
pub fn intersect_scene<'a>(ray: &Ray, shapes: &'a [Arc<Shape>]) -> Option<IntersectionInfo<'a>> {
    let mut best: Option<(f64, &'a Shape)> = None;
    for shape in shapes {
        if let Some(t) = shape.intersect_distance(ray) {
            if t > SELF_INTERSECTION_EPSILON && best.map(|(best_t, _)| t < best_t).unwrap_or(true) {
                best = Some((t, shape.as_ref()));
            }
        }
    }
    best.map(|(distance, shape)| {
        let location = ray.at(distance);
        let geometric_normal = shape.normal_at(ray, location);
        let entering_surface = ray.direction.dot(&geometric_normal) < 0.0;
        let normal = if entering_surface {
            geometric_normal
        } else {
            -geometric_normal
        };
        let cos_angle_of_incidence = (-ray.direction.dot(&normal)).abs();
        IntersectionInfo {
            shape,
            distance,
            location,
            normal,
            cos_angle_of_incidence,
            entering_surface,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourRgb;

    fn emissive_sphere() -> Arc<Shape> {
        let surface = Arc::new(Surface::new(ColourRgb::new(1.0, 1.0, 1.0), 0.0, 0.0, 0.0, 4.0, 1.0).unwrap());
        Arc::new(Shape::Sphere(Sphere::new(Point3::origin(), 1.0, surface)))
    }

    #[test]
    fn nearest_hit_has_normal_opposing_ray_and_nonnegative_cosine() {
        let shapes = vec![emissive_sphere()];
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = intersect_scene(&ray, &shapes).unwrap();
        assert!(hit.normal.dot(&ray.direction) <= 0.0);
        assert!(hit.cos_angle_of_incidence >= 0.0);
        assert!(hit.entering_surface);
    }

    #[test]
    fn miss_returns_none() {
        let shapes = vec![emissive_sphere()];
        let ray = Ray::new(Point3::new(5.0, 5.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(intersect_scene(&ray, &shapes).is_none());
    }

    #[test]
    fn nearest_of_two_overlapping_shapes_is_chosen() {
        let near = emissive_sphere();
        let surface = Arc::new(Surface::new(ColourRgb::new(1.0, 1.0, 1.0), 0.0, 0.0, 0.0, 0.0, 1.0).unwrap());
        let far = Arc::new(Shape::Sphere(Sphere::new(Point3::new(0.0, 0.0, -5.0), 1.0, surface)));
        let shapes = vec![far, near.clone()];
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = intersect_scene(&ray, &shapes).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-9);
    }
}
