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

//! The recursive radiance estimator: diffuse/specular/transmissive/emissive
//! terms plus Russian-roulette termination and next-event direct-light
//! sampling. Grounded on `Raytracer.cpp`'s `calculateRayColour` and its
//! per-term helpers from the original renderer.

use crate::colour::ColourRgb;
use crate::geometry::{orthonormal_basis, reflect, Ray};
use crate::shape::{intersect_scene, occluded, IntersectionInfo, Shape};
use crate::surface::Surface;
use crate::Scene;
use nalgebra::{Point3, Vector3};
use rand::RngCore;
use rand::Rng;
use std::f64::consts::PI;
use std::sync::Arc;

const GRAZING_EPSILON: f64 = 1e-10;
const SHADOW_EPSILON: f64 = 1e-8;
const WEIGHT_EPSILON: f32 = 1.0 / 255.0;

/// Parameters the pool's `Config` supplies to every call of [`trace`]; kept
/// as a small by-value struct so the recursive signature stays readable.
#[derive(Debug, Clone, Copy)]
pub struct KernelParams {
    pub max_depth: u32,
    pub roulette_depth: u32,
    pub roulette_survival: f32,
}

/// Estimates the radiance arriving along `-ray.direction` at `ray.origin`.
///
/// `depth` starts at 0, `weight` at 1.0, `refractive_stack` at `[Surface::VACUUM_REFRACTIVE_INDEX]`,
/// `last_normal` at the zero vector. `rng` is the calling worker's thread-local generator.
#[allow(clippy::too_many_arguments)]
pub fn trace(
    ray: &Ray,
    scene: &Scene,
    params: &KernelParams,
    depth: u32,
    weight: f32,
    refractive_stack: &mut Vec<f64>,
    last_normal: Vector3<f64>,
    rng: &mut dyn RngCore,
) -> ColourRgb<f32> {
    if depth >= params.max_depth || weight < WEIGHT_EPSILON {
        return direct_lighting(ray.origin, last_normal, scene, rng);
    }

    let survival = if depth >= params.roulette_depth {
        params.roulette_survival
    } else {
        1.0
    };
    if !rng.gen_bool(survival as f64) {
        return direct_lighting(ray.origin, last_normal, scene, rng);
    }

    let hit = match intersect_scene(ray, scene.geometry()) {
        Some(hit) => hit,
        None => return ColourRgb::BLACK,
    };
    if hit.cos_angle_of_incidence < GRAZING_EPSILON {
        return ColourRgb::BLACK;
    }

    let s = hit.shape.surface();
    let mut radiance = ColourRgb::BLACK;
    if s.diffuse_reflectance > 0.0 {
        radiance += diffuse_term(&hit, ray, scene, params, depth, weight, refractive_stack, rng);
    }
    if s.reflectance > 0.0 {
        radiance += specular_term(&hit, ray, scene, params, depth, weight, refractive_stack, rng) * s.reflectance;
    }
    if s.transmittance > 0.0 {
        radiance += transmission_term(&hit, ray, scene, params, depth, weight, refractive_stack, rng);
    }
    if s.emittance > 0.0 {
        radiance += s.colour * s.emittance;
    }
    radiance * (1.0 / survival)
}

#[allow(clippy::too_many_arguments)]
fn diffuse_term(
    hit: &IntersectionInfo<'_>,
    _ray: &Ray,
    scene: &Scene,
    params: &KernelParams,
    depth: u32,
    weight: f32,
    refractive_stack: &mut Vec<f64>,
    rng: &mut dyn RngCore,
) -> ColourRgb<f32> {
    let n = hit.normal;
    let (j, k) = orthonormal_basis(&n);
    let theta = 2.0 * PI * rng.gen_range(0.0..1.0);
    let u: f64 = rng.gen_range(0.0..1.0);
    let phi = PI / 2.0 - (u.acos() * 2.0 / PI).acos();
    let omega = n * phi.cos() + j * (theta.cos() * phi.sin()) + k * (theta.sin() * phi.sin());
    let omega = omega.normalize();

    let s = hit.shape.surface();
    let cos_term = n.dot(&omega).max(0.0) as f32;
    let next_weight = weight * s.colour.average() * cos_term;
    let next_ray = Ray::new(hit.location + n * SHADOW_EPSILON, omega);
    let incoming = trace(&next_ray, scene, params, depth + 1, next_weight, refractive_stack, n, rng);
    s.colour * incoming
}

#[allow(clippy::too_many_arguments)]
fn specular_term(
    hit: &IntersectionInfo<'_>,
    ray: &Ray,
    scene: &Scene,
    params: &KernelParams,
    depth: u32,
    weight: f32,
    refractive_stack: &mut Vec<f64>,
    rng: &mut dyn RngCore,
) -> ColourRgb<f32> {
    let s = hit.shape.surface();
    let omega = reflect(&ray.direction, &hit.normal);
    let next_weight = weight * s.colour.average();
    let next_ray = Ray::new(hit.location + hit.normal * SHADOW_EPSILON, omega);
    let incoming = trace(&next_ray, scene, params, depth + 1, next_weight, refractive_stack, hit.normal, rng);
    s.colour * incoming
}

#[allow(clippy::too_many_arguments)]
fn transmission_term(
    hit: &IntersectionInfo<'_>,
    ray: &Ray,
    scene: &Scene,
    params: &KernelParams,
    depth: u32,
    weight: f32,
    refractive_stack: &mut Vec<f64>,
    rng: &mut dyn RngCore,
) -> ColourRgb<f32> {
    let s = hit.shape.surface();
    let n1 = *refractive_stack.last().unwrap_or(&Surface::VACUUM_REFRACTIVE_INDEX);
    let cos1 = hit.cos_angle_of_incidence;

    let reflected_dir = reflect(&ray.direction, &hit.normal);
    let reflected_ray = Ray::new(hit.location + hit.normal * SHADOW_EPSILON, reflected_dir);
    let reflected = trace(
        &reflected_ray,
        scene,
        params,
        depth + 1,
        weight * s.colour.average(),
        refractive_stack,
        hit.normal,
        rng,
    );

    let popped = if hit.entering_surface {
        refractive_stack.push(s.refractive_index);
        None
    } else {
        refractive_stack.pop()
    };
    let n2 = *refractive_stack.last().unwrap_or(&Surface::VACUUM_REFRACTIVE_INDEX);

    let eta = n1 / n2;
    let k = 1.0 - eta * eta * (1.0 - cos1 * cos1);
    let (refracted, fresnel_r) = if k < 0.0 {
        (ColourRgb::BLACK, 1.0f32)
    } else {
        let cos2 = k.sqrt();
        let refract_dir = ray.direction * eta + hit.normal * (eta * cos1 - cos2);
        let refract_ray = Ray::new(hit.location - hit.normal * SHADOW_EPSILON, refract_dir);
        let radiance = trace(
            &refract_ray,
            scene,
            params,
            depth + 1,
            weight * s.colour.average(),
            refractive_stack,
            hit.normal,
            rng,
        );
        let rs = (n1 * cos1 - n2 * cos2) / (n1 * cos1 + n2 * cos2);
        let rp = (n2 * cos1 - n1 * cos2) / (n2 * cos1 + n1 * cos2);
        let r = 0.5 * (rs * rs + rp * rp);
        let r = if r.is_nan() { 1.0 } else { r.min(1.0) };
        (radiance, r as f32)
    };

    // Restore the stack so the caller sees it unchanged after this term returns.
    if hit.entering_surface {
        refractive_stack.pop();
    } else if let Some(v) = popped {
        refractive_stack.push(v);
    }

    (reflected * fresnel_r + refracted * s.colour * (1.0 - fresnel_r)) * s.transmittance
}

/// Next-event estimation used both as the path's terminal contribution and,
/// implicitly, as the only source of emitter light for paths that never
/// happen to land on a light by chance (see (d) emission in [`trace`]).
fn direct_lighting(
    origin: Point3<f64>,
    last_normal: Vector3<f64>,
    scene: &Scene,
    rng: &mut dyn RngCore,
) -> ColourRgb<f32> {
    let mut total = ColourRgb::BLACK;
    for light in scene.lights() {
        let Some(q) = sample_surface(light, rng) else {
            continue;
        };
        let to_light = q - origin;
        let distance = to_light.norm();
        if distance < GRAZING_EPSILON {
            continue;
        }
        let wi = to_light / distance;
        let max_t = distance - 2.0 * SHADOW_EPSILON;
        if max_t <= 0.0 {
            continue;
        }
        let shadow_ray = Ray::new(origin + wi * SHADOW_EPSILON, wi);
        if occluded(&shadow_ray, scene.geometry(), max_t) {
            continue;
        }
        let cos_term = if last_normal.norm_squared() < 1e-8 {
            1.0
        } else {
            wi.dot(&last_normal).abs()
        };
        let s = light.surface();
        total += s.colour * (s.emittance * cos_term as f32);
    }
    total
}

fn sample_surface(shape: &Arc<Shape>, rng: &mut dyn RngCore) -> Option<Point3<f64>> {
    struct Adapter<'a>(&'a mut dyn RngCore);
    impl<'a> RngCore for Adapter<'a> {
        fn next_u32(&mut self) -> u32 {
            self.0.next_u32()
        }
        fn next_u64(&mut self) -> u64 {
            self.0.next_u64()
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            self.0.fill_bytes(dest)
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.0.try_fill_bytes(dest)
        }
    }
    shape.sample_surface(&mut Adapter(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::shape::Sphere;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn white(emittance: f32, diffuse: f32) -> Arc<Surface> {
        Arc::new(Surface::new(ColourRgb::new(1.0, 1.0, 1.0), diffuse, 0.0, 0.0, emittance, 1.0).unwrap())
    }

    fn single_light_scene() -> Scene {
        let camera = Camera::new(
            Point3::origin(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
            1.0,
        );
        let light = Arc::new(Shape::Sphere(Sphere::new(Point3::new(0.0, 5.0, 0.0), 1.0, white(8.0, 0.0))));
        let floor = Arc::new(Shape::Sphere(Sphere::new(Point3::new(0.0, -1001.0, 0.0), 1000.0, white(0.0, 0.8))));
        Scene::new(camera, vec![light, floor])
    }

    #[test]
    fn miss_returns_black() {
        let scene = single_light_scene();
        let params = KernelParams {
            max_depth: 20,
            roulette_depth: 2,
            roulette_survival: 0.8,
        };
        let ray = Ray::new(Point3::new(100.0, 100.0, 100.0), Vector3::new(0.0, 0.0, 1.0));
        let mut rng = StdRng::seed_from_u64(1);
        let mut stack = vec![Surface::VACUUM_REFRACTIVE_INDEX];
        let result = trace(&ray, &scene, &params, 0, 1.0, &mut stack, Vector3::zeros(), &mut rng);
        assert_eq!(result, ColourRgb::BLACK);
    }

    #[test]
    fn diffuse_floor_below_a_light_receives_nonzero_direct_illumination() {
        let scene = single_light_scene();
        let params = KernelParams {
            max_depth: 4,
            roulette_depth: 1,
            roulette_survival: 0.9,
        };
        let mut rng = StdRng::seed_from_u64(42);
        let mut total = ColourRgb::BLACK;
        for _ in 0..64 {
            let ray = Ray::new(Point3::new(0.0, 5.0, 5.0), Vector3::new(0.0, -0.2, -1.0));
            let mut stack = vec![Surface::VACUUM_REFRACTIVE_INDEX];
            total += trace(&ray, &scene, &params, 0, 1.0, &mut stack, Vector3::zeros(), &mut rng);
        }
        assert!(total.average() > 0.0);
        assert!(total.is_finite());
    }

    #[test]
    fn refractive_stack_is_restored_after_a_transmissive_bounce() {
        let camera = Camera::new(
            Point3::origin(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
            1.0,
        );
        let glass = Arc::new(Surface::new(ColourRgb::new(1.0, 1.0, 1.0), 0.0, 0.0, 0.9, 0.0, 1.5).unwrap());
        let sphere = Arc::new(Shape::Sphere(Sphere::new(Point3::origin(), 1.0, glass)));
        let scene = Scene::new(camera, vec![sphere]);
        let params = KernelParams {
            max_depth: 6,
            roulette_depth: 2,
            roulette_survival: 0.8,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut stack = vec![Surface::VACUUM_REFRACTIVE_INDEX];
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let result = trace(&ray, &scene, &params, 0, 1.0, &mut stack, Vector3::zeros(), &mut rng);
        assert_eq!(stack, vec![Surface::VACUUM_REFRACTIVE_INDEX]);
        assert!(result.is_finite());
    }

    #[test]
    fn fresnel_clamps_to_full_reflection_at_grazing_incidence_on_glass() {
        // A ray aimed to just clip the silhouette of the sphere: cos(theta_1) is
        // near zero, so 1 - eta^2*(1-cos1^2) goes negative and k.sqrt() would be
        // NaN if not guarded; transmission_term must fall back to full reflection.
        let camera = Camera::new(
            Point3::origin(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
            1.0,
        );
        let glass = Arc::new(Surface::new(ColourRgb::new(1.0, 1.0, 1.0), 0.0, 0.0, 1.0, 0.0, 1.5).unwrap());
        let sphere = Arc::new(Shape::Sphere(Sphere::new(Point3::origin(), 1.0, glass)));
        let scene = Scene::new(camera, vec![sphere]);
        let params = KernelParams {
            max_depth: 6,
            roulette_depth: 3,
            roulette_survival: 0.9,
        };
        let mut rng = StdRng::seed_from_u64(99);
        let mut stack = vec![Surface::VACUUM_REFRACTIVE_INDEX];
        // x = 1 - 1e-6 grazes the unit sphere's silhouette almost tangentially.
        let ray = Ray::new(Point3::new(1.0 - 1e-6, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let result = trace(&ray, &scene, &params, 0, 1.0, &mut stack, Vector3::zeros(), &mut rng);
        assert!(result.is_finite());
        assert!(result.red >= 0.0 && result.green >= 0.0 && result.blue >= 0.0);
    }
}
