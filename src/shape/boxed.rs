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

//! A rectangular cuboid expressed as six [`Rectangle`] faces under a rigid
//! rotation, rather than reimplementing slab-test intersection — named
//! `boxed` to avoid colliding with `std::boxed::Box`.

use crate::geometry::Ray;
use crate::shape::rectangle::Rectangle;
use crate::surface::Surface;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::Rng;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BoxShape {
    faces: [Rectangle; 6],
    pub surface: Arc<Surface>,
}

impl BoxShape {
    /// `center`, axis-aligned `half_extents` before rotation, and a rigid
    /// `rotation` applied to every face's origin and edge vectors.
    pub fn new(
        center: Point3<f64>,
        half_extents: Vector3<f64>,
        rotation: UnitQuaternion<f64>,
        surface: Arc<Surface>,
    ) -> Self {
        let (hx, hy, hz) = (half_extents.x, half_extents.y, half_extents.z);
        let rotate_point = |local: Vector3<f64>| center + rotation * local;
        let rotate_vec = |local: Vector3<f64>| rotation * local;

        let x = Vector3::new(2.0 * hx, 0.0, 0.0);
        let y = Vector3::new(0.0, 2.0 * hy, 0.0);
        let z = Vector3::new(0.0, 0.0, 2.0 * hz);

        let face = |corner: Vector3<f64>, e0: Vector3<f64>, e1: Vector3<f64>| {
            Rectangle::new(rotate_point(corner), rotate_vec(e0), rotate_vec(e1), surface.clone())
        };

        let faces = [
            // -z and +z
            face(Vector3::new(-hx, -hy, -hz), x, y),
            face(Vector3::new(-hx, -hy, hz), x, y),
            // -y and +y
            face(Vector3::new(-hx, -hy, -hz), x, z),
            face(Vector3::new(-hx, hy, -hz), x, z),
            // -x and +x
            face(Vector3::new(-hx, -hy, -hz), y, z),
            face(Vector3::new(hx, -hy, -hz), y, z),
        ];

        BoxShape { faces, surface }
    }

    /// Nearest strictly-positive intersection across all six faces.
    pub fn intersect(&self, ray: &Ray) -> Option<(f64, usize)> {
        self.faces
            .iter()
            .enumerate()
            .filter_map(|(i, face)| face.intersect(ray).map(|t| (t, i)))
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap())
    }

    pub fn normal_at(&self, face_index: usize, point: Point3<f64>) -> Vector3<f64> {
        self.faces[face_index].normal_at(point)
    }

    pub fn sample_surface(&self, rng: &mut impl Rng) -> Point3<f64> {
        let i = rng.gen_range(0..self.faces.len());
        self.faces[i].sample_surface(rng)
    }
}
