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

//! The immutable scene the kernel renders against: a camera and a shape list,
//! with emissive shapes precomputed into a separate "lights" sub-list so the
//! kernel's direct-lighting term never has to re-filter the full geometry.

use crate::camera::Camera;
use crate::shape::Shape;
use std::sync::Arc;

#[derive(Clone)]
pub struct Scene {
    camera: Camera,
    geometry: Vec<Arc<Shape>>,
    lights: Vec<Arc<Shape>>,
}

impl Scene {
    pub fn new(camera: Camera, geometry: Vec<Arc<Shape>>) -> Self {
        let lights = geometry
            .iter()
            .filter(|s| s.surface().is_emissive())
            .cloned()
            .collect();
        Scene {
            camera,
            geometry,
            lights,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn geometry(&self) -> &[Arc<Shape>] {
        &self.geometry
    }

    pub fn lights(&self) -> &[Arc<Shape>] {
        &self.lights
    }
}
