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

//! `bp3d-raytracer` is an offline, physically-based path-traced image
//! renderer. The crate's two load-bearing parts are the cooperative [`pool`]
//! that fans a row-parallel image out to a pool of worker threads, and the
//! [`kernel`] radiance estimator each worker runs per row.
//!
//! Scene/material construction (a JSON or TOML loader), a GUI, and CLI
//! argument parsing are not part of this crate; see the crate-level README
//! for where those belong in a surrounding application.

pub mod camera;
pub mod colour;
pub mod geometry;
pub mod image;
pub mod kernel;
pub mod pool;
pub mod render;
pub mod scene;
pub mod shape;
pub mod surface;

pub use camera::Camera;
pub use colour::ColourRgb;
pub use geometry::Ray;
pub use image::{Image, ImageError};
pub use pool::{Problem, ProblemSpace, Task, TaskHandle, TaskStatus, ThreadPool};
pub use render::{render, RenderError};
pub use scene::Scene;
pub use shape::{BoxShape, IntersectionInfo, Plane, Rectangle, Shape, Sphere};
pub use surface::{Surface, SurfaceError};

/// Render-wide settings the caller constructs and hands to [`render`].
/// Mirrors the texture compiler's `compiler::Config`: a plain struct with no
/// file format or environment-variable binding of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel, averaged by the camera sampler (§4.6).
    pub samples_per_pixel: u32,
    /// Recursion depth at which the kernel stops recursing and falls back to
    /// a direct-lighting-only estimate.
    pub max_depth: u32,
    /// Recursion depth at which Russian-roulette termination begins.
    pub roulette_depth: u32,
    /// Continuation probability used by Russian roulette once `roulette_depth`
    /// is reached.
    pub roulette_survival: f32,
    /// `None` uses `std::thread::available_parallelism`.
    pub threads: Option<usize>,
    /// Display gamma applied by `Image::save`.
    pub gamma: f32,
}

impl Config {
    /// A `width x height` render at reasonable defaults: 32 samples per
    /// pixel, max depth 20, roulette starting at depth 2 with survival 0.8,
    /// hardware-parallelism thread count, gamma 2.2.
    pub fn new(width: u32, height: u32) -> Self {
        Config {
            width,
            height,
            samples_per_pixel: 32,
            max_depth: 20,
            roulette_depth: 2,
            roulette_survival: 0.8,
            threads: None,
            gamma: colour::DEFAULT_GAMMA,
        }
    }
}
