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

//! Ties `Image` + `Task` + `ThreadPool` + `Camera` + the kernel into the one
//! `render()` call the embedding application drives, mirroring
//! `Compiler::run` / `Pipeline::next_pass` in the texture compiler.

use crate::colour::ColourRgb;
use crate::image::{Image, ImageError};
use crate::kernel::{trace, KernelParams};
use crate::pool::{Problem, ProblemSpace, TaskHandle, ThreadPool};
use crate::scene::Scene;
use crate::surface::Surface;
use crate::Config;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

thread_local! {
    /// One `StdRng` per worker thread, seeded once on first use. Mirrors the
    /// original's `thread_local std::mt19937` seeded from `std::random_device`.
    static WORKER_RNG: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());
}

/// Failure starting a render. Per-pixel numerical issues (NaN radiance,
/// total internal reflection) are handled inside the kernel, not surfaced here.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not allocate the target image: {0}")]
    Image(#[from] ImageError),
}

/// Builds the per-row `Image` buffer, wraps the camera + kernel in a `Task`
/// over a one-dimensional `ProblemSpace` of height rows, and enqueues it on
/// `pool`. Returns immediately with a [`TaskHandle`]; call `.wait()` on it to
/// block for the finished image.
#[instrument(skip(scene, config, pool), fields(width = config.width, height = config.height))]
pub fn render(
    scene: Arc<Scene>,
    config: &Config,
    pool: &ThreadPool<ColourRgb<f32>>,
) -> Result<TaskHandle<ColourRgb<f32>>, RenderError> {
    let image = Image::new(config.width as usize, config.height as usize)?;
    let width = config.width;
    let height = config.height;
    let samples_per_pixel = config.samples_per_pixel.max(1);
    let params = KernelParams {
        max_depth: config.max_depth,
        roulette_depth: config.roulette_depth,
        roulette_survival: config.roulette_survival,
    };

    let per_row = move |row: &mut [ColourRgb<f32>], p: Problem, cancel: &AtomicBool| {
        let y = p[0];
        WORKER_RNG.with(|cell| {
            let mut rng = cell.borrow_mut();
            for x in 0..width {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                let mut accum = ColourRgb::BLACK;
                for _ in 0..samples_per_pixel {
                    let ray = scene.camera().sample_ray(x, y, width, height, &mut *rng);
                    let mut refractive_stack = vec![Surface::VACUUM_REFRACTIVE_INDEX];
                    accum += trace(
                        &ray,
                        &scene,
                        &params,
                        0,
                        1.0,
                        &mut refractive_stack,
                        Vector3::zeros(),
                        &mut *rng,
                    );
                }
                row[x as usize] = accum * (1.0 / samples_per_pixel as f32);
            }
        });
    };

    Ok(pool.enqueue_task(image, ProblemSpace::linear(height), 0, per_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::shape::Sphere;
    use crate::surface::Surface as Mat;
    use nalgebra::{Point3, Vector3 as V3};

    fn small_scene() -> Arc<Scene> {
        let camera = Camera::new(Point3::new(0.0, 0.0, 4.0), V3::new(0.0, 0.0, -1.0), V3::new(0.0, 1.0, 0.0), 1.0);
        let light = Arc::new(crate::shape::Shape::Sphere(Sphere::new(
            Point3::new(0.0, 5.0, 0.0),
            1.0,
            Arc::new(Mat::new(ColourRgb::new(1.0, 1.0, 1.0), 0.0, 0.0, 0.0, 6.0, 1.0).unwrap()),
        )));
        let floor = Arc::new(crate::shape::Shape::Sphere(Sphere::new(
            Point3::new(0.0, -1001.0, 0.0),
            1000.0,
            Arc::new(Mat::new(ColourRgb::new(0.8, 0.8, 0.8), 0.8, 0.0, 0.0, 0.0, 1.0).unwrap()),
        )));
        Arc::new(Scene::new(camera, vec![light, floor]))
    }

    #[test]
    fn render_produces_a_fully_populated_finite_image() {
        let scene = small_scene();
        let mut config = Config::new(16, 16);
        config.samples_per_pixel = 4;
        config.threads = Some(2);
        let pool: ThreadPool<ColourRgb<f32>> = ThreadPool::new(config.threads);
        let handle = render(scene, &config, &pool).unwrap();
        let image = handle.wait();
        for row in image.rows() {
            for px in row {
                assert!(px.is_finite());
            }
        }
        pool.wait();
    }

    #[test]
    fn cancelling_the_handle_still_yields_a_usable_image() {
        let scene = small_scene();
        let mut config = Config::new(8, 8);
        config.samples_per_pixel = 1;
        let pool: ThreadPool<ColourRgb<f32>> = ThreadPool::new(Some(2));
        let handle = render(scene, &config, &pool).unwrap();
        handle.cancel();
        let image = handle.wait();
        assert_eq!(image.width(), 8);
        pool.wait();
    }
}
