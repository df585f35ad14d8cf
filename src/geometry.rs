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

//! Thin geometric helpers layered over `nalgebra`.

use nalgebra::{Point3, Vector3};

/// A world-space ray. The kernel requires `direction` be unit length before
/// intersection search; callers build rays through [`Ray::new`], which
/// normalizes for them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// Reflects `d` about the normal `n` (`n` must be unit length): `d - 2(d.n)n`.
pub fn reflect(d: &Vector3<f64>, n: &Vector3<f64>) -> Vector3<f64> {
    d - n * (2.0 * d.dot(n))
}

/// Builds an orthonormal basis `(n, j, k)` around the unit vector `n`, used by
/// the kernel to express a cosine-weighted hemisphere sample in world space.
///
/// Picks whichever of `n`'s axes is least dominant to seed the cross product,
/// avoiding the near-collinear instability of always crossing with a fixed
/// world axis (mirrors the dominant-axis construction in the original
/// renderer's hemisphere sampler rather than a `nonCollinear`-vector lookup).
pub fn orthonormal_basis(n: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let seed = if n.x.abs() > n.y.abs() {
        Vector3::new(-n.z, 0.0, n.x).normalize()
    } else {
        Vector3::new(0.0, n.z, -n.y).normalize()
    };
    let j = seed;
    let k = n.cross(&j);
    (j, k)
}
