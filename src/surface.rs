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

//! Immutable material description consumed by the kernel.

use crate::colour::ColourRgb;
use thiserror::Error;

/// Failure constructing a [`Surface`]: a coefficient outside its valid range.
#[derive(Debug, Error, PartialEq)]
pub enum SurfaceError {
    #[error("surface coefficient {field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("refractive index must be >= 1.0, got {value}")]
    RefractiveIndex { value: f64 },
}

/// An immutable material record: base colour plus the four coefficients that
/// drive the kernel's term weighting (diffuse, specular, transmissive,
/// emissive), and a refractive index for the transmission term's Snell's law
/// and Fresnel computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub colour: ColourRgb<f32>,
    pub diffuse_reflectance: f32,
    pub reflectance: f32,
    pub transmittance: f32,
    pub emittance: f32,
    pub refractive_index: f64,
}

impl Surface {
    /// Vacuum/default refractive index used by the kernel's entry in its
    /// refractive-index stack.
    pub const VACUUM_REFRACTIVE_INDEX: f64 = 1.0;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        colour: ColourRgb<f32>,
        diffuse_reflectance: f32,
        reflectance: f32,
        transmittance: f32,
        emittance: f32,
        refractive_index: f64,
    ) -> Result<Self, SurfaceError> {
        let checks: [(&'static str, f32); 4] = [
            ("diffuse_reflectance", diffuse_reflectance),
            ("reflectance", reflectance),
            ("transmittance", transmittance),
            ("emittance", emittance),
        ];
        for (field, value) in checks {
            if value < 0.0 {
                return Err(SurfaceError::Negative { field, value });
            }
        }
        if colour.red < 0.0 || colour.green < 0.0 || colour.blue < 0.0 {
            return Err(SurfaceError::Negative {
                field: "colour",
                value: colour.max(),
            });
        }
        if refractive_index < 1.0 {
            return Err(SurfaceError::RefractiveIndex { value: refractive_index });
        }
        Ok(Surface {
            colour,
            diffuse_reflectance,
            reflectance,
            transmittance,
            emittance,
            refractive_index,
        })
    }

    pub fn is_emissive(&self) -> bool {
        self.emittance > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white() -> ColourRgb<f32> {
        ColourRgb::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn valid_surface_constructs() {
        let s = Surface::new(white(), 0.8, 0.0, 0.0, 0.0, 1.0).unwrap();
        assert!(!s.is_emissive());
    }

    #[test]
    fn negative_coefficient_is_rejected() {
        let err = Surface::new(white(), -0.1, 0.0, 0.0, 0.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            SurfaceError::Negative {
                field: "diffuse_reflectance",
                value: -0.1
            }
        );
    }

    #[test]
    fn sub_unity_refractive_index_is_rejected() {
        let err = Surface::new(white(), 0.0, 0.0, 0.9, 0.0, 0.5).unwrap_err();
        assert_eq!(err, SurfaceError::RefractiveIndex { value: 0.5 });
    }

    #[test]
    fn positive_emittance_marks_emissive() {
        let s = Surface::new(white(), 0.0, 0.0, 0.0, 4.0, 1.0).unwrap();
        assert!(s.is_emissive());
    }
}
