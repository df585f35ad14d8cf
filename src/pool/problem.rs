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

//! A up-to-4-dimensional integer index space, enumerated in lexicographic
//! order with the last axis slowest-varying. One [`Problem`] is the unit of
//! work dispatched to a single worker; for image rendering this is one row.

/// A single point in a [`ProblemSpace`].
pub type Problem = [u32; 4];

/// Describes a rectangular 4-D index space `[0, dims[0]) x ... x [0, dims[3])`
/// and enumerates it lexicographically, first axis fastest-varying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemSpace {
    dims: [u32; 4],
}

impl ProblemSpace {
    /// Unused axes should be set to `1`, not `0`: a `0`-sized axis makes the
    /// space empty.
    pub fn new(dims: [u32; 4]) -> Self {
        ProblemSpace { dims }
    }

    /// Convenience constructor for the common case of a 1-D space (e.g. one
    /// `Problem` per image row).
    pub fn linear(len: u32) -> Self {
        ProblemSpace::new([len, 1, 1, 1])
    }

    pub fn dims(&self) -> [u32; 4] {
        self.dims
    }

    /// Total number of problems in the space (product of all four axes).
    pub fn len(&self) -> u64 {
        self.dims.iter().map(|&d| d as u64).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances `p` to the next problem in lexicographic order, carrying into
    /// higher axes the way an odometer carries into higher digits. Returns
    /// `false` once `p` has rolled past the last problem in the space.
    pub fn advance(&self, p: &mut Problem) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut carry = true;
        for axis in 0..4 {
            if !carry {
                break;
            }
            p[axis] += 1;
            if p[axis] < self.dims[axis] {
                carry = false;
            } else {
                p[axis] = 0;
            }
        }
        !carry
    }

    /// Iterates every problem in the space in lexicographic order.
    pub fn iter(&self) -> ProblemSpaceIter<'_> {
        ProblemSpaceIter {
            space: self,
            next: if self.is_empty() { None } else { Some([0, 0, 0, 0]) },
        }
    }
}

/// Iterator over all problems in a [`ProblemSpace`], in lexicographic order.
pub struct ProblemSpaceIter<'a> {
    space: &'a ProblemSpace,
    next: Option<Problem>,
}

impl Iterator for ProblemSpaceIter<'_> {
    type Item = Problem;

    fn next(&mut self) -> Option<Problem> {
        let current = self.next?;
        let mut p = current;
        self.next = if self.space.advance(&mut p) { Some(p) } else { None };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_space_enumerates_in_order() {
        let space = ProblemSpace::linear(5);
        let got: Vec<_> = space.iter().map(|p| p[0]).collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn enumeration_covers_every_point_exactly_once() {
        let space = ProblemSpace::new([3, 2, 2, 1]);
        let all: Vec<_> = space.iter().collect();
        assert_eq!(all.len() as u64, space.len());
        let mut seen = std::collections::HashSet::new();
        for p in all {
            assert!(seen.insert(p), "duplicate problem {:?}", p);
            for axis in 0..4 {
                assert!(p[axis] < space.dims()[axis]);
            }
        }
    }

    #[test]
    fn carry_propagates_through_multiple_axes() {
        let space = ProblemSpace::new([2, 2, 1, 1]);
        let mut p = [1, 1, 0, 0];
        assert!(!space.advance(&mut p));
    }

    #[test]
    fn empty_axis_makes_space_empty() {
        let space = ProblemSpace::new([4, 0, 1, 1]);
        assert!(space.is_empty());
        assert_eq!(space.iter().count(), 0);
    }
}
