use serde::{Deserialize, Serialize};

use crate::error::{GradeError, Result};

/// Default number of sample points per universe
pub const DEFAULT_RESOLUTION: usize = 101;

/// A discretized numeric domain: `resolution` evenly spaced points from
/// `min` to `max` inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub min: f64,
    pub max: f64,
    pub resolution: usize,
}

impl Universe {
    pub const fn new(min: f64, max: f64, resolution: usize) -> Self {
        Self {
            min,
            max,
            resolution,
        }
    }

    /// `[0, 1]` sampled at 101 points
    pub const fn unit() -> Self {
        Self::new(0.0, 1.0, DEFAULT_RESOLUTION)
    }

    /// `[0, 100]` sampled at 101 points
    pub const fn percent() -> Self {
        Self::new(0.0, 100.0, DEFAULT_RESOLUTION)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            return Err(GradeError::InvalidRuleBase(format!(
                "universe bounds must be finite with max > min, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.resolution < 2 {
            return Err(GradeError::InvalidRuleBase(format!(
                "universe needs at least 2 sample points, got {}",
                self.resolution
            )));
        }
        Ok(())
    }

    /// The `i`-th sample point
    pub fn point(&self, i: usize) -> f64 {
        let step = (self.max - self.min) / (self.resolution - 1) as f64;
        if i + 1 == self.resolution {
            self.max
        } else {
            self.min + step * i as f64
        }
    }

    /// All sample points in ascending order
    pub fn points(&self) -> Vec<f64> {
        (0..self.resolution).map(|i| self.point(i)).collect()
    }

    /// Clamp a crisp value into the domain
    ///
    /// Never panics, even on a universe that fails [`Universe::validate`].
    pub fn clip(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Triangular membership function with breakpoints `a <= b <= c`
///
/// Zero outside `[a, c]`, rising linearly to 1 at `b`, then falling back to 0
/// at `c`. With `a == b` or `b == c` the triangle degenerates into a
/// shoulder with value 1 at the shared breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularMf {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl TriangularMf {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn is_valid(&self) -> bool {
        self.a.is_finite()
            && self.b.is_finite()
            && self.c.is_finite()
            && self.a <= self.b
            && self.b <= self.c
    }

    /// Degree of membership of `x`, in `[0, 1]`
    pub fn degree(&self, x: f64) -> f64 {
        let Self { a, b, c } = *self;
        if x < a || x > c {
            return 0.0;
        }
        if x <= b {
            if b > a {
                (x - a) / (b - a)
            } else {
                1.0
            }
        } else if c > b {
            (c - x) / (c - b)
        } else {
            1.0
        }
    }

    /// The function sampled over a universe
    pub fn sample(&self, universe: &Universe) -> Vec<f64> {
        (0..universe.resolution)
            .map(|i| self.degree(universe.point(i)))
            .collect()
    }
}
