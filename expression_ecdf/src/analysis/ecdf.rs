//! Empirical cumulative distribution function of one sample.

use std::cmp::Ordering;

/// Step function `F(x) = #{samples <= x} / n`, stored at the distinct sample values.
#[derive(Debug, Clone, PartialEq)]
pub struct EcdfCurve {
    values: Vec<f64>,
    proportions: Vec<f64>,
    n: usize,
    complementary: bool,
}

impl EcdfCurve {
    /// `None` when no finite sample is left after dropping NaN/inf.
    pub fn new(samples: &[f64], complementary: bool) -> Option<Self> {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let n = sorted.len();
        let mut values: Vec<f64> = Vec::new();
        let mut proportions: Vec<f64> = Vec::new();
        for (i, &v) in sorted.iter().enumerate() {
            let cumulative = (i + 1) as f64 / n as f64;
            let p = if complementary { 1.0 - cumulative } else { cumulative };
            match values.last() {
                // ties collapse onto the last occurrence
                Some(&last) if last == v => {
                    if let Some(slot) = proportions.last_mut() {
                        *slot = p;
                    }
                }
                _ => {
                    values.push(v);
                    proportions.push(p);
                }
            }
        }

        Some(Self { values, proportions, n, complementary })
    }

    /// Number of finite samples the curve was built from.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn proportions(&self) -> &[f64] {
        &self.proportions
    }

    pub fn min(&self) -> f64 {
        self.values[0]
    }

    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn proportion_at(&self, x: f64) -> f64 {
        let below = self.values.partition_point(|&v| v <= x);
        match below {
            0 if self.complementary => 1.0,
            0 => 0.0,
            k => self.proportions[k - 1],
        }
    }

    /// Drawable path in (value, proportion) space, starting flat at `start`.
    pub fn step_points(&self, start: f64) -> Vec<(f64, f64)> {
        let mut previous = if self.complementary { 1.0 } else { 0.0 };
        let mut points = Vec::with_capacity(self.values.len() * 2 + 1);
        points.push((start.min(self.min()), previous));
        for (&v, &p) in self.values.iter().zip(self.proportions.iter()) {
            points.push((v, previous));
            points.push((v, p));
            previous = p;
        }
        points
    }
}
