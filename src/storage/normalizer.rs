use serde::{Deserialize, Serialize};
use crate::errors::SGError;

///
/// Per-dimension affine map between the box `[lower, upper]` and the unit cube.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Normalizer
{
    pub(crate) lower: Vec<f64>,
    pub(crate) upper: Vec<f64>,
}

impl Normalizer
{
    pub fn new(lower: &[f64], upper: &[f64]) -> Result<Self, SGError>
    {
        if lower.len() != upper.len()
        {
            return Err(SGError::DimensionMismatch);
        }
        for (lo, hi) in lower.iter().zip(upper.iter())
        {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi
            {
                return Err(SGError::InvalidDomain);
            }
        }
        Ok(Self { lower: lower.to_vec(), upper: upper.to_vec() })
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.lower.len()
    }

    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.upper[dim] - self.lower[dim]
    }

    ///
    /// Volume of the box (width(dim1)*...*width(dim_n))
    ///
    #[inline]
    pub fn volume(&self) -> f64
    {
        (0..self.num_inputs()).map(|d| self.width(d)).product()
    }

    #[inline]
    pub fn to_unit_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        let mut r = vec![0.0; point.len()];
        for i in 0..point.len()
        {
            r[i] = (point[i] - self.lower[i])/(self.upper[i] - self.lower[i]);
        }
        r
    }

    #[inline]
    pub fn to_real_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        let mut r = vec![0.0; point.len()];
        for i in 0..point.len()
        {
            r[i] = self.lower[i] + (self.upper[i] - self.lower[i]) * point[i];
        }
        r
    }

    #[inline]
    pub fn contains(&self, point: &[f64]) -> bool
    {
        #[allow(clippy::needless_range_loop)]
        for d in 0..point.len()
        {
            if self.lower[d] > point[d] || self.upper[d] < point[d]
            {
                return false;
            }
        }
        true
    }
}
