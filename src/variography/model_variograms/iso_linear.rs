use serde::{Deserialize, Serialize};

use super::IsoVariogramModel;

/// Unbounded linear structure. `sill` is the semivariance reached at `range`; the
/// model keeps growing with the same slope beyond it.
#[derive(Debug, Clone, Default, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoLinear {
    pub nugget: f64,
    pub sill: f64,
    pub range: f64,
}

impl IsoLinear {
    pub fn new(nugget: f64, sill: f64, range: f64) -> Self {
        Self {
            nugget,
            sill,
            range,
        }
    }

    pub fn slope(&self) -> f64 {
        (self.sill - self.nugget) / self.range
    }

    pub fn param_cnt() -> usize {
        3
    }

    pub fn update_from_slice(&mut self, params: &[f64]) {
        self.nugget = params[0];
        self.sill = params[1];
        self.range = params[2];
    }
}

impl IsoVariogramModel for IsoLinear {
    fn c_0(&self) -> f64 {
        self.sill
    }

    fn nugget(&self) -> f64 {
        self.nugget
    }

    fn range(&self) -> f64 {
        self.range
    }

    fn variogram(&self, h: f64) -> f64 {
        if h <= 0.0 {
            return 0.0;
        }
        self.nugget + self.slope() * h
    }
}
