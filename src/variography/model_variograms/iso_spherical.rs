use serde::{Deserialize, Serialize};

use super::IsoVariogramModel;

#[derive(Debug, Clone, Default, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoSpherical {
    pub nugget: f64,
    pub sill: f64,
    pub range: f64,
}

impl IsoSpherical {
    pub fn new(nugget: f64, sill: f64, range: f64) -> Self {
        Self {
            nugget,
            sill,
            range,
        }
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

impl IsoVariogramModel for IsoSpherical {
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
        if h < self.range {
            let t = h / self.range;
            return self.nugget + (self.sill - self.nugget) * (1.5 * t - 0.5 * t.powi(3));
        }
        self.sill
    }
}
