use std::collections::HashMap;

use nalgebra::Point2;
use ordered_float::OrderedFloat;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KrigingError, Result};

pub type AreaId = i64;

type Centroid = GeomWithData<[f64; 2], usize>;

/// One polygon reduced to its centroid and aggregate value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArealUnit {
    pub id: AreaId,
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl ArealUnit {
    pub fn new(id: AreaId, x: f64, y: f64, value: f64) -> Self {
        Self { id, x, y, value }
    }

    #[inline(always)]
    pub fn centroid(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(KrigingError::InvalidInput(format!(
                "area {} has a non-finite centroid ({}, {})",
                self.id, self.x, self.y
            )));
        }
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(KrigingError::InvalidInput(format!(
                "area {} has value {}, expected a finite non-negative number",
                self.id, self.value
            )));
        }
        Ok(())
    }
}

/// A point of population support located inside an area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportPoint {
    pub area_id: AreaId,
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SupportPoint {
    pub fn new(area_id: AreaId, x: f64, y: f64, value: f64) -> Self {
        Self {
            area_id,
            x,
            y,
            value,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(KrigingError::InvalidInput(format!(
                "support point of area {} has non-finite coordinates ({}, {})",
                self.area_id, self.x, self.y
            )));
        }
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(KrigingError::InvalidInput(format!(
                "support point of area {} has value {}, expected a finite non-negative number",
                self.area_id, self.value
            )));
        }
        Ok(())
    }
}

/// Sum of point-support values of an area. This is the population used to weight
/// the area in the semivariance estimator and in the Poisson correction.
pub fn total_population(points: &[SupportPoint]) -> f64 {
    points.iter().map(|p| p.value).sum()
}

/// Areal units indexed by centroid, together with the population carried by each
/// area's support points.
#[derive(Clone, Debug)]
pub struct ArealDataSet {
    pub tree: RTree<Centroid>,
    pub areas: Vec<ArealUnit>,
    pub populations: Vec<f64>,
    pub support_counts: Vec<usize>,
    /// Support points grouped by area, aligned with `areas`.
    pub support: Vec<Vec<SupportPoint>>,
    index: HashMap<AreaId, usize>,
}

impl ArealDataSet {
    /// Validates both tables and aggregates support points per area.
    /// Areas without support points receive a population of 0.
    pub fn new(areas: Vec<ArealUnit>, points: &[SupportPoint]) -> Result<Self> {
        let mut index = HashMap::with_capacity(areas.len());
        for (i, area) in areas.iter().enumerate() {
            area.validate()?;
            if index.insert(area.id, i).is_some() {
                return Err(KrigingError::InvalidInput(format!(
                    "duplicate area id {}",
                    area.id
                )));
            }
        }

        let mut populations = vec![0f64; areas.len()];
        let mut support_counts = vec![0usize; areas.len()];
        let mut support = vec![Vec::new(); areas.len()];
        for point in points {
            point.validate()?;
            let Some(&i) = index.get(&point.area_id) else {
                return Err(KrigingError::InvalidInput(format!(
                    "support point references unknown area {}",
                    point.area_id
                )));
            };
            populations[i] += point.value;
            support_counts[i] += 1;
            support[i].push(*point);
        }

        let tree_points = areas
            .iter()
            .enumerate()
            .map(|(i, a)| Centroid::new([a.x, a.y], i))
            .collect();
        let tree = RTree::bulk_load(tree_points);

        debug!(
            n_areas = areas.len(),
            n_points = points.len(),
            "areal data set indexed"
        );

        Ok(Self {
            tree,
            areas,
            populations,
            support_counts,
            support,
            index,
        })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn contains(&self, id: AreaId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn index_of(&self, id: AreaId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn area(&self, ind: usize) -> &ArealUnit {
        &self.areas[ind]
    }

    pub fn population(&self, ind: usize) -> f64 {
        self.populations[ind]
    }

    pub fn support(&self, ind: usize) -> &[SupportPoint] {
        &self.support[ind]
    }

    pub fn centroids(&self) -> Vec<Point2<f64>> {
        self.areas.iter().map(ArealUnit::centroid).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.areas.iter().map(|a| a.value).collect()
    }

    /// Population-weighted mean of the area values over the given indices.
    pub fn weighted_mean(&self, inds: &[usize]) -> Option<f64> {
        let (num, den) = inds.iter().fold((0f64, 0f64), |(num, den), &i| {
            (
                num + self.populations[i] * self.areas[i].value,
                den + self.populations[i],
            )
        });
        (den > 0.0).then(|| num / den)
    }

    /// Indices and centroid distances of the areas whose centroid lies within `radius`
    /// of `point`, nearest first, truncated to `max_n`. Equal distances are ordered by area id.
    pub fn nearest_within(
        &self,
        point: &Point2<f64>,
        radius: f64,
        max_n: usize,
    ) -> Vec<(usize, f64)> {
        let mut found = self
            .tree
            .locate_within_distance([point.x, point.y], radius * radius)
            .map(|c| {
                let [x, y] = *c.geom();
                let dist = ((x - point.x).powi(2) + (y - point.y).powi(2)).sqrt();
                (c.data, dist)
            })
            .collect::<Vec<_>>();

        found.sort_by_key(|&(i, d)| (OrderedFloat(d), self.areas[i].id));
        found.truncate(max_n);
        found
    }
}
