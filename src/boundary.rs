use crate::population::CellPopulation;
use anyhow::Result;
use log::trace;
use oncosim_common::{BoundaryConfig, Vec2};

const VERIFY_TOLERANCE: f64 = 1e-6;

/// Keeps every node on the inner side of a line through `point` with outward
/// unit normal `normal`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneBoundaryCondition {
    point: Vec2,
    normal: Vec2,
}

impl PlaneBoundaryCondition {
    /// The normal is normalised; a zero normal is rejected.
    pub fn new(point: Vec2, normal: Vec2) -> Result<Self> {
        let unit = normal.normalize_or_zero();
        if unit == Vec2::zero() {
            anyhow::bail!("Boundary normal {:?} has zero length.", normal);
        }
        Ok(PlaneBoundaryCondition { point, normal: unit })
    }

    pub fn from_config(config: &BoundaryConfig) -> Result<Self> {
        Self::new(
            Vec2::new(config.point[0], config.point[1]),
            Vec2::new(config.normal[0], config.normal[1]),
        )
    }

    pub fn point(&self) -> Vec2 {
        self.point
    }

    pub fn normal(&self) -> Vec2 {
        self.normal
    }

    /// Signed distance from the line; positive is outside.
    pub fn signed_distance(&self, location: Vec2) -> f64 {
        (location - self.point).dot(self.normal)
    }

    /// Projects every node outside the line back onto it. Returns how many moved.
    pub fn impose(&self, population: &mut dyn CellPopulation) -> usize {
        let mut moved = 0;
        for index in 0..population.num_cells() {
            let location = population.location(index);
            let outside = self.signed_distance(location);
            if outside > 0.0 {
                population.set_location(index, location - self.normal * outside);
                trace!("Node {} projected back onto the boundary.", index);
                moved += 1;
            }
        }
        moved
    }

    pub fn verify(&self, population: &dyn CellPopulation) -> bool {
        (0..population.num_cells()).all(|i| self.signed_distance(population.location(i)) <= VERIFY_TOLERANCE)
    }
}
