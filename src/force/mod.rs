//! Force contributions applied to node accumulators before integration.

mod diffusion;
mod interaction;

pub use diffusion::DiffusionForce;
pub use interaction::InteractionSpringForce;

use crate::geometry::{displacement, rest_length};
use crate::population::CellPopulation;
use oncosim_common::{MechanicsConfig, Vec2};
use rand::RngCore;

/// Adds one force law's contribution to every affected node.
pub trait Force {
    fn add_force_contribution(&self, population: &mut dyn CellPopulation, rng: &mut dyn RngCore);

    fn name(&self) -> &'static str;
}

/// Base pairwise law: the force on node `a` due to node `b`. Node `b` receives the negation.
pub trait SpringLaw {
    fn force_between_nodes(&self, population: &dyn CellPopulation, a: usize, b: usize) -> Vec2;
}

/// Decay constant of the attractive branch.
const ATTRACTION_DECAY: f64 = 5.0;

/// Linear spring with logarithmic repulsion and exponentially decaying attraction.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralisedLinearSpring {
    pub spring_stiffness: f64,
    pub cutoff_length: Option<f64>,
}

impl GeneralisedLinearSpring {
    pub fn new(spring_stiffness: f64, cutoff_length: Option<f64>) -> Self {
        GeneralisedLinearSpring { spring_stiffness, cutoff_length }
    }

    pub fn from_config(mechanics: &MechanicsConfig) -> Self {
        Self::new(mechanics.spring_stiffness, Some(mechanics.cutoff_length))
    }

    /// Force on a node at `a` (radius `radius_a`) from a node at `b`.
    pub fn force(&self, a: Vec2, radius_a: f64, b: Vec2, radius_b: f64) -> Vec2 {
        let difference = displacement(a, b);
        let distance = difference.length();
        if let Some(cutoff) = self.cutoff_length {
            if distance >= cutoff {
                return Vec2::zero();
            }
        }
        let unit = difference / distance;
        let rest = rest_length(radius_a, radius_b);
        let overlap = distance - rest;

        if overlap < 0.0 {
            unit * (self.spring_stiffness * rest * (1.0 + overlap / rest).ln())
        } else {
            unit * (self.spring_stiffness * overlap * (-ATTRACTION_DECAY * overlap / rest).exp())
        }
    }
}

impl Default for GeneralisedLinearSpring {
    fn default() -> Self {
        Self::from_config(&MechanicsConfig::default())
    }
}

impl SpringLaw for GeneralisedLinearSpring {
    fn force_between_nodes(&self, population: &dyn CellPopulation, a: usize, b: usize) -> Vec2 {
        self.force(
            population.location(a),
            population.radius(a),
            population.location(b),
            population.radius(b),
        )
    }
}
