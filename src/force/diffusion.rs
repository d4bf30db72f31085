use super::Force;
use crate::population::CellPopulation;
use anyhow::Result;
use oncosim_common::{DiffusionForceConfig, MutationState, ProliferativeType, Vec2};
use rand::RngCore;
use rand_distr::{Distribution, Normal};

/// Brownian motion for unlabelled, differentiated cells of one kind.
///
/// Each component of the force is `damping * sqrt(2 D dt) / dt * N(0, 1)`, so
/// one overdamped step displaces the cell by `sqrt(2 D dt) * N(0, 1)`.
pub struct DiffusionForce {
    diffusion_intensity: f64,
    damping: f64,
    target_kind: MutationState,
    normal: Normal<f64>,
}

impl DiffusionForce {
    pub fn new(diffusion_intensity: f64, damping: f64, target_kind: MutationState) -> Result<Self> {
        if diffusion_intensity < 0.0 {
            anyhow::bail!("diffusion_intensity must not be negative (got {}).", diffusion_intensity);
        }
        Ok(DiffusionForce {
            diffusion_intensity,
            damping,
            target_kind,
            normal: Normal::new(0.0, 1.0)?,
        })
    }

    pub fn from_config(config: &DiffusionForceConfig, damping: f64) -> Result<Self> {
        Self::new(config.diffusion_intensity, damping, config.target_kind)
    }

    pub fn diffusion_intensity(&self) -> f64 {
        self.diffusion_intensity
    }

    fn applies_to(&self, population: &dyn CellPopulation, index: usize) -> bool {
        let cell = population.cell(index);
        !cell.is_dead()
            && cell.is(self.target_kind)
            && cell.proliferative_type() == ProliferativeType::Differentiated
            && !cell.is_labelled()
    }
}

impl Force for DiffusionForce {
    fn add_force_contribution(&self, population: &mut dyn CellPopulation, rng: &mut dyn RngCore) {
        let dt = population.dt();
        let magnitude = self.damping * (2.0 * self.diffusion_intensity * dt).sqrt() / dt;
        for index in 0..population.num_cells() {
            if !self.applies_to(population, index) {
                continue;
            }
            let x = self.normal.sample(&mut *rng);
            let y = self.normal.sample(&mut *rng);
            let kick = Vec2::new(x, y);
            population.add_applied_force(index, kick * magnitude);
        }
    }

    fn name(&self) -> &'static str {
        "DiffusionForce"
    }
}
