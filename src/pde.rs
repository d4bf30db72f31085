use crate::mesh::CoarseMesh;
use crate::population::CellPopulation;
use anyhow::Result;
use log::debug;
use oncosim_common::{MutationState, PdeConfig, Vec2};
use std::collections::HashMap;

/// Concentrations at or below this only see first-order decay.
pub const LOW_CONCENTRATION: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
struct ElementDensities {
    primary: Vec<f64>,
    secondary: Vec<f64>,
}

/// Parabolic PDE whose source term is piecewise constant over a coarse mesh,
/// built from per-element cell densities.
///
/// `setup_source_terms` must run before every solve; querying the source term
/// before the first setup is a bug in the caller.
#[derive(Debug, Clone)]
pub struct AveragedSourcePde {
    du_dt_coefficient: f64,
    diffusion_coefficient: f64,
    uptake_coefficient: f64,
    decay_coefficient: f64,
    cloak_scaling: f64,
    primary_kind: MutationState,
    secondary_kind: MutationState,
    densities: Option<ElementDensities>,
}

impl AveragedSourcePde {
    pub fn new(
        du_dt_coefficient: f64,
        diffusion_coefficient: f64,
        uptake_coefficient: f64,
        decay_coefficient: f64,
    ) -> Self {
        let defaults = PdeConfig::default();
        AveragedSourcePde {
            du_dt_coefficient,
            diffusion_coefficient,
            uptake_coefficient,
            decay_coefficient,
            cloak_scaling: defaults.cloak_scaling,
            primary_kind: defaults.primary_kind,
            secondary_kind: defaults.secondary_kind,
            densities: None,
        }
    }

    pub fn from_config(config: &PdeConfig) -> Self {
        AveragedSourcePde {
            cloak_scaling: config.cloak_scaling,
            primary_kind: config.primary_kind,
            secondary_kind: config.secondary_kind,
            ..Self::new(
                config.du_dt_coefficient,
                config.diffusion_coefficient,
                config.uptake_coefficient,
                config.decay_coefficient,
            )
        }
    }

    pub fn is_set_up(&self) -> bool {
        self.densities.is_some()
    }

    /// Recounts cells per coarse element and converts counts to densities.
    ///
    /// Labelled, non-apoptotic cells of the primary kind count towards the
    /// first density; otherwise non-apoptotic cells of the secondary kind count
    /// towards the second. `element_map` maps location index to element; cells
    /// it does not cover are an error, as are cells outside the mesh.
    pub fn setup_source_terms(
        &mut self,
        population: &dyn CellPopulation,
        mesh: &dyn CoarseMesh,
        element_map: Option<&HashMap<usize, usize>>,
    ) -> Result<()> {
        let num_elements = mesh.num_elements();
        let mut primary = vec![0.0; num_elements];
        let mut secondary = vec![0.0; num_elements];

        for index in 0..population.num_cells() {
            let cell = population.cell(index);
            if cell.is_dead() {
                continue;
            }
            let element = match element_map {
                Some(map) => match map.get(&index) {
                    Some(&e) => e,
                    None => anyhow::bail!("Cell {} has no entry in the cell-to-element map.", index),
                },
                None => match mesh.containing_element(population.location(index)) {
                    Some(e) => e,
                    None => anyhow::bail!(
                        "Cell {} at {:?} lies outside the coarse mesh.",
                        index,
                        population.location(index)
                    ),
                },
            };
            if element >= num_elements {
                anyhow::bail!("Cell {} mapped to element {} but the mesh has {}.", index, element, num_elements);
            }

            if !cell.is_apoptotic() && cell.is_labelled() && cell.is(self.primary_kind) {
                primary[element] += 1.0;
            } else if !cell.is_apoptotic() && cell.is(self.secondary_kind) {
                secondary[element] += 1.0;
            }
        }

        for element in 0..num_elements {
            let volume = mesh.element_volume(element);
            primary[element] /= volume;
            secondary[element] /= volume;
        }

        debug!(
            "Source terms set up on {} coarse elements (peak densities {:.3} / {:.3}).",
            num_elements,
            primary.iter().cloned().fold(0.0, f64::max),
            secondary.iter().cloned().fold(0.0, f64::max)
        );
        self.densities = Some(ElementDensities { primary, secondary });
        Ok(())
    }

    fn densities(&self) -> &ElementDensities {
        match &self.densities {
            Some(d) => d,
            None => panic!("Element densities queried before setup_source_terms was called"),
        }
    }

    /// # Panics
    ///
    /// Panics if `setup_source_terms` has not run or `element` is out of range.
    pub fn primary_density(&self, element: usize) -> f64 {
        self.densities().primary[element]
    }

    /// # Panics
    ///
    /// Panics if `setup_source_terms` has not run or `element` is out of range.
    pub fn secondary_density(&self, element: usize) -> f64 {
        self.densities().secondary[element]
    }

    pub fn primary_densities(&self) -> &[f64] {
        &self.densities().primary
    }

    pub fn secondary_densities(&self) -> &[f64] {
        &self.densities().secondary
    }

    /// Uptake minus concentration-dependent decay, in three regimes:
    ///
    /// - `u > 0.01`: `t - (decay + cloak_scaling * s) * u`
    /// - `0 < u <= 0.01`: `t - decay * u`
    /// - `u <= 0`: `t`
    ///
    /// where `t` and `s` are the uptake-scaled primary and secondary densities.
    /// The jump at `u = 0.01` is intended.
    ///
    /// # Panics
    ///
    /// Panics if `setup_source_terms` has not run.
    pub fn compute_source_term(&self, _x: Vec2, u: f64, element: usize) -> f64 {
        let t = self.uptake_coefficient * self.primary_density(element);
        let s = self.uptake_coefficient * self.secondary_density(element);
        if u > LOW_CONCENTRATION {
            t - (self.decay_coefficient + self.cloak_scaling * s) * u
        } else if u > 0.0 {
            t - self.decay_coefficient * u
        } else {
            t
        }
    }

    /// # Panics
    ///
    /// Always. Sources are only defined per coarse element.
    pub fn compute_source_term_at_node(&self, _node: usize, _u: f64) -> f64 {
        panic!("Node-wise source terms are not supported; sources are averaged over coarse elements")
    }

    pub fn compute_du_dt_coefficient(&self, _x: Vec2) -> f64 {
        self.du_dt_coefficient
    }

    /// Isotropic diffusion tensor `D * I`.
    pub fn compute_diffusion_term(&self, _x: Vec2) -> [[f64; 2]; 2] {
        let d = self.diffusion_coefficient;
        [[d, 0.0], [0.0, d]]
    }

    pub fn uptake_rate_for_element(&self, element: usize) -> f64 {
        self.primary_density(element)
    }
}
