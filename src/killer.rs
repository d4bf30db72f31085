use crate::geometry::{point_on_circle, radial_distance};
use crate::population::CellPopulation;
use anyhow::Result;
use log::{debug, trace};
use oncosim_common::{KillerConfig, MutationState, ProliferativeType};
use rand::distr::Uniform;
use rand::Rng;
use serde::Serialize;
use std::f64::consts::TAU;

/// Counts from one killer sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepCounts {
    pub teleported: usize,
    pub killed: usize,
}

/// Teleports escaped mobile cells back onto the domain circle and kills
/// non-stem cells inside the annulus `inner < r < outer`.
#[derive(Debug, Clone)]
pub struct RadialBoundaryKiller {
    inner_kill_radius: f64,
    outer_kill_radius: f64,
    domain_radius: f64,
    mobile_kind: MutationState,
    unit: Uniform<f64>,
}

impl RadialBoundaryKiller {
    pub fn new(inner_kill_radius: f64, outer_kill_radius: f64, domain_radius: f64, mobile_kind: MutationState) -> Result<Self> {
        if inner_kill_radius >= outer_kill_radius {
            anyhow::bail!(
                "inner kill radius ({}) must be smaller than outer kill radius ({}).",
                inner_kill_radius,
                outer_kill_radius
            );
        }
        if domain_radius <= 0.0 {
            anyhow::bail!("domain radius must be positive (got {}).", domain_radius);
        }
        Ok(RadialBoundaryKiller {
            inner_kill_radius,
            outer_kill_radius,
            domain_radius,
            mobile_kind,
            unit: Uniform::new(0.0, 1.0)?,
        })
    }

    pub fn from_config(config: &KillerConfig, domain_radius: f64) -> Result<Self> {
        Self::new(config.inner_kill_radius, config.outer_kill_radius, domain_radius, config.mobile_kind)
    }

    pub fn inner_kill_radius(&self) -> f64 {
        self.inner_kill_radius
    }

    pub fn outer_kill_radius(&self) -> f64 {
        self.outer_kill_radius
    }

    pub fn domain_radius(&self) -> f64 {
        self.domain_radius
    }

    /// Strictly inside the annulus; both boundaries are safe.
    pub fn in_kill_annulus(&self, r: f64) -> bool {
        self.inner_kill_radius < r && r < self.outer_kill_radius
    }

    /// Moves a transit cell of the mobile kind that lies beyond the outer kill
    /// radius to a random point on the domain circle and differentiates it.
    ///
    /// `r` is the radial distance the caller measured for this cell.
    pub fn teleport_if_escaped<R: Rng + ?Sized>(
        &self,
        population: &mut dyn CellPopulation,
        index: usize,
        r: f64,
        rng: &mut R,
    ) -> bool {
        let cell = population.cell(index);
        if !(cell.is(self.mobile_kind)
            && cell.proliferative_type() == ProliferativeType::Transit
            && r > self.outer_kill_radius)
        {
            return false;
        }
        let theta = rng.sample(self.unit) * TAU;
        population.set_location(index, point_on_circle(self.domain_radius, theta));
        population.cell_mut(index).set_proliferative_type(ProliferativeType::Differentiated);
        trace!("Cell {} escaped at r = {:.3}; teleported to theta = {:.3}.", index, r, theta);
        true
    }

    /// Marks a non-stem cell at radius `r` for death if `r` lies in the annulus.
    pub fn kill_if_in_annulus(&self, population: &mut dyn CellPopulation, index: usize, r: f64) -> bool {
        let cell = population.cell_mut(index);
        if cell.is_stem() || !self.in_kill_annulus(r) {
            return false;
        }
        cell.kill();
        trace!("Cell {} killed in annulus at r = {:.3}.", index, r);
        true
    }

    /// One sweep over every live cell: teleport first, then the annulus check
    /// against the radius measured before any move.
    pub fn check_and_label_cells_for_death<R: Rng + ?Sized>(
        &self,
        population: &mut dyn CellPopulation,
        rng: &mut R,
    ) -> SweepCounts {
        let mut counts = SweepCounts::default();
        for index in 0..population.num_cells() {
            if population.cell(index).is_dead() {
                continue;
            }
            let r = radial_distance(population.location(index));
            if self.teleport_if_escaped(population, index, r, rng) {
                counts.teleported += 1;
            }
            if self.kill_if_in_annulus(population, index, r) {
                counts.killed += 1;
            }
        }
        if counts.teleported > 0 || counts.killed > 0 {
            debug!(
                "Radial killer at t = {:.3}: {} teleported, {} killed.",
                population.time(),
                counts.teleported,
                counts.killed
            );
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::cycle::CellCycleModel;
    use crate::population::NodePopulation;
    use oncosim_common::{CellCycleConfig, Vec2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cell(state: MutationState, kind: ProliferativeType) -> Cell {
        Cell::new(state, kind, CellCycleModel::from_config(&CellCycleConfig::default(), 0.0))
    }

    fn killer() -> RadialBoundaryKiller {
        RadialBoundaryKiller::new(5.15, 6.0, 4.9, MutationState::TCell).unwrap()
    }

    #[test]
    fn annulus_boundaries_are_exclusive() {
        let k = killer();
        assert!(!k.in_kill_annulus(5.15));
        assert!(k.in_kill_annulus(5.150001));
        assert!(k.in_kill_annulus(5.99));
        assert!(!k.in_kill_annulus(6.0));
    }

    #[test]
    fn teleport_lands_on_domain_circle() {
        let k = killer();
        let mut rng = StdRng::seed_from_u64(9);
        for i in 0..50 {
            let mut population = NodePopulation::new(1.5, 0.01);
            let x = 6.01 + i as f64 * 0.1;
            population.add_cell(cell(MutationState::TCell, ProliferativeType::Transit), Vec2::new(x, 0.0), 0.5);
            assert!(k.teleport_if_escaped(&mut population, 0, x, &mut rng));
            assert!((radial_distance(population.location(0)) - 4.9).abs() < 1e-12);
            assert_eq!(population.cell(0).proliferative_type(), ProliferativeType::Differentiated);
        }
    }

    #[test]
    fn sweep_spares_stem_cells_and_the_inner_boundary() {
        let mut population = NodePopulation::new(1.5, 0.01);
        population.add_cell(cell(MutationState::TCell, ProliferativeType::Differentiated), Vec2::new(5.5, 0.0), 0.5);
        population.add_cell(cell(MutationState::TCell, ProliferativeType::Stem), Vec2::new(0.0, 5.5), 0.5);
        population.add_cell(cell(MutationState::TCell, ProliferativeType::Differentiated), Vec2::new(0.0, -5.15), 0.5);
        population.add_cell(cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(0.5, 0.0), 0.5);
        population.add_cell(cell(MutationState::TCell, ProliferativeType::Transit), Vec2::new(-7.0, 0.0), 0.5);

        let mut rng = StdRng::seed_from_u64(1);
        let counts = killer().check_and_label_cells_for_death(&mut population, &mut rng);

        assert_eq!(counts, SweepCounts { teleported: 1, killed: 1 });
        assert!(population.cell(0).is_dead());
        assert!(!population.cell(1).is_dead());
        assert!(!population.cell(2).is_dead());
        assert!(!population.cell(3).is_dead());
        // Judged at its pre-teleport radius, so it survives the annulus check.
        assert!(!population.cell(4).is_dead());
    }

    #[test]
    fn inverted_radii_are_rejected() {
        assert!(RadialBoundaryKiller::new(6.0, 5.0, 4.9, MutationState::TCell).is_err());
    }
}
