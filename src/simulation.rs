use crate::boundary::PlaneBoundaryCondition;
use crate::cell::Cell;
use crate::cycle::CellCycleModel;
use crate::force::{DiffusionForce, Force, GeneralisedLinearSpring, InteractionSpringForce};
use crate::mesh::TriangularMesh;
use crate::pde::AveragedSourcePde;
use crate::population::{CellPopulation, NodePopulation};
use crate::transition::{TransitionEngine, TransitionSummary};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use oncosim_common::{angle_to_vec, MutationState, ProliferativeType, SimulationConfig, Snapshot, Vec2};
use rand::distr::Uniform;
use rand::prelude::*;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::path::PathBuf;

/// Drives a node population through force, integration and transition hooks.
pub struct Simulation {
    /// The simulation configuration, including initial conditions and parameters.
    config: SimulationConfig,
    population: NodePopulation,
    /// Single generator for placement, division, forces and transitions.
    rng: StdRng,
    forces: Vec<Box<dyn Force>>,
    transitions: TransitionEngine,
    boundary: Option<PlaneBoundaryCondition>,
    pde: Option<AveragedSourcePde>,
    coarse_mesh: Option<TriangularMesh>,
    /// Cells removed since the last snapshot.
    deaths_since_last: u32,
    recorded_snapshots: Vec<Snapshot>,
}

impl Simulation {
    /// Creates a new `Simulation`, building every enabled component and placing initial cells.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.initial_conditions.seed);

        let mut population = NodePopulation::new(config.mechanics.cutoff_length, config.timing.dt_hours);
        let radius = config.initial_conditions.cell_radius;
        for (cell, location) in place_initial_cells(&config, &mut rng)? {
            population.add_cell(cell, location, radius);
        }
        population.update();

        let mut forces: Vec<Box<dyn Force>> = vec![Box::new(InteractionSpringForce::new(
            GeneralisedLinearSpring::from_config(&config.mechanics),
        ))];
        if config.diffusion_force.enabled {
            forces.push(Box::new(DiffusionForce::from_config(
                &config.diffusion_force,
                config.mechanics.damping,
            )?));
        }

        let transitions = TransitionEngine::from_config(&config)?;
        let boundary = if config.boundary.enabled {
            Some(PlaneBoundaryCondition::from_config(&config.boundary)?)
        } else {
            None
        };

        let (pde, coarse_mesh) = if config.pde.enabled {
            let half_width = 2.0 * config.killer.outer_kill_radius.max(config.anchor().length());
            let mesh = TriangularMesh::rectangle(
                Vec2::new(-half_width, -half_width),
                2.0 * half_width,
                2.0 * half_width,
                config.pde.coarse_element_size,
            )
            .context("Failed to build the coarse PDE mesh")?;
            info!("Coarse mesh: {} elements over [-{:.2}, {:.2}]^2.", mesh.elements().len(), half_width, half_width);
            (Some(AveragedSourcePde::from_config(&config.pde)), Some(mesh))
        } else {
            (None, None)
        };

        info!(
            "Simulation initialised: {} cells, forces [{}].",
            population.num_cells(),
            forces.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
        );

        Ok(Simulation {
            config,
            population,
            rng,
            forces,
            transitions,
            boundary,
            pde,
            coarse_mesh,
            deaths_since_last: 0,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Replaces the generator; runs from the same state and seed are identical.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn output_directory(&self) -> PathBuf {
        PathBuf::from(&self.config.output.directory)
    }

    /// Opens outputs and runs the pre-loop hooks.
    pub fn setup_solve(&mut self) -> Result<()> {
        let dir = self.output_directory();
        self.transitions.setup_solve(&mut self.population, &mut self.rng, &dir)?;
        self.setup_source_terms()
    }

    /// Flushes outputs held by the hooks.
    pub fn finish(&mut self) -> Result<()> {
        self.transitions.update_at_end_of_solve()
    }

    /// Advances the simulation by one timestep.
    pub fn step(&mut self) -> Result<TransitionSummary> {
        // --- 1. Remove cells marked for death during the previous step ---
        self.deaths_since_last += self.population.remove_dead_cells() as u32;

        // --- 2. Divisions ---
        self.handle_division()?;

        // --- 3. Forces and position update ---
        self.population.update();
        self.population.clear_forces();
        for force in &self.forces {
            force.add_force_contribution(&mut self.population, &mut self.rng);
        }
        self.population.integrate(self.config.mechanics.damping);
        if let Some(boundary) = &self.boundary {
            boundary.impose(&mut self.population);
        }

        // --- 4. End-of-step transitions ---
        self.population.advance_time();
        let summary = self
            .transitions
            .update_at_end_of_time_step(&mut self.population, &mut self.rng)?;

        // --- 5. PDE source terms on sampling steps ---
        if self.population.time_step() % self.config.timing.sampling_timestep_multiple == 0 {
            self.setup_source_terms()?;
        }
        Ok(summary)
    }

    fn setup_source_terms(&mut self) -> Result<()> {
        if let (Some(pde), Some(mesh)) = (self.pde.as_mut(), self.coarse_mesh.as_ref()) {
            pde.setup_source_terms(&self.population, mesh, None)
                .with_context(|| format!("Source-term setup failed at t = {:.3}", self.population.time()))?;
        }
        Ok(())
    }

    fn handle_division(&mut self) -> Result<()> {
        let now = self.population.time();
        let half_separation = 0.5 * self.config.mechanics.division_separation;
        let angle_dist = Uniform::new(0.0, TAU)?;

        let mut daughters = Vec::new();
        for index in 0..self.population.num_cells() {
            if !self.population.cell(index).ready_to_divide(now) {
                continue;
            }
            let daughter = self.population.cell_mut(index).divide(now, &mut self.rng);
            let offset = angle_to_vec(self.rng.sample(angle_dist)) * half_separation;
            let centre = self.population.location(index);
            self.population.set_location(index, centre - offset);
            daughters.push((daughter, centre + offset, self.population.radius(index)));
        }

        if !daughters.is_empty() {
            debug!("{} divisions at t = {:.3}.", daughters.len(), now);
        }
        for (daughter, location, radius) in daughters {
            self.population.add_cell(daughter, location, radius);
        }
        Ok(())
    }

    /// Live cell positions as `(x, y)` pairs.
    pub fn get_results(&self) -> Vec<(f64, f64)> {
        self.population
            .cells()
            .iter()
            .zip(self.population.nodes())
            .filter(|(cell, _)| !cell.is_dead())
            .map(|(_, node)| (node.location.x, node.location.y))
            .collect()
    }

    pub fn current_cell_count(&self) -> usize {
        self.population.live_count()
    }

    pub fn current_time_step(&self) -> u32 {
        self.population.time_step()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn population(&self) -> &NodePopulation {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut NodePopulation {
        &mut self.population
    }

    pub fn pde(&self) -> Option<&AveragedSourcePde> {
        self.pde.as_ref()
    }

    /// Records counts, densities and (optionally) positions at the current time.
    pub fn record_snapshot(&mut self) -> Result<()> {
        let time = self.population.time();
        debug!("Recording snapshot at {:.2} h...", time);

        let mut mutation_counts = BTreeMap::new();
        for state in MutationState::ALL {
            mutation_counts.insert(state.name().to_string(), self.population.count(state) as u32);
        }
        let labelled_count = self
            .population
            .cells()
            .iter()
            .filter(|c| !c.is_dead() && c.is_labelled())
            .count() as u32;

        let (primary_densities, secondary_densities) = match &self.pde {
            Some(pde) if pde.is_set_up() => (pde.primary_densities().to_vec(), pde.secondary_densities().to_vec()),
            _ => (Vec::new(), Vec::new()),
        };

        let positions = if self.config.output.save_positions_in_snapshot {
            Some(self.get_results())
        } else {
            None
        };

        let snapshot = Snapshot {
            time,
            total_cell_count: self.current_cell_count() as u32,
            mutation_counts,
            labelled_count,
            deaths_since_last: self.deaths_since_last,
            primary_densities,
            secondary_densities,
            positions,
        };
        self.deaths_since_last = 0;

        if snapshot.total_cell_count == 0 {
            warn!("Snapshot at {:.2} h has no live cells.", time);
        }
        self.recorded_snapshots.push(snapshot);
        Ok(())
    }

    /// Provides access to the recorded snapshots.
    pub fn get_recorded_snapshots(&self) -> &Vec<Snapshot> {
        &self.recorded_snapshots
    }
}

fn seeded_cell(
    config: &SimulationConfig,
    mutation: MutationState,
    kind: ProliferativeType,
    unit: Uniform<f64>,
    rng: &mut StdRng,
) -> Cell {
    let mut cycle = CellCycleModel::from_config(&config.cell_cycle, 0.0);
    cycle.set_birth_time(-rng.sample(unit) * cycle.initial_age_window());
    let mut cell = Cell::new(mutation, kind, cycle);
    cell.initialise_cycle(rng);
    cell
}

// Uniform over a disc of the given radius.
fn point_in_disc(radius: f64, unit: Uniform<f64>, rng: &mut StdRng) -> Vec2 {
    let r = radius * rng.sample(unit).sqrt();
    angle_to_vec(rng.sample(unit) * TAU) * r
}

/// Stem T cell at the anchor, a tumour cluster at the origin and free T cells
/// spread over the domain disc. Birth times are staggered over one typical
/// cycle so divisions do not synchronise.
fn place_initial_cells(config: &SimulationConfig, rng: &mut StdRng) -> Result<Vec<(Cell, Vec2)>> {
    let ic = &config.initial_conditions;
    let unit = Uniform::new(0.0, 1.0)?;

    let mut cells = Vec::with_capacity(ic.num_tumor_cells as usize + ic.num_t_cells as usize + 1);
    if ic.include_stem_t_cell {
        let stem = seeded_cell(config, MutationState::TCell, ProliferativeType::Stem, unit, rng);
        cells.push((stem, config.anchor()));
    }
    for _ in 0..ic.num_tumor_cells {
        let location = point_in_disc(ic.tumor_cluster_radius, unit, rng);
        cells.push((seeded_cell(config, MutationState::Tumor, ProliferativeType::Transit, unit, rng), location));
    }
    for _ in 0..ic.num_t_cells {
        let location = point_in_disc(config.domain.domain_radius, unit, rng);
        cells.push((seeded_cell(config, MutationState::TCell, ProliferativeType::Differentiated, unit, rng), location));
    }

    if config.domain.domain_radius >= config.killer.inner_kill_radius && ic.num_t_cells > 0 {
        warn!(
            "Domain radius {:.2} reaches the kill annulus (inner radius {:.2}); some initial T cells may die at once.",
            config.domain.domain_radius,
            config.killer.inner_kill_radius
        );
    }
    debug!("Placed {} initial cells.", cells.len());
    Ok(cells)
}
