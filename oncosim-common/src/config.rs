use crate::state::MutationState;
use crate::vecmath::Vec2;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Geometry of the circular T-cell domain.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DomainConfig {
    #[serde(default = "default_domain_radius")]
    pub domain_radius: f64,
    /// Fixed position of the stem (spawning) cell. Derived from the domain radius if absent.
    #[serde(default)]
    pub anchor: Option<[f64; 2]>,
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub dt_hours: f64,
    pub end_time_hours: f64,
    #[serde(default = "default_sampling_multiple")]
    pub sampling_timestep_multiple: u32,
}

// Initial population, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    pub seed: u64,
    pub num_tumor_cells: u32,
    #[serde(default = "default_tumor_cluster_radius")]
    pub tumor_cluster_radius: f64,
    #[serde(default)]
    pub num_t_cells: u32,
    #[serde(default = "default_true")]
    pub include_stem_t_cell: bool,
    #[serde(default = "default_cell_radius")]
    pub cell_radius: f64,
}

/// Spring and integration parameters shared by the mechanical components.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct MechanicsConfig {
    pub spring_stiffness: f64,
    /// Interaction cutoff; also the neighbour search radius.
    pub cutoff_length: f64,
    pub damping: f64,
    pub division_separation: f64,
}

impl Default for MechanicsConfig {
    fn default() -> Self {
        MechanicsConfig {
            spring_stiffness: 15.0,
            cutoff_length: 1.5,
            damping: 1.0,
            division_separation: 0.3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct DiffusionForceConfig {
    pub enabled: bool,
    pub diffusion_intensity: f64,
    pub target_kind: MutationState,
}

impl Default for DiffusionForceConfig {
    fn default() -> Self {
        DiffusionForceConfig {
            enabled: false,
            diffusion_intensity: 0.1,
            target_kind: MutationState::TCell,
        }
    }
}

/// Attach/detach rates are probabilities per unit time.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct AttachmentConfig {
    pub enabled: bool,
    pub attachment_probability: f64,
    pub detachment_probability: f64,
    pub attachment_height: f64,
    pub output_attachment_durations: bool,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        AttachmentConfig {
            enabled: false,
            attachment_probability: 0.1,
            detachment_probability: 0.6,
            attachment_height: 1.0,
            output_attachment_durations: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct KillerConfig {
    pub enabled: bool,
    pub inner_kill_radius: f64,
    pub outer_kill_radius: f64,
    /// Transit cells of this kind are teleported back onto the domain circle.
    pub mobile_kind: MutationState,
    /// Kind that gets labelled by, and killed together with, opposing cells.
    pub target_kind: MutationState,
    pub opposing_kind: MutationState,
    pub kill_probability: f64,
}

impl Default for KillerConfig {
    fn default() -> Self {
        KillerConfig {
            enabled: true,
            inner_kill_radius: 5.15,
            outer_kill_radius: 6.0,
            mobile_kind: MutationState::TCell,
            target_kind: MutationState::TCell,
            opposing_kind: MutationState::Tumor,
            kill_probability: 0.002,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PdeConfig {
    pub enabled: bool,
    pub du_dt_coefficient: f64,
    pub diffusion_coefficient: f64,
    pub uptake_coefficient: f64,
    pub decay_coefficient: f64,
    /// Multiplier on the secondary density in the high-concentration decay.
    pub cloak_scaling: f64,
    /// Side length of the square cells split into coarse triangles.
    pub coarse_element_size: f64,
    pub primary_kind: MutationState,
    pub secondary_kind: MutationState,
}

impl Default for PdeConfig {
    fn default() -> Self {
        PdeConfig {
            enabled: false,
            du_dt_coefficient: 1.0,
            diffusion_coefficient: 1.0,
            uptake_coefficient: 1.0,
            decay_coefficient: 0.5,
            cloak_scaling: 10.0,
            coarse_element_size: 2.0,
            primary_kind: MutationState::TCell,
            secondary_kind: MutationState::Tumor,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct CellCycleConfig {
    /// Total cycle time of a spawning stem cell (hours).
    pub spawn_rate: f64,
    pub spawner_kind: MutationState,
    pub proliferating_kind: MutationState,
    pub stem_g1_duration: f64,
    pub transit_g1_duration: f64,
    pub max_transit_generations: u32,
}

impl Default for CellCycleConfig {
    fn default() -> Self {
        CellCycleConfig {
            spawn_rate: 25.0,
            spawner_kind: MutationState::TCell,
            proliferating_kind: MutationState::Tumor,
            stem_g1_duration: 14.0,
            transit_g1_duration: 2.0,
            max_transit_generations: u32::MAX,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct BoundaryConfig {
    pub enabled: bool,
    pub point: [f64; 2],
    /// Outward normal; cells on the positive side are pushed back.
    pub normal: [f64; 2],
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig {
            enabled: false,
            point: [0.0, 0.0],
            normal: [0.0, -1.0],
        }
    }
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
    pub base_filename: String,
    pub save_positions: bool,
    pub save_stats: bool,
    #[serde(default)]
    pub save_positions_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

fn default_domain_radius() -> f64 {
    5.0
}

fn default_sampling_multiple() -> u32 {
    6
}

fn default_tumor_cluster_radius() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_cell_radius() -> f64 {
    0.5
}

fn default_output_directory() -> String {
    "output".to_string()
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub domain: DomainConfig,
    pub timing: TimingConfig,
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub mechanics: MechanicsConfig,
    #[serde(default)]
    pub diffusion_force: DiffusionForceConfig,
    #[serde(default)]
    pub attachment: AttachmentConfig,
    #[serde(default)]
    pub killer: KillerConfig,
    #[serde(default)]
    pub pde: PdeConfig,
    #[serde(default)]
    pub cell_cycle: CellCycleConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects parameter combinations the components cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.timing.dt_hours <= 0.0 {
            anyhow::bail!("dt_hours must be positive.");
        }
        if self.timing.end_time_hours < 0.0 {
            anyhow::bail!("end_time_hours must not be negative.");
        }
        if self.timing.sampling_timestep_multiple == 0 {
            anyhow::bail!("sampling_timestep_multiple must be at least 1.");
        }
        if self.initial_conditions.cell_radius <= 0.0 {
            anyhow::bail!("cell_radius must be positive.");
        }
        if self.domain.domain_radius <= 0.0 {
            anyhow::bail!("domain_radius must be positive.");
        }
        if self.killer.inner_kill_radius >= self.killer.outer_kill_radius {
            anyhow::bail!(
                "inner_kill_radius ({}) must be smaller than outer_kill_radius ({}).",
                self.killer.inner_kill_radius,
                self.killer.outer_kill_radius
            );
        }
        for (name, p) in [
            ("attachment_probability", self.attachment.attachment_probability),
            ("detachment_probability", self.attachment.detachment_probability),
            ("kill_probability", self.killer.kill_probability),
        ] {
            if p < 0.0 {
                anyhow::bail!("{} must not be negative (got {}).", name, p);
            }
        }
        if self.mechanics.cutoff_length <= 0.0 || self.mechanics.damping <= 0.0 {
            anyhow::bail!("cutoff_length and damping must be positive.");
        }
        if self.pde.enabled && self.pde.coarse_element_size <= 0.0 {
            anyhow::bail!("coarse_element_size must be positive when the PDE is enabled.");
        }
        let n = self.boundary.normal;
        if self.boundary.enabled && (n[0] * n[0] + n[1] * n[1]) < 1e-12 {
            anyhow::bail!("boundary normal must be non-zero.");
        }
        // The proliferating kind has no differentiated cycle, so it must never hit the limit.
        let cycle = &self.cell_cycle;
        if cycle.max_transit_generations != u32::MAX
            && cycle.proliferating_kind != cycle.spawner_kind
            && self.seeds_kind(cycle.proliferating_kind)
        {
            anyhow::bail!(
                "max_transit_generations ({}) would differentiate {} cells; leave it unset while they are seeded.",
                cycle.max_transit_generations,
                cycle.proliferating_kind
            );
        }
        Ok(())
    }

    /// Whether the initial population contains cells of `kind`.
    fn seeds_kind(&self, kind: MutationState) -> bool {
        let ic = &self.initial_conditions;
        match kind {
            MutationState::Tumor => ic.num_tumor_cells > 0,
            MutationState::TCell => ic.include_stem_t_cell || ic.num_t_cells > 0,
            _ => false,
        }
    }

    /// Location the stem cell is pinned to every step.
    pub fn anchor(&self) -> Vec2 {
        match self.domain.anchor {
            Some([x, y]) => Vec2::new(x, y),
            None => {
                let c = (self.domain.domain_radius + 1.5) * std::f64::consts::FRAC_PI_4.cos();
                Vec2::new(c, c)
            }
        }
    }

    /// Number of whole timesteps needed to reach `end_time_hours`.
    pub fn total_steps(&self) -> u32 {
        (self.timing.end_time_hours / self.timing.dt_hours).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [domain]
        [timing]
        dt_hours = 0.01
        end_time_hours = 1.0
        [initial_conditions]
        seed = 7
        num_tumor_cells = 10
        [output]
        base_filename = "run"
        save_positions = false
        save_stats = true
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.domain.domain_radius, 5.0);
        assert_eq!(config.killer.kill_probability, 0.002);
        assert_eq!(config.pde.cloak_scaling, 10.0);
        assert!(!config.attachment.enabled);
        assert_eq!(config.total_steps(), 100);
    }

    #[test]
    fn default_anchor_sits_outside_the_domain() {
        let config = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        let anchor = config.anchor();
        assert!((anchor.x - 6.5 * std::f64::consts::FRAC_PI_4.cos()).abs() < 1e-12);
        assert_eq!(anchor.x, anchor.y);
        assert!(anchor.length() > config.killer.outer_kill_radius);
    }

    #[test]
    fn finite_generation_limit_is_rejected_for_seeded_tumour() {
        let text = format!("{}\n[cell_cycle]\nmax_transit_generations = 1\n", MINIMAL);
        let err = SimulationConfig::from_toml_str(&text).unwrap_err();
        assert!(err.to_string().contains("max_transit_generations"));

        let unseeded = text.replace("num_tumor_cells = 10", "num_tumor_cells = 0");
        let config = SimulationConfig::from_toml_str(&unseeded).unwrap();
        assert_eq!(config.cell_cycle.max_transit_generations, 1);
    }

    #[test]
    fn inverted_kill_radii_are_rejected() {
        let text = format!("{}\n[killer]\ninner_kill_radius = 7.0\n", MINIMAL);
        let err = SimulationConfig::from_toml_str(&text).unwrap_err();
        assert!(err.to_string().contains("inner_kill_radius"));
    }
}
