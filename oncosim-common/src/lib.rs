pub mod config;
pub mod snapshot;
pub mod state;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    AttachmentConfig, BoundaryConfig, CellCycleConfig, DiffusionForceConfig, DomainConfig, InitialConditions,
    KillerConfig, MechanicsConfig, OutputConfig, PdeConfig, SimulationConfig, TimingConfig,
};
pub use snapshot::Snapshot;
pub use state::{MutationState, ProliferativeType};
pub use vecmath::{angle_to_vec, vec_to_angle, Vec2};
