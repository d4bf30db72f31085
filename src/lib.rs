//! Cell-population extensions for off-lattice T-cell / tumour simulations:
//! contact forces, end-of-step state transitions, a radial killer, a
//! generational cell-cycle model and a density-averaged PDE source term,
//! together with a small node-based host that drives them.

pub mod boundary;
pub mod cell;
pub mod cycle;
pub mod force;
pub mod geometry;
pub mod grid;
pub mod killer;
pub mod mesh;
pub mod pde;
pub mod population;
pub mod simulation;
pub mod transition;

pub use boundary::PlaneBoundaryCondition;
pub use cell::{Cell, CellData, CellProperties, Lifecycle};
pub use cycle::CellCycleModel;
pub use force::{DiffusionForce, Force, GeneralisedLinearSpring, InteractionSpringForce, SpringLaw};
pub use killer::RadialBoundaryKiller;
pub use mesh::{CoarseMesh, TriangularMesh};
pub use pde::AveragedSourcePde;
pub use population::{CellPopulation, NodePopulation};
pub use simulation::Simulation;
pub use transition::{TransitionEngine, TransitionSummary};
