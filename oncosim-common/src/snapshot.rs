use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A snapshot of the population and source-term densities at a specific time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time (hours) at which the snapshot was taken.
    pub time: f64,
    /// Number of live cells.
    pub total_cell_count: u32,
    /// Live cells per mutation state, keyed by `MutationState::name`.
    pub mutation_counts: BTreeMap<String, u32>,
    /// Live cells carrying the label property.
    pub labelled_count: u32,
    /// Cells removed by killers since the previous snapshot.
    pub deaths_since_last: u32,
    /// Labelled T-cell density per coarse element (empty if the PDE is disabled).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_densities: Vec<f64>,
    /// Tumour density per coarse element.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_densities: Vec<f64>,
    /// Optional raw [x, y] positions of all live cells.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<(f64, f64)>>,
}
