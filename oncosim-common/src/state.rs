use serde::{Deserialize, Serialize};
use std::fmt;

/// Biological/experimental tag carried by every cell. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    WildType,
    /// Temporarily bound to the substrate (see the attachment rules).
    Attached,
    TCell,
    Tumor,
    Other,
}

impl MutationState {
    pub const ALL: [MutationState; 5] = [
        MutationState::WildType,
        MutationState::Attached,
        MutationState::TCell,
        MutationState::Tumor,
        MutationState::Other,
    ];

    /// Stable column name used in snapshots and CSV output.
    pub fn name(self) -> &'static str {
        match self {
            MutationState::WildType => "wild_type",
            MutationState::Attached => "attached",
            MutationState::TCell => "t_cell",
            MutationState::Tumor => "tumor",
            MutationState::Other => "other",
        }
    }
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cell-cycle role of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProliferativeType {
    Stem,
    Transit,
    Differentiated,
}

impl fmt::Display for ProliferativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProliferativeType::Stem => "stem",
            ProliferativeType::Transit => "transit",
            ProliferativeType::Differentiated => "differentiated",
        };
        f.write_str(name)
    }
}
