use crate::cycle::CellCycleModel;
use oncosim_common::{MutationState, ProliferativeType};
use rand::Rng;
use std::collections::BTreeMap;

/// Cell-data key holding the time a cell last attached.
pub const ATTACH_TIME: &str = "attach_time";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Alive,
    /// Waiting for the host to remove it at the start of the next step.
    MarkedForDeath,
}

/// The closed set of boolean properties a cell can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellProperties {
    pub labelled: bool,
    pub apoptotic: bool,
}

/// Scalar key/value store attached to each cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellData {
    items: BTreeMap<String, f64>,
}

impl CellData {
    pub fn set_item(&mut self, key: &str, value: f64) {
        self.items.insert(key.to_string(), value);
    }

    pub fn item(&self, key: &str) -> Option<f64> {
        self.items.get(key).copied()
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    mutation_state: MutationState,
    proliferative_type: ProliferativeType,
    properties: CellProperties,
    data: CellData,
    lifecycle: Lifecycle,
    cycle: CellCycleModel,
}

impl Cell {
    pub fn new(mutation_state: MutationState, proliferative_type: ProliferativeType, cycle: CellCycleModel) -> Self {
        Cell {
            mutation_state,
            proliferative_type,
            properties: CellProperties::default(),
            data: CellData::default(),
            lifecycle: Lifecycle::Alive,
            cycle,
        }
    }

    pub fn labelled(mut self) -> Self {
        self.properties.labelled = true;
        self
    }

    pub fn mutation_state(&self) -> MutationState {
        self.mutation_state
    }

    pub fn set_mutation_state(&mut self, state: MutationState) {
        self.mutation_state = state;
    }

    pub fn proliferative_type(&self) -> ProliferativeType {
        self.proliferative_type
    }

    pub fn set_proliferative_type(&mut self, proliferative_type: ProliferativeType) {
        self.proliferative_type = proliferative_type;
    }

    pub fn is(&self, state: MutationState) -> bool {
        self.mutation_state == state
    }

    pub fn is_stem(&self) -> bool {
        self.proliferative_type == ProliferativeType::Stem
    }

    pub fn properties(&self) -> CellProperties {
        self.properties
    }

    pub fn is_labelled(&self) -> bool {
        self.properties.labelled
    }

    pub fn add_label(&mut self) {
        self.properties.labelled = true;
    }

    pub fn remove_label(&mut self) {
        self.properties.labelled = false;
    }

    pub fn is_apoptotic(&self) -> bool {
        self.properties.apoptotic
    }

    pub fn set_apoptotic(&mut self, apoptotic: bool) {
        self.properties.apoptotic = apoptotic;
    }

    pub fn data(&self) -> &CellData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut CellData {
        &mut self.data
    }

    pub fn kill(&mut self) {
        self.lifecycle = Lifecycle::MarkedForDeath;
    }

    pub fn is_dead(&self) -> bool {
        self.lifecycle == Lifecycle::MarkedForDeath
    }

    pub fn cycle(&self) -> &CellCycleModel {
        &self.cycle
    }

    pub fn cycle_mut(&mut self) -> &mut CellCycleModel {
        &mut self.cycle
    }

    /// Draws the G1 duration for the cell's current state.
    pub fn initialise_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cycle.set_g1_duration(self.mutation_state, self.proliferative_type, rng);
    }

    pub fn ready_to_divide(&self, now: f64) -> bool {
        !self.is_dead() && self.cycle.ready_to_divide(now)
    }

    /// Resets this cell for a new cycle and returns its daughter.
    ///
    /// The daughter inherits mutation state, properties and cell data.
    pub fn divide<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Cell {
        self.proliferative_type =
            self.cycle
                .reset_for_division(now, self.mutation_state, self.proliferative_type, rng);

        let mut daughter_cycle = self.cycle.create_daughter();
        let daughter_type = daughter_cycle.initialise_daughter(self.mutation_state, self.proliferative_type, rng);
        Cell {
            mutation_state: self.mutation_state,
            proliferative_type: daughter_type,
            properties: self.properties,
            data: self.data.clone(),
            lifecycle: Lifecycle::Alive,
            cycle: daughter_cycle,
        }
    }
}
