#![allow(dead_code)]

use oncosim::{Cell, CellCycleModel, NodePopulation};
use oncosim_common::{CellCycleConfig, MutationState, ProliferativeType, Vec2};
use rand::RngCore;

/// Generator whose every uniform draw is exactly 0.
pub struct ZeroRng;

impl RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(0);
    }
}

pub fn cell(state: MutationState, kind: ProliferativeType) -> Cell {
    Cell::new(state, kind, CellCycleModel::from_config(&CellCycleConfig::default(), 0.0))
}

pub fn population_of(cells: Vec<(Cell, Vec2)>) -> NodePopulation {
    let mut population = NodePopulation::new(1.5, 0.01);
    for (cell, location) in cells {
        population.add_cell(cell, location, 0.5);
    }
    population
}
