use crate::cell::Cell;
use crate::grid::NeighbourGrid;
use oncosim_common::{MutationState, Vec2};

/// The host-owned population as seen by forces, killers, modifiers and PDEs.
///
/// Cells and nodes share one location index. Components borrow the population
/// for the duration of a single callback and never keep indices across steps.
pub trait CellPopulation {
    /// Refreshes neighbour information after locations changed.
    fn update(&mut self);
    fn num_cells(&self) -> usize;
    fn cell(&self, index: usize) -> &Cell;
    fn cell_mut(&mut self, index: usize) -> &mut Cell;
    fn location(&self, index: usize) -> Vec2;
    fn set_location(&mut self, index: usize, location: Vec2);
    fn radius(&self, index: usize) -> f64;
    fn add_applied_force(&mut self, index: usize, force: Vec2);
    /// Neighbouring location indices in ascending order.
    fn neighbouring_indices(&self, index: usize) -> Vec<usize>;
    /// Node pairs currently within interaction range.
    fn node_pairs(&self) -> Vec<(usize, usize)>;
    /// Current simulation time (hours).
    fn time(&self) -> f64;
    /// Step size (hours).
    fn dt(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub location: Vec2,
    pub radius: f64,
    pub applied_force: Vec2, // Accumulated this step, cleared by `integrate`
}

impl Node {
    pub fn new(location: Vec2, radius: f64) -> Self {
        Node { location, radius, applied_force: Vec2::zero() }
    }
}

/// Reference node-based population: one node per cell, neighbours within a
/// fixed interaction radius.
#[derive(Debug)]
pub struct NodePopulation {
    // --- Per-cell data, indexed by location index ---
    cells: Vec<Cell>,
    nodes: Vec<Node>,
    // --- Neighbour search ---
    grid: NeighbourGrid,
    locations: Vec<Vec2>, // Snapshot of node locations taken by `update`
    interaction_radius: f64,
    // --- Clock ---
    time: f64,      // Hours
    dt: f64,        // Hours per step
    time_step: u32, // Completed steps
}

impl NodePopulation {
    pub fn new(interaction_radius: f64, dt: f64) -> Self {
        NodePopulation {
            cells: Vec::new(),
            nodes: Vec::new(),
            grid: NeighbourGrid::new(interaction_radius),
            locations: Vec::new(),
            interaction_radius,
            time: 0.0,
            dt,
            time_step: 0,
        }
    }

    /// Adds a cell with its node and returns the new location index.
    /// Neighbour data is stale until the next `update`.
    pub fn add_cell(&mut self, cell: Cell, location: Vec2, radius: f64) -> usize {
        self.cells.push(cell);
        self.nodes.push(Node::new(location, radius));
        self.cells.len() - 1
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn time_step(&self) -> u32 {
        self.time_step
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn advance_time(&mut self) {
        self.time_step += 1;
        self.time = self.time_step as f64 * self.dt;
    }

    /// Live cells of the given mutation state.
    pub fn count(&self, state: MutationState) -> usize {
        self.cells.iter().filter(|c| !c.is_dead() && c.is(state)).count()
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_dead()).count()
    }

    pub fn clear_forces(&mut self) {
        for node in &mut self.nodes {
            node.applied_force = Vec2::zero();
        }
    }

    /// Overdamped position update `x += dt * F / damping`, then clears forces.
    pub fn integrate(&mut self, damping: f64) {
        let factor = self.dt / damping;
        for node in &mut self.nodes {
            node.location += node.applied_force * factor;
            node.applied_force = Vec2::zero();
        }
    }

    /// Removes every cell marked for death; location indices are compacted.
    pub fn remove_dead_cells(&mut self) -> usize {
        let before = self.cells.len();
        // Filter nodes first, while the cell flags still line up with them
        let mut keep = self.cells.iter().map(|c| !c.is_dead());
        self.nodes.retain(|_| keep.next().unwrap_or(false));
        self.cells.retain(|c| !c.is_dead());
        let removed = before - self.cells.len();
        if removed > 0 {
            log::debug!("Removed {} dead cells, {} remain.", removed, self.cells.len());
        }
        removed
    }
}

impl CellPopulation for NodePopulation {
    // --- Neighbour Refresh ---
    fn update(&mut self) {
        self.locations.clear();
        self.locations.extend(self.nodes.iter().map(|n| n.location));
        self.grid.build(&self.locations);
    }

    // --- Cell and Node Access ---
    fn num_cells(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    fn cell_mut(&mut self, index: usize) -> &mut Cell {
        &mut self.cells[index]
    }

    fn location(&self, index: usize) -> Vec2 {
        self.nodes[index].location
    }

    fn set_location(&mut self, index: usize, location: Vec2) {
        self.nodes[index].location = location;
    }

    fn radius(&self, index: usize) -> f64 {
        self.nodes[index].radius
    }

    fn add_applied_force(&mut self, index: usize, force: Vec2) {
        self.nodes[index].applied_force += force;
    }

    // --- Neighbour Queries (against the last `update`) ---
    fn neighbouring_indices(&self, index: usize) -> Vec<usize> {
        self.grid.neighbours_of(index, self.interaction_radius, &self.locations)
    }

    fn node_pairs(&self) -> Vec<(usize, usize)> {
        self.grid.pairs_within(self.interaction_radius, &self.locations)
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn dt(&self) -> f64 {
        self.dt
    }
}
