use oncosim_common::Vec2;

/// Uniform cell-list index over node locations.
///
/// Rebuilt from scratch whenever the population changes: count nodes per grid
/// cell, prefix-sum the counts into start offsets, then scatter node indices
/// into one sorted buffer. Neighbour queries scan the 3x3 block around a node.
#[derive(Debug, Clone)]
pub struct NeighbourGrid {
    cell_size: f64,
    inv_cell_size: f64, // 0 when the cell size is degenerate
    origin: Vec2,       // Lower-left corner of the last bounding box
    dim_x: usize,
    dim_y: usize,
    /// Grid cell index for each node.
    node_cells: Vec<usize>,
    /// Number of nodes in each grid cell.
    cell_counts: Vec<u32>,
    /// Start index in `cell_node_indices` for each grid cell (prefix sum).
    cell_starts: Vec<u32>,
    /// Node indices sorted by grid cell.
    cell_node_indices: Vec<u32>,
}

impl NeighbourGrid {
    pub fn new(cell_size: f64) -> Self {
        let inv_cell_size = if cell_size > 1e-12 { 1.0 / cell_size } else { 0.0 };
        NeighbourGrid {
            cell_size,
            inv_cell_size,
            origin: Vec2::zero(),
            dim_x: 0,
            dim_y: 0,
            node_cells: Vec::new(),
            cell_counts: Vec::new(),
            cell_starts: Vec::new(),
            cell_node_indices: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn num_grid_cells(&self) -> usize {
        self.dim_x * self.dim_y
    }

    // Grid coordinates of a location, relative to the current origin.
    #[inline(always)]
    fn grid_coords(&self, pos: Vec2) -> (i64, i64) {
        (
            ((pos.x - self.origin.x) * self.inv_cell_size).floor() as i64,
            ((pos.y - self.origin.y) * self.inv_cell_size).floor() as i64,
        )
    }

    /// Rebuilds the index for the given node locations.
    pub fn build(&mut self, locations: &[Vec2]) {
        let num_nodes = locations.len();
        self.node_cells.clear();
        self.cell_node_indices.clear();
        if num_nodes == 0 || self.inv_cell_size == 0.0 {
            self.dim_x = 0;
            self.dim_y = 0;
            self.cell_counts.clear();
            self.cell_starts.clear();
            return;
        }

        // --- 1. Bounding Box and Grid Dimensions ---
        let mut min = locations[0];
        let mut max = locations[0];
        for p in locations {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        self.origin = min;
        self.dim_x = ((max.x - min.x) * self.inv_cell_size).floor() as usize + 1;
        self.dim_y = ((max.y - min.y) * self.inv_cell_size).floor() as usize + 1;
        let num_grid_cells = self.dim_x * self.dim_y;

        // --- 2. Assign Grid Cells and Count ---
        self.cell_counts.clear();
        self.cell_counts.resize(num_grid_cells, 0);
        for p in locations {
            let (gx, gy) = self.grid_coords(*p);
            // Clamp to grid dimensions to handle edge cases
            let gx = (gx.max(0) as usize).min(self.dim_x - 1);
            let gy = (gy.max(0) as usize).min(self.dim_y - 1);
            let grid_idx = gy * self.dim_x + gx;
            self.node_cells.push(grid_idx);
            self.cell_counts[grid_idx] += 1;
        }

        // --- 3. Prefix Sum ---
        self.cell_starts.clear();
        self.cell_starts.resize(num_grid_cells, 0);
        let mut total = 0u32;
        for (start, count) in self.cell_starts.iter_mut().zip(&self.cell_counts) {
            *start = total;
            total += count;
        }
        if total as usize != num_nodes {
            log::error!("Grid build prefix sum total ({}) does not match node count ({}).", total, num_nodes);
        }

        // --- 4. Scatter Node Indices into the Sorted Buffer ---
        self.cell_node_indices.resize(num_nodes, 0);
        let mut write_offsets = vec![0u32; num_grid_cells];
        for (node_idx, &grid_idx) in self.node_cells.iter().enumerate() {
            let write_idx = (self.cell_starts[grid_idx] + write_offsets[grid_idx]) as usize;
            write_offsets[grid_idx] += 1;
            self.cell_node_indices[write_idx] = node_idx as u32;
        }
    }

    /// Calls `f` for every node within `max_dist` of `pos`, other than `node_idx`.
    /// Scanning stops as soon as `f` returns `false`.
    pub fn for_each_neighbour<F>(&self, node_idx: usize, pos: Vec2, max_dist: f64, locations: &[Vec2], mut f: F)
    where
        F: FnMut(usize) -> bool,
    {
        if self.num_grid_cells() == 0 {
            return;
        }
        let max_dist_sq = max_dist * max_dist;
        // Query radius may exceed the cell size; widen the scanned block accordingly.
        let reach = (max_dist * self.inv_cell_size).ceil().max(1.0) as i64;
        let (center_x, center_y) = self.grid_coords(pos);

        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let check_x = center_x + dx;
                let check_y = center_y + dy;
                if check_x < 0 || check_y < 0 || check_x >= self.dim_x as i64 || check_y >= self.dim_y as i64 {
                    continue;
                }
                let grid_idx = check_y as usize * self.dim_x + check_x as usize;
                // Nodes in this grid cell
                let start = self.cell_starts[grid_idx] as usize;
                let end = start + self.cell_counts[grid_idx] as usize;

                for &neighbour in &self.cell_node_indices[start..end] {
                    let neighbour = neighbour as usize;
                    if neighbour == node_idx {
                        continue;
                    }
                    match locations.get(neighbour) {
                        Some(neighbour_pos) => {
                            if pos.distance_squared(*neighbour_pos) < max_dist_sq && !f(neighbour) {
                                return;
                            }
                        }
                        None => {
                            log::error!(
                                "Neighbour index {} out of bounds during neighbour search for node {}.",
                                neighbour,
                                node_idx
                            );
                        }
                    }
                }
            }
        }
    }

    /// Sorted indices of all nodes within `max_dist` of node `node_idx`.
    pub fn neighbours_of(&self, node_idx: usize, max_dist: f64, locations: &[Vec2]) -> Vec<usize> {
        let mut found = Vec::new();
        if let Some(&pos) = locations.get(node_idx) {
            self.for_each_neighbour(node_idx, pos, max_dist, locations, |n| {
                found.push(n);
                true
            });
        }
        found.sort_unstable(); // Grid order is not index order
        found
    }

    /// Every unordered pair `(a, b)` with `a < b` closer than `max_dist`.
    pub fn pairs_within(&self, max_dist: f64, locations: &[Vec2]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (a, &pos) in locations.iter().enumerate() {
            self.for_each_neighbour(a, pos, max_dist, locations, |b| {
                if a < b {
                    pairs.push((a, b));
                }
                true
            });
        }
        pairs.sort_unstable();
        pairs
    }
}
