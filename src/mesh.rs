use anyhow::Result;
use oncosim_common::Vec2;

/// Coarse mesh queries needed to average cell counts per element.
pub trait CoarseMesh {
    fn num_elements(&self) -> usize;

    /// Index of an element containing `point`, or `None` outside the mesh.
    fn containing_element(&self, point: Vec2) -> Option<usize>;

    fn jacobian_determinant(&self, element: usize) -> f64;

    /// Area of a triangular element.
    fn element_volume(&self, element: usize) -> f64 {
        self.jacobian_determinant(element).abs() / 2.0
    }
}

// Points on an element edge count as inside.
const BARYCENTRIC_TOLERANCE: f64 = 1e-10;

/// Unstructured triangle mesh with linear point location.
#[derive(Debug, Clone)]
pub struct TriangularMesh {
    nodes: Vec<Vec2>,
    elements: Vec<[usize; 3]>,
}

fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

impl TriangularMesh {
    pub fn new(nodes: Vec<Vec2>, elements: Vec<[usize; 3]>) -> Result<Self> {
        for (e, element) in elements.iter().enumerate() {
            if let Some(&bad) = element.iter().find(|&&n| n >= nodes.len()) {
                anyhow::bail!("Element {} references node {} but the mesh has {} nodes.", e, bad, nodes.len());
            }
        }
        let mesh = TriangularMesh { nodes, elements };
        for e in 0..mesh.elements.len() {
            if mesh.jacobian_determinant(e).abs() < 1e-14 {
                anyhow::bail!("Element {} is degenerate.", e);
            }
        }
        Ok(mesh)
    }

    /// Rectangle covered by squares of side `spacing` (rounded up to whole
    /// squares), each split into two triangles.
    pub fn rectangle(lower_left: Vec2, width: f64, height: f64, spacing: f64) -> Result<Self> {
        if width <= 0.0 || height <= 0.0 || spacing <= 0.0 {
            anyhow::bail!(
                "Rectangle mesh needs positive width, height and spacing (got {}, {}, {}).",
                width,
                height,
                spacing
            );
        }
        let nx = (width / spacing).ceil() as usize;
        let ny = (height / spacing).ceil() as usize;
        let dx = width / nx as f64;
        let dy = height / ny as f64;

        let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                nodes.push(Vec2::new(lower_left.x + i as f64 * dx, lower_left.y + j as f64 * dy));
            }
        }
        let node = |i: usize, j: usize| j * (nx + 1) + i;
        let mut elements = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                elements.push([node(i, j), node(i + 1, j), node(i + 1, j + 1)]);
                elements.push([node(i, j), node(i + 1, j + 1), node(i, j + 1)]);
            }
        }
        Self::new(nodes, elements)
    }

    pub fn nodes(&self) -> &[Vec2] {
        &self.nodes
    }

    pub fn elements(&self) -> &[[usize; 3]] {
        &self.elements
    }

    fn corners(&self, element: usize) -> [Vec2; 3] {
        let [a, b, c] = self.elements[element];
        [self.nodes[a], self.nodes[b], self.nodes[c]]
    }

    /// Barycentric coordinates of `point` relative to `element`.
    pub fn barycentric(&self, element: usize, point: Vec2) -> [f64; 3] {
        let [a, b, c] = self.corners(element);
        let det = cross(b - a, c - a);
        let l1 = cross(point - a, c - a) / det;
        let l2 = cross(b - a, point - a) / det;
        [1.0 - l1 - l2, l1, l2]
    }

    pub fn centroid(&self, element: usize) -> Vec2 {
        let [a, b, c] = self.corners(element);
        (a + b + c) / 3.0
    }
}

impl CoarseMesh for TriangularMesh {
    fn num_elements(&self) -> usize {
        self.elements.len()
    }

    fn containing_element(&self, point: Vec2) -> Option<usize> {
        (0..self.elements.len())
            .find(|&e| self.barycentric(e, point).iter().all(|&w| w >= -BARYCENTRIC_TOLERANCE))
    }

    fn jacobian_determinant(&self, element: usize) -> f64 {
        let [a, b, c] = self.corners(element);
        cross(b - a, c - a)
    }
}
