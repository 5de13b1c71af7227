//! Bilinear quadrilateral element over four grid nodes.
//!
//! The element is an axis-aligned rectangle, so the isoparametric map between
//! local coordinates `(s, t) ∈ [-1, 1]²` and global coordinates is affine and
//! its inverse is exact.

use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::particle::Particle;
use crate::{Matrix2, Vector2};

/// Local coordinates of the element vertices in counter-clockwise order:
/// bottom-left, bottom-right, top-right, top-left.
pub const LOCAL_VERTICES: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Slack on the unit square used by point containment tests.
const CONTAINS_TOLERANCE: f64 = 1.0e-10;

/// 2x2 Gauss points (all weights are one).
fn gauss_points() -> [[f64; 2]; 4] {
    let g = 1.0 / 3.0_f64.sqrt();
    [[-g, -g], [g, -g], [g, g], [-g, g]]
}

/// Bilinear shape functions evaluated at local coordinates `(s, t)`.
pub fn shape_functions(s: f64, t: f64) -> [f64; 4] {
    let mut n = [0.0; 4];
    for (a, [sa, ta]) in LOCAL_VERTICES.iter().enumerate() {
        n[a] = 0.25 * (1.0 + sa * s) * (1.0 + ta * t);
    }
    n
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: usize,
    /// Indices of the nodes in counter-clockwise order starting at the bottom-left.
    pub nodes: [usize; 4],
    pub density: f64,
    pub viscosity: f64,
    size: [f64; 2],
    /// Position of the bottom-left vertex.
    origin: Vector2,
    /// Particles currently located inside this cell.
    particles: Vec<usize>,
    /// Gradient `G` of the non-conforming mode `G (x - x_c)` added to the bilinear field.
    enhanced: Option<Matrix2>,
}

impl Cell {
    pub fn new(id: usize, nodes: [usize; 4], origin: Vector2, hx: f64, hy: f64) -> Self {
        Cell {
            id,
            nodes,
            density: 1.0,
            viscosity: 0.0,
            size: [hx, hy],
            origin,
            particles: Vec::new(),
            enhanced: None,
        }
    }

    pub fn set_parameters(&mut self, density: f64, viscosity: f64) {
        self.density = density;
        self.viscosity = viscosity;
    }

    /// Cell size `(hx, hy)`.
    pub fn size(&self) -> [f64; 2] {
        self.size
    }

    pub fn area(&self) -> f64 {
        self.size[0] * self.size[1]
    }

    pub fn centroid(&self) -> Vector2 {
        self.origin + Vector2::new(0.5 * self.size[0], 0.5 * self.size[1])
    }

    /// Maps global coordinates into local coordinates `(s, t)`.
    pub fn to_local(&self, x: &Vector2) -> Vector2 {
        let d = x - self.centroid();
        Vector2::new(2.0 * d[0] / self.size[0], 2.0 * d[1] / self.size[1])
    }

    /// Maps local coordinates `(s, t)` into global coordinates.
    pub fn to_global(&self, st: &Vector2) -> Vector2 {
        self.centroid() + Vector2::new(0.5 * self.size[0] * st[0], 0.5 * self.size[1] * st[1])
    }

    /// Point-in-cell test through the inverse map.
    ///
    /// Points on the cell boundary are considered inside.
    pub fn contains(&self, x: &Vector2) -> bool {
        self.contains_within(x, 1.0 + CONTAINS_TOLERANCE)
    }

    /// Point-in-cell test without slack, so a point strictly inside a neighbouring cell is
    /// never reported as contained.
    pub fn contains_exactly(&self, x: &Vector2) -> bool {
        self.contains_within(x, 1.0)
    }

    fn contains_within(&self, x: &Vector2, bound: f64) -> bool {
        if !(x[0].is_finite() && x[1].is_finite()) {
            return false;
        }
        let st = self.to_local(x);
        st[0].abs() <= bound && st[1].abs() <= bound
    }

    /// Global gradients of the shape functions at local coordinates `(s, t)`.
    pub fn shape_gradients(&self, s: f64, t: f64) -> [Vector2; 4] {
        let [hx, hy] = self.size;
        let mut grad = [Vector2::zeros(); 4];
        for (a, [sa, ta]) in LOCAL_VERTICES.iter().enumerate() {
            grad[a] = Vector2::new(
                sa * (1.0 + ta * t) / (2.0 * hx),
                ta * (1.0 + sa * s) / (2.0 * hy),
            );
        }
        grad
    }

    /*
     * Particle membership
     */

    pub fn particles(&self) -> &[usize] {
        &self.particles
    }

    pub fn add_particle(&mut self, particle: usize) {
        self.particles.push(particle);
    }

    pub fn clear_particles(&mut self) {
        self.particles.clear();
    }

    /*
     * Grid transfers
     */

    /// Lumped mass assigned to each of the four nodes.
    pub fn lumped_nodal_mass(&self) -> f64 {
        0.25 * self.density * self.area()
    }

    /// Accumulates the lumped cell mass onto its nodes.
    pub fn map_mass_to_nodes(&self, nodes: &mut [Node]) {
        let m = self.lumped_nodal_mass();
        for &n in self.nodes.iter() {
            nodes[n].add_mass(m);
        }
    }

    /// Accumulates the lumped cell mass and the momentum carried by the cell particles.
    ///
    /// Each node receives its lumped mass times the shape function weighted average of the
    /// particle velocities in this cell. An empty cell contributes mass only.
    pub fn map_momentum_to_nodes(&self, nodes: &mut [Node], particles: &[Particle]) {
        let m = self.lumped_nodal_mass();
        let mut weights = [0.0; 4];
        let mut weighted_velocity = [Vector2::zeros(); 4];
        for &p in self.particles.iter() {
            let particle = &particles[p];
            let st = self.to_local(&particle.position);
            for (a, n) in shape_functions(st[0], st[1]).iter().enumerate() {
                let w = particle.mass() * n;
                weights[a] += w;
                weighted_velocity[a] += particle.velocity * w;
            }
        }

        for (a, &n) in self.nodes.iter().enumerate() {
            nodes[n].add_mass(m);
            if weights[a] > 0.0 {
                nodes[n].add_momentum(weighted_velocity[a] * (m / weights[a]));
            }
        }
    }

    /// Accumulates viscous (and optionally convective) nodal forces.
    ///
    /// The velocity gradient is taken at the centroid, so the element sees a constant strain
    /// rate. The convective term `-ρ (∇v) v̄` is added only when `add_transient` is set.
    pub fn compute_forces(&self, nodes: &mut [Node], add_transient: bool) {
        let grad_n = self.shape_gradients(0.0, 0.0);
        let l = self.nodal_gradient(nodes, &grad_n, |node| node.velocity);
        let sigma = (l + l.transpose()) * self.viscosity;
        let area = self.area();

        let convective = if add_transient {
            let v_mean = self
                .nodes
                .iter()
                .fold(Vector2::zeros(), |acc, &n| acc + nodes[n].velocity)
                * 0.25;
            l * v_mean * (self.density * 0.25 * area)
        } else {
            Vector2::zeros()
        };

        for (a, &n) in self.nodes.iter().enumerate() {
            nodes[n].add_force(-(sigma * grad_n[a]) * area - convective);
        }
    }

    /// Element matrix `∫ ∇N_a · ∇N_b` of the pressure Poisson equation.
    pub fn stiffness(&self) -> na::Matrix4<f64> {
        let det_j = 0.25 * self.area();
        let mut k = na::Matrix4::zeros();
        for [s, t] in gauss_points() {
            let grad_n = self.shape_gradients(s, t);
            for a in 0..4 {
                for b in a..4 {
                    let v = grad_n[a].dot(&grad_n[b]) * det_j;
                    k[(a, b)] += v;
                    if a != b {
                        k[(b, a)] += v;
                    }
                }
            }
        }
        k
    }

    /// Element load `-(ρ/dt) ∫ N_a ∇·v*` of the pressure Poisson equation.
    pub fn pressure_load(&self, nodes: &[Node], dt: f64) -> na::Vector4<f64> {
        let det_j = 0.25 * self.area();
        let scale = -self.density / dt;
        let mut f = na::Vector4::zeros();
        for [s, t] in gauss_points() {
            let grad_n = self.shape_gradients(s, t);
            let div: f64 = self
                .nodes
                .iter()
                .zip(grad_n.iter())
                .map(|(&n, g)| nodes[n].velocity.dot(g))
                .sum();
            for (a, n) in shape_functions(s, t).iter().enumerate() {
                f[a] += scale * n * div * det_j;
            }
        }
        f
    }

    /*
     * Interpolation
     */

    pub fn velocity_at(&self, nodes: &[Node], x: &Vector2) -> Vector2 {
        let v = self.interpolate(nodes, x, |node| node.velocity);
        match self.enhanced {
            Some(g) => v + g * (x - self.centroid()),
            None => v,
        }
    }

    pub fn velocity_gradient_at(&self, nodes: &[Node], x: &Vector2) -> Matrix2 {
        let st = self.to_local(x);
        let grad_n = self.shape_gradients(st[0], st[1]);
        let l = self.nodal_gradient(nodes, &grad_n, |node| node.velocity);
        match self.enhanced {
            Some(g) => l + g,
            None => l,
        }
    }

    pub fn apparent_acceleration_at(&self, nodes: &[Node], x: &Vector2) -> Vector2 {
        self.interpolate(nodes, x, |node| node.apparent_acceleration)
    }

    pub fn acceleration_gradient_at(&self, nodes: &[Node], x: &Vector2) -> Matrix2 {
        let st = self.to_local(x);
        let grad_n = self.shape_gradients(st[0], st[1]);
        self.nodal_gradient(nodes, &grad_n, |node| node.apparent_acceleration)
    }

    pub fn pressure_at(&self, nodes: &[Node], x: &Vector2) -> f64 {
        let st = self.to_local(x);
        shape_functions(st[0], st[1])
            .iter()
            .zip(self.nodes.iter())
            .map(|(n, &i)| n * nodes[i].pressure)
            .sum()
    }

    /*
     * Enhanced velocity
     */

    /// Computes the non-conforming velocity mode which cancels the cell-average divergence of
    /// the current nodal velocity field.
    pub fn set_enhanced_velocity(&mut self, nodes: &[Node]) {
        let grad_n = self.shape_gradients(0.0, 0.0);
        let l = self.nodal_gradient(nodes, &grad_n, |node| node.velocity);
        self.enhanced = Some(Matrix2::identity() * (-0.5 * l.trace()));
    }

    pub fn clear_enhanced_velocity(&mut self) {
        self.enhanced = None;
    }

    pub fn is_enhanced(&self) -> bool {
        self.enhanced.is_some()
    }

    fn interpolate(&self, nodes: &[Node], x: &Vector2, field: impl Fn(&Node) -> Vector2) -> Vector2 {
        let st = self.to_local(x);
        shape_functions(st[0], st[1])
            .iter()
            .zip(self.nodes.iter())
            .fold(Vector2::zeros(), |acc, (n, &i)| acc + field(&nodes[i]) * *n)
    }

    /// Computes `Σ_a u_a ⊗ ∇N_a` for the nodal vector field `u`.
    fn nodal_gradient(
        &self,
        nodes: &[Node],
        grad_n: &[Vector2; 4],
        field: impl Fn(&Node) -> Vector2,
    ) -> Matrix2 {
        self.nodes
            .iter()
            .zip(grad_n.iter())
            .fold(Matrix2::zeros(), |acc, (&i, g)| {
                acc + field(&nodes[i]) * g.transpose()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    fn unit_cell() -> (Cell, Vec<Node>) {
        let (hx, hy) = (0.5, 0.25);
        let origin = Vector2::new(1.0, 2.0);
        let nodes = LOCAL_VERTICES
            .iter()
            .enumerate()
            .map(|(i, [s, t])| {
                let pos = origin + Vector2::new(0.5 * hx * (1.0 + s), 0.5 * hy * (1.0 + t));
                Node::new(i, [0, 0], pos)
            })
            .collect();
        (Cell::new(0, [0, 1, 2, 3], origin, hx, hy), nodes)
    }

    #[test]
    fn shape_functions_partition_unity() {
        for &(s, t) in &[(0.0, 0.0), (0.3, -0.7), (1.0, 1.0), (-1.0, 0.5)] {
            let sum: f64 = shape_functions(s, t).iter().sum();
            assert_relative_eq!(sum, 1.0);
        }
        let n = shape_functions(1.0, -1.0);
        assert_eq!(n, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn local_global_round_trip() {
        let (cell, nodes) = unit_cell();
        for (node, [s, t]) in nodes.iter().zip(LOCAL_VERTICES.iter()) {
            let x = cell.to_global(&Vector2::new(*s, *t));
            assert_relative_eq!(x, node.position);
            assert_relative_eq!(cell.to_local(&x), Vector2::new(*s, *t));
        }
    }

    #[test]
    fn linear_field_is_reproduced() {
        let (cell, mut nodes) = unit_cell();
        let grad = Matrix2::new(0.3, -1.2, 0.7, 2.0);
        let offset = Vector2::new(0.1, -0.4);
        for node in nodes.iter_mut() {
            node.velocity = grad * node.position + offset;
            node.apparent_acceleration = grad.transpose() * node.position;
        }
        let x = cell.to_global(&Vector2::new(0.25, -0.6));
        assert_relative_eq!(cell.velocity_at(&nodes, &x), grad * x + offset, epsilon = 1e-12);
        assert_relative_eq!(cell.velocity_gradient_at(&nodes, &x), grad, epsilon = 1e-12);
        assert_relative_eq!(
            cell.apparent_acceleration_at(&nodes, &x),
            grad.transpose() * x,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            cell.acceleration_gradient_at(&nodes, &x),
            grad.transpose(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn contains_includes_boundary() {
        let (cell, _) = unit_cell();
        assert!(cell.contains(&Vector2::new(1.0, 2.0)));
        assert!(cell.contains(&Vector2::new(1.5, 2.25)));
        assert!(cell.contains(&Vector2::new(1.2, 2.1)));
        assert!(!cell.contains(&Vector2::new(1.51, 2.1)));
        assert!(!cell.contains(&Vector2::new(f64::NAN, 2.1)));
        assert!(cell.contains_exactly(&Vector2::new(1.5, 2.25)));
        assert!(!cell.contains_exactly(&Vector2::new(1.5 + 1e-12, 2.1)));
        assert!(cell.contains(&Vector2::new(1.5 + 1e-12, 2.1)));
    }

    #[test]
    fn stiffness_is_symmetric_with_constant_null_space() {
        let (cell, _) = unit_cell();
        let k = cell.stiffness();
        assert_relative_eq!(k, k.transpose());
        for a in 0..4 {
            assert!(k[(a, a)] > 0.0);
            assert_relative_eq!(k.row(a).sum(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn uniform_velocity_has_no_load_or_force() {
        let (mut cell, mut nodes) = unit_cell();
        cell.set_parameters(1000.0, 2.0);
        for node in nodes.iter_mut() {
            node.velocity = Vector2::new(1.0, -2.0);
        }
        assert_relative_eq!(cell.pressure_load(&nodes, 0.1), na::Vector4::zeros());
        cell.compute_forces(&mut nodes, true);
        for node in nodes.iter() {
            assert_relative_eq!(node.force, Vector2::zeros());
        }
    }

    #[test]
    fn viscous_forces_are_balanced() {
        let (mut cell, mut nodes) = unit_cell();
        cell.set_parameters(1.0, 0.5);
        nodes[2].velocity = Vector2::new(1.0, 0.0);
        nodes[3].velocity = Vector2::new(1.0, 0.0);
        cell.compute_forces(&mut nodes, false);
        let total = nodes.iter().fold(Vector2::zeros(), |acc, n| acc + n.force);
        assert_relative_eq!(total, Vector2::zeros(), epsilon = 1e-12);
        // Shear drags the bottom nodes along with the moving top.
        assert!(nodes[0].force[0] > 0.0);
        assert!(nodes[2].force[0] < 0.0);
    }

    #[test]
    fn enhanced_mode_cancels_mean_divergence() {
        let (mut cell, mut nodes) = unit_cell();
        let grad = Matrix2::new(1.0, 0.5, 0.0, 3.0);
        for node in nodes.iter_mut() {
            node.velocity = grad * node.position;
        }
        cell.set_enhanced_velocity(&nodes);
        assert!(cell.is_enhanced());
        let l = cell.velocity_gradient_at(&nodes, &cell.centroid());
        assert_relative_eq!(l.trace(), 0.0, epsilon = 1e-12);
        // The mode vanishes at the centroid.
        let c = cell.centroid();
        assert_relative_eq!(cell.velocity_at(&nodes, &c), grad * c, epsilon = 1e-12);
        cell.clear_enhanced_velocity();
        assert_relative_eq!(cell.velocity_gradient_at(&nodes, &c), grad, epsilon = 1e-12);
    }
}
