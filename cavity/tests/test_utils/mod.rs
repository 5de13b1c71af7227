pub use cavity::test_utils::*;
use cavity::{Domain, Vector2};

pub fn init_logger() {
    let _ = env_logger::Builder::from_env("CAVITY_LOG")
        .is_test(true)
        .try_init();
}

/// Compares nodal velocities of two domains on the same grid.
#[allow(dead_code)]
pub fn compare_velocities(solution: &Domain, expected: &Domain, tol: f64) {
    use approx::*;
    assert_eq!(solution.nodes().len(), expected.nodes().len());
    for (node, expected_node) in solution.nodes().iter().zip(expected.nodes().iter()) {
        assert_relative_eq!(node.velocity[0], expected_node.velocity[0], max_relative = tol, epsilon = 1e-12);
        assert_relative_eq!(node.velocity[1], expected_node.velocity[1], max_relative = tol, epsilon = 1e-12);
    }
}

/// Largest nodal speed.
#[allow(dead_code)]
pub fn max_speed(domain: &Domain) -> f64 {
    domain
        .nodes()
        .iter()
        .map(|node| node.velocity.norm())
        .fold(0.0, f64::max)
}

#[allow(dead_code)]
pub fn centroid(domain: &Domain, i: usize, j: usize) -> Vector2 {
    domain.cell(i, j).centroid()
}
