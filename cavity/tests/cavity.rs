use approx::*;
use rand::prelude::*;

use cavity::linsolve::{DenseSystem, LinearSystem, SparseSystem};
use cavity::*;
pub use test_utils::*;

mod test_utils;

/// A fluid at rest with a lid at rest stays at rest, and so do its particles.
#[test]
fn equilibrium() -> Result<(), Error> {
    init_logger();
    let mut domain = make_cavity(
        4,
        FlowParams {
            velocity: 0.0,
            ..CAVITY_FLOW
        },
    );
    domain.create_particles(2, 2);
    let initial: Vec<Vector2> = domain.particles().iter().map(|p| p.position).collect();

    // Nothing moves, so the time step is unbounded and an analysis takes a single step.
    let steps = domain.run_analysis(1.0)?;
    assert_eq!(steps, 1);
    assert_eq!(domain.time(), 1.0);
    for _ in 0..25 {
        domain.run_single_step(0.2)?;
    }
    assert_relative_eq!(domain.time(), 6.0, epsilon = 1e-12);

    for node in domain.nodes() {
        assert_eq!(node.velocity, Vector2::zeros());
        assert_eq!(node.pressure, 0.0);
    }
    for (p, x) in domain.particles().iter().zip(initial.iter()) {
        assert_eq!(&p.position, x);
        assert_eq!(p.deformation_gradient, Matrix2::identity());
    }
    Ok(())
}

/// Scattering cell contributions onto the nodes does not depend on the order of the cells.
#[test]
fn scatter_order_independence() {
    init_logger();
    let mut domain = make_cavity(4, CAVITY_FLOW);
    domain.create_particles(2, 2);

    let scatter = |order: &[usize]| {
        let mut nodes = domain.nodes().to_vec();
        for node in nodes.iter_mut() {
            node.wipe();
        }
        for &k in order {
            domain.cells()[k].map_momentum_to_nodes(&mut nodes, domain.particles());
        }
        for &k in order {
            domain.cells()[k].compute_forces(&mut nodes, true);
        }
        nodes
    };

    let mut order: Vec<usize> = (0..domain.cells().len()).collect();
    let expected = scatter(&order);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5 {
        order.shuffle(&mut rng);
        let nodes = scatter(&order);
        for (node, exp) in nodes.iter().zip(expected.iter()) {
            assert_relative_eq!(node.mass, exp.mass, max_relative = 1e-12);
            assert_relative_eq!(node.momentum, exp.momentum, max_relative = 1e-12, epsilon = 1e-12);
            assert_relative_eq!(node.force, exp.force, max_relative = 1e-12, epsilon = 1e-9);
        }
    }
}

/// The pinned pressure system is solvable for every grid with at least 2x2 cells, on both
/// sides of the dense/sparse threshold.
#[test]
fn pressure_system_is_solvable() -> Result<(), Error> {
    init_logger();
    for &n in &[2, 3, 6, 10, 12] {
        let mut domain = make_cavity(n, CAVITY_FLOW);
        domain.solve_p(0.01)?;
        let pinned = domain.pinned_pressure_dof();
        for node in domain.nodes() {
            assert!(node.pressure.is_finite());
            let [i, j] = node.grid;
            if domain.grid().dof(i, j) == pinned {
                assert!(node.pressure.abs() < 1e-10);
            }
        }
    }
    Ok(())
}

#[test]
fn dense_and_sparse_pressure_agree() -> Result<(), Error> {
    init_logger();
    let domain = make_cavity(10, CAVITY_FLOW);
    let n = domain.grid().num_nodes();
    assert!(n >= linsolve::DENSE_DOF_THRESHOLD);

    let mut dense = DenseSystem::new(n);
    let mut sparse = SparseSystem::new(n);
    domain.assemble_pressure_system(&mut dense, 0.05);
    domain.assemble_pressure_system(&mut sparse, 0.05);
    let a = dense.solve()?;
    let b = sparse.solve()?;
    for (x, y) in a.iter().zip(b.iter()) {
        assert_relative_eq!(x, y, max_relative = 1e-8, epsilon = 1e-8);
    }
    Ok(())
}

/// 8x8 lid-driven cavity at Re = 1: after one CFL step every prescribed velocity component
/// still has its prescribed value.
#[test]
fn lid_driven_cavity_keeps_boundary_conditions() -> Result<(), Error> {
    init_logger();
    let mut domain = make_cavity(8, CAVITY_FLOW);
    let dt = domain.get_time_step(1.0);
    assert!(dt > 0.0 && dt <= 0.125);
    domain.run_single_step(dt)?;
    assert_relative_eq!(domain.time(), dt);

    for i in 0..=8 {
        let top = domain.node(i, 8);
        let lid = if i == 0 || i == 8 { 0.0 } else { 1.0 };
        assert_eq!(top.velocity, Vector2::new(lid, 0.0));
        assert_eq!(domain.node(i, 0).velocity[1], 0.0);
    }
    for j in 0..=8 {
        assert_eq!(domain.node(0, j).velocity[0], 0.0);
        assert_eq!(domain.node(8, j).velocity[0], 0.0);
    }
    for node in domain.nodes() {
        assert!(node.velocity.iter().all(|v| v.is_finite()));
        assert!(node.pressure.is_finite());
    }
    assert!(max_speed(&domain) >= 1.0);
    Ok(())
}

/// A particle at rest at a cell centroid of a cavity with a still lid stays there
/// undeformed through the full step pipeline.
#[test]
fn still_particle_at_centroid() -> Result<(), Error> {
    init_logger();
    let mut domain = Domain::new(1.0, 1.0, 4, 4)?;
    domain.set_parameters(1.0, 1000.0, 0.0)?;
    domain.set_initial_state()?;
    let center = centroid(&domain, 1, 2);
    let id = domain.add_particle(center)?;
    assert_eq!(domain.particles()[id].velocity, Vector2::zeros());

    for _ in 0..20 {
        domain.run_single_step(0.1)?;
    }
    let p = &domain.particles()[id];
    assert_eq!(p.position, Vector2::new(0.375, 0.625));
    assert_eq!(p.deformation_gradient, Matrix2::identity());
    assert_eq!(p.cell(), Some(domain.grid().cell_index(1, 2)));
    Ok(())
}

/// A particle at the center of a rigid rotation stays where it is while its deformation
/// gradient follows the rotation up to the RK4 error.
#[test]
fn rotation_center_stays_put() -> Result<(), Error> {
    init_logger();
    let mut domain = Domain::new(1.0, 1.0, 4, 4)?;
    let center = centroid(&domain, 1, 2);
    domain.set_analysis(AnalysisControl::particles_only());
    domain.set_motion(Box::new(RigidRotation {
        center,
        translation: Vector2::zeros(),
        rate: 1.0,
    }));
    let id = domain.add_particle(center)?;
    domain.set_state(0.0)?;

    for _ in 0..10 {
        domain.run_single_step(0.05)?;
    }
    let p = &domain.particles()[id];
    assert_relative_eq!(p.position, center, epsilon = 1e-14);
    assert_eq!(p.cell(), Some(domain.grid().cell_index(1, 2)));
    assert_relative_eq!(p.deformation_gradient, motion::rotation(0.5), epsilon = 1e-7);
    Ok(())
}

/// A rigid rotation carries no rate of deformation, so particles see no viscous stress.
#[test]
fn particle_stress_of_rigid_rotation() -> Result<(), Error> {
    init_logger();
    let mut domain = Domain::new(1.0, 1.0, 2, 2)?;
    domain.set_parameters(1.0, 1.0, 1.0)?;
    domain.set_motion(Box::new(RigidRotation::default()));
    let id = domain.add_particle(Vector2::new(0.3, 0.7))?;
    domain.set_state(0.0)?;
    domain.update_particle_stress(0.1)?;

    let p = &domain.particles()[id];
    assert!(p.viscosity > 0.0);
    for (rate, stress) in p.strain_rate.iter().zip(p.stress().iter()) {
        assert!(rate.abs() < 1e-12);
        assert!(stress.abs() < 1e-12);
    }
    Ok(())
}
