use approx::*;

use cavity::convergence::*;
use cavity::motion::MotionKind;
use cavity::*;
pub use test_utils::*;

mod test_utils;

fn global_study(scheme: Scheme, motion: MotionKind, mode: FieldMode) -> ConvergenceReport {
    let study = ConvergenceStudy {
        mode,
        end_time: Some(0.5),
        initial_dt: 0.1,
        ratio: 2.0,
        refinements: 4,
        ..ConvergenceStudy::new(scheme, motion)
    };
    study.run().unwrap()
}

fn assert_ratios(ratios: &[f64], expected: f64, tol: f64) {
    for &r in ratios {
        assert!((r - expected).abs() < tol, "ratio {} differs from {}", r, expected);
    }
}

/// Halving the step of RK4 reduces the error at a fixed time by a factor of 16.
#[test]
fn rk4_rigid_rotation() {
    init_logger();
    let report = global_study(
        Scheme::RungeKutta4,
        MotionKind::Rigid(RigidRotation::default()),
        FieldMode::Analytical,
    );
    log::info!("{}", report);
    assert_ratios(&report.deformation_ratios(), 16.0, 1.0);
    assert_ratios(&report.position_ratios(), 16.0, 1.0);
    assert_relative_eq!(report.deformation_slope(), 4.0, epsilon = 0.1);
}

/// The grid reproduces the rigid rotation exactly, so integrating through the grid gives the
/// same errors as integrating through the motion itself.
#[test]
fn grid_matches_analytical_field() {
    init_logger();
    let motion = MotionKind::Rigid(RigidRotation::default());
    let analytical = global_study(Scheme::RungeKutta4, motion, FieldMode::Analytical);
    let grid = global_study(Scheme::RungeKutta4, motion, FieldMode::Grid { n_cells: [4, 4] });
    for (a, g) in analytical.samples.iter().zip(grid.samples.iter()) {
        assert_relative_eq!(a.dt, g.dt);
        assert_relative_eq!(a.deformation_error, g.deformation_error, max_relative = 1e-4);
        assert_relative_eq!(a.position_error, g.position_error, max_relative = 1e-4);
    }
}

#[test]
fn lower_order_schemes() {
    init_logger();
    let motion = MotionKind::Rigid(RigidRotation::default());
    for &(scheme, order) in &[
        (Scheme::ExplicitEuler, 1.0),
        (Scheme::MidPoint, 2.0),
        (Scheme::Heun, 2.0),
    ] {
        let report = global_study(scheme, motion, FieldMode::Analytical);
        log::info!("{}", report);
        assert_eq!(scheme.order() as f64, order);
        assert_relative_eq!(report.deformation_slope(), order, epsilon = 0.1);
        assert_relative_eq!(report.position_slope(), order, epsilon = 0.1);
    }
}

/// Single step errors are one order higher than the global ones.
#[test]
fn local_errors() {
    init_logger();
    let motion = MotionKind::Rigid(RigidRotation::default());
    for &scheme in &[Scheme::ExplicitEuler, Scheme::Heun, Scheme::RungeKutta4] {
        let report = ConvergenceStudy::new(scheme, motion).run().unwrap();
        let expected = scheme.order() as f64 + 1.0;
        assert_relative_eq!(report.deformation_slope(), expected, epsilon = 0.1);
    }
}

/// The blended rotation stretches material, so the deformation gradient is not a rotation,
/// yet RK4 keeps its order.
#[test]
fn rk4_blended_rotation() {
    init_logger();
    let motion = MotionKind::Blended(BlendedRotation::new(
        0.75,
        [std::f64::consts::PI, 0.5],
        [Vector2::new(0.5, 0.5), Vector2::new(0.2, 0.9)],
    ));
    let report = global_study(Scheme::RungeKutta4, motion, FieldMode::Analytical);
    log::info!("{}", report);
    assert_relative_eq!(report.deformation_slope(), 4.0, epsilon = 0.15);
    assert_relative_eq!(report.position_slope(), 4.0, epsilon = 0.15);
}
