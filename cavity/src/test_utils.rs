use crate::motion::RigidRotation;
use crate::{AnalysisControl, Domain, FlowParams, LengthScale, Vector2};

/*
 * Setup code
 */

pub const CAVITY_FLOW: FlowParams = FlowParams {
    reynolds: 1.0,
    density: 1000.0,
    velocity: 1.0,
    length_scale: LengthScale::Cell,
};

/// Unit square cavity with `n × n` cells in its initial state.
pub fn make_cavity(n: usize, flow: FlowParams) -> Domain {
    let mut domain = Domain::new(1.0, 1.0, n, n).unwrap();
    domain.set_flow_parameters(flow).unwrap();
    domain.set_initial_state().unwrap();
    domain
}

/// Unit square with `n × n` cells moving particles through a prescribed rigid rotation.
pub fn make_rigid_rotation(n: usize, particles: &[[f64; 2]]) -> Domain {
    let mut domain = Domain::new(1.0, 1.0, n, n).unwrap();
    domain.set_analysis(AnalysisControl::particles_only());
    domain.set_motion(Box::new(RigidRotation::default()));
    for &p in particles {
        domain.add_particle(Vector2::from(p)).unwrap();
    }
    domain.set_state(0.0).unwrap();
    domain
}
