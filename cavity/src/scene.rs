//! This module describes a convenient scene struct describing a simulatable configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Domain, Observer, Snapshot};
use crate::integrator::Scheme;
use crate::motion::MotionKind;
use crate::params::{AnalysisControl, FlowParams, GridParams};
use crate::Vector2;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("IO Error")]
    IO(#[from] std::io::Error),
    #[error("Serialization error")]
    Serialize,
    #[error("Solver error")]
    Solver(#[from] crate::Error),
}

/// Initial placement of particles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParticleSeeding {
    None,
    /// A regular `per_cell[0] × per_cell[1]` pattern in every cell.
    AllCells { per_cell: [usize; 2] },
    /// A regular pattern in the single cell with grid coordinates `cell`.
    SingleCell { cell: [usize; 2], per_cell: [usize; 2] },
    /// Individual particles at the given positions.
    Points(Vec<[f64; 2]>),
}

impl Default for ParticleSeeding {
    fn default() -> Self {
        ParticleSeeding::None
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub grid: GridParams,
    pub flow: FlowParams,
    pub control: AnalysisControl,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default)]
    pub particles: ParticleSeeding,
    /// When set, the nodal field is prescribed by this motion at the start of the run
    /// instead of being initialized from the lid.
    #[serde(default)]
    pub motion: Option<MotionKind>,
    pub end_time: f64,
    /// Number of equal intervals `end_time` is split into. Each interval is subdivided as
    /// needed by [`Domain::run_analysis`].
    pub frames: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            grid: GridParams::default(),
            flow: FlowParams::default(),
            control: AnalysisControl::default(),
            scheme: Scheme::default(),
            particles: ParticleSeeding::default(),
            motion: None,
            end_time: 1.0,
            frames: 1,
        }
    }
}

impl SceneConfig {
    /// Lid-driven cavity on an `n × n` unit square.
    pub fn cavity(n: usize, reynolds: f64, density: f64, velocity: f64) -> Self {
        SceneConfig {
            grid: GridParams {
                width: 1.0,
                height: 1.0,
                n_cells_x: n,
                n_cells_y: n,
            },
            flow: FlowParams {
                reynolds,
                density,
                velocity,
                ..FlowParams::default()
            },
            ..SceneConfig::default()
        }
    }

    /// Builds the domain in its initial state.
    pub fn build_domain(&self) -> Result<Domain, SceneError> {
        let mut domain = Domain::from_params(&self.grid)?;
        domain.set_flow_parameters(self.flow)?;
        domain.set_analysis(self.control);
        domain.set_scheme(self.scheme);

        match self.motion {
            Some(motion) => {
                domain.set_motion(motion.build());
                domain.set_state(0.0)?;
            }
            None => domain.set_initial_state()?,
        }

        match &self.particles {
            ParticleSeeding::None => {}
            ParticleSeeding::AllCells { per_cell: [n, m] } => domain.create_particles(*n, *m),
            ParticleSeeding::SingleCell {
                cell: [i, j],
                per_cell: [n, m],
            } => domain.create_particles_in_cell(*i, *j, *n, *m)?,
            ParticleSeeding::Points(points) => {
                for &[x, y] in points.iter() {
                    domain.add_particle(Vector2::new(x, y))?;
                }
            }
        }
        Ok(domain)
    }

    /// Saves this scene configuration to the given path interpreted as a RON file.
    pub fn save_as_ron(&self, path: impl AsRef<std::path::Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        std::fs::File::create(path)
            .map_err(SceneError::from)
            .and_then(|f| self.write_as_ron(f))
    }

    /// Writes this scene configuration in RON format.
    pub fn write_as_ron(&self, writer: impl std::io::Write) -> Result<(), SceneError> {
        ron::ser::to_writer_pretty(writer, self, ron::ser::PrettyConfig::new())
            .map_err(|_| SceneError::Serialize)
    }

    /// Loads the scene from a RON file.
    pub fn load_from_ron(path: impl AsRef<std::path::Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        std::fs::File::open(path)
            .map_err(SceneError::from)
            .and_then(|f| ron::de::from_reader(f).map_err(|_| SceneError::Serialize))
    }

    /// Saves this scene configuration to the given path interpreted as a binary file using `bincode`.
    #[cfg(feature = "bincode")]
    pub fn save_as_bin(&self, path: impl AsRef<std::path::Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        std::fs::File::create(path)
            .map_err(SceneError::from)
            .and_then(|f| bincode::serialize_into(f, self).map_err(|_| SceneError::Serialize))
    }

    /// Loads the scene from a `bincode` binary file.
    #[cfg(feature = "bincode")]
    pub fn load_from_bin(path: impl AsRef<std::path::Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        std::fs::File::open(path)
            .map_err(SceneError::from)
            .and_then(|f| bincode::deserialize_from(f).map_err(|_| SceneError::Serialize))
    }

    /// Runs a simulation on this scene.
    pub fn run(&self) -> Result<Domain, SceneError> {
        self.run_with(&mut (), |_, _| true)
    }

    /// Runs a simulation on this scene, calling `callback` with the frame index after every
    /// frame.
    ///
    /// If callback returns `false`, the simulation is interrupted.
    pub fn run_with(
        &self,
        observer: &mut dyn Observer,
        mut callback: impl FnMut(u32, &Domain) -> bool,
    ) -> Result<Domain, SceneError> {
        let mut domain = self.build_domain()?;
        let frames = self.frames.max(1);
        let frame_time = self.end_time / frames as f64;
        for frame in 0..frames {
            let target = frame_time * (frame + 1) as f64;
            let steps = domain.run_analysis_with(target, observer)?;
            log::debug!("Frame {} reached t = {} in {} steps", frame, domain.time(), steps);
            if !callback(frame, &domain) {
                break;
            }
        }
        Ok(domain)
    }
}

impl Snapshot {
    /// Saves this snapshot to the given path interpreted as a RON file.
    pub fn save_as_ron(&self, path: impl AsRef<std::path::Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        std::fs::File::create(path).map_err(SceneError::from).and_then(|f| {
            ron::ser::to_writer_pretty(f, self, ron::ser::PrettyConfig::new())
                .map_err(|_| SceneError::Serialize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::RigidRotation;

    #[test]
    fn ron_round_trip() {
        let config = SceneConfig {
            particles: ParticleSeeding::Points(vec![[0.25, 0.75], [0.6, 0.5]]),
            motion: Some(MotionKind::Rigid(RigidRotation::default())),
            scheme: Scheme::Heun,
            ..SceneConfig::cavity(4, 100.0, 1000.0, 1.0)
        };
        let mut buf = Vec::new();
        config.write_as_ron(&mut buf).unwrap();
        let loaded: SceneConfig = ron::de::from_bytes(&buf).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn single_cell_seeding_is_checked() {
        let config = SceneConfig {
            particles: ParticleSeeding::SingleCell {
                cell: [2, 0],
                per_cell: [1, 1],
            },
            ..SceneConfig::default()
        };
        assert!(matches!(config.build_domain(), Err(SceneError::Solver(_))));
    }

    #[test]
    fn interrupted_run() {
        let config = SceneConfig {
            frames: 4,
            end_time: 0.4,
            ..SceneConfig::cavity(2, 1.0, 1.0, 1.0)
        };
        let mut frames = 0;
        let domain = config
            .run_with(&mut (), |frame, _| {
                frames += 1;
                frame < 1
            })
            .unwrap();
        assert_eq!(frames, 2);
        assert!((domain.time() - 0.2).abs() < 1e-12);
    }
}
