use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgEnum, Parser, Subcommand};
use clap_verbosity_flag::Verbosity;

use cavity::convergence::{ConvergenceStudy, FieldMode};
use cavity::motion::MotionKind;
use cavity::scene::SceneConfig;
use cavity::{BlendedRotation, Observer, RigidRotation, Scheme, Snapshot};

const ABOUT: &str = "
Lid-driven cavity flow on a uniform grid with particles tracking the deformation gradient.";

#[derive(Parser)]
#[clap(author, about = ABOUT, name = "cavity")]
struct Opt {
    #[clap(flatten)]
    verbose: Verbosity,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scene described by a configuration file.
    Run {
        /// Path to the scene configuration file in `ron` format.
        #[clap(name = "CONFIG", parse(from_os_str))]
        config: PathBuf,

        /// Directory receiving one snapshot per frame, `frame_0001.ron` and so on.
        ///
        /// If the scene requests output for every step, step snapshots are written to the
        /// same directory as `step_00001.ron` and so on.
        #[clap(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
    /// Write a default lid-driven cavity scene configuration.
    Init {
        /// Path of the configuration file to create.
        #[clap(name = "CONFIG", parse(from_os_str))]
        config: PathBuf,

        /// Number of cells along each side.
        #[clap(short, long, default_value = "8")]
        cells: usize,

        /// Reynolds number.
        #[clap(short, long, default_value = "1")]
        reynolds: f64,
    },
    /// Measure the observed order of accuracy of a particle update scheme.
    Convergence {
        #[clap(short, long, arg_enum, default_value = "rk4")]
        scheme: SchemeArg,

        #[clap(short, long, arg_enum, default_value = "rigid")]
        motion: MotionArg,

        /// Sample the velocity from a grid with this many cells per side instead of the
        /// motion itself.
        #[clap(short, long)]
        grid: Option<usize>,

        /// Measure errors at this time instead of after a single step.
        #[clap(short, long)]
        end_time: Option<f64>,

        #[clap(long, default_value = "0.1")]
        dt: f64,

        #[clap(short, long, default_value = "4")]
        refinements: usize,
    },
}

#[derive(ArgEnum, Copy, Clone, Debug)]
enum SchemeArg {
    Euler,
    Midpoint,
    Heun,
    Rk4,
}

impl From<SchemeArg> for Scheme {
    fn from(arg: SchemeArg) -> Scheme {
        match arg {
            SchemeArg::Euler => Scheme::ExplicitEuler,
            SchemeArg::Midpoint => Scheme::MidPoint,
            SchemeArg::Heun => Scheme::Heun,
            SchemeArg::Rk4 => Scheme::RungeKutta4,
        }
    }
}

#[derive(ArgEnum, Copy, Clone, Debug)]
enum MotionArg {
    Rigid,
    Blended,
}

impl From<MotionArg> for MotionKind {
    fn from(arg: MotionArg) -> MotionKind {
        match arg {
            MotionArg::Rigid => MotionKind::Rigid(RigidRotation::default()),
            MotionArg::Blended => MotionKind::Blended(BlendedRotation::default()),
        }
    }
}

/// Writes a snapshot after every step.
struct StepWriter {
    dir: PathBuf,
    step: usize,
}

impl Observer for StepWriter {
    fn persist(&mut self, snapshot: &Snapshot) -> Result<(), cavity::Error> {
        self.step += 1;
        let path = self.dir.join(format!("step_{:05}.ron", self.step));
        snapshot
            .save_as_ron(&path)
            .map_err(|err| cavity::Error::Observer {
                description: format!("failed to write {}: {}", path.display(), err),
            })
    }
}

pub fn main() {
    if let Err(err) = try_main() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

pub fn try_main() -> Result<()> {
    let opt = Opt::parse();

    let mut builder = env_logger::Builder::from_env("CAVITY_LOG");
    if std::env::var_os("CAVITY_LOG").is_none() {
        builder.filter_level(opt.verbose.log_level_filter());
    }
    let _ = builder.try_init();

    match opt.command {
        Command::Run { config, output } => run(&config, output.as_deref()),
        Command::Init {
            config,
            cells,
            reynolds,
        } => {
            let scene = SceneConfig::cavity(cells, reynolds, 1000.0, 1.0);
            scene.save_as_ron(&config)?;
            log::info!("Wrote {}", config.display());
            Ok(())
        }
        Command::Convergence {
            scheme,
            motion,
            grid,
            end_time,
            dt,
            refinements,
        } => {
            let study = ConvergenceStudy {
                mode: match grid {
                    Some(n) => FieldMode::Grid { n_cells: [n, n] },
                    None => FieldMode::Analytical,
                },
                end_time,
                initial_dt: dt,
                refinements,
                ..ConvergenceStudy::new(scheme.into(), motion.into())
            };
            let report = study.run()?;
            println!("{}", report);
            Ok(())
        }
    }
}

fn run(config_path: &Path, output: Option<&Path>) -> Result<()> {
    let config_ext = if let Some(ext) = config_path.extension().and_then(|x| x.to_str()) {
        ext
    } else {
        anyhow::bail!("Missing file extension in config path: {}", config_path.display())
    };

    let config = match config_ext {
        "ron" => SceneConfig::load_from_ron(config_path)?,
        _ => anyhow::bail!("Unsupported config extension: '.{}'", config_ext),
    };

    if let Some(dir) = output {
        std::fs::create_dir_all(dir)?;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))?;
    }

    let progress = indicatif::ProgressBar::new(u64::from(config.frames.max(1)));
    progress.set_style(
        indicatif::ProgressStyle::with_template("{bar:40} {pos}/{len} frames [{elapsed_precise}] {msg}")?,
    );

    let mut observer = StepWriter {
        dir: output.map(Path::to_path_buf).unwrap_or_default(),
        step: 0,
    };
    if config.control.write_output && output.is_none() {
        log::warn!("Step output requested without an output directory; writing to the working directory");
    }

    let mut write_error = None;
    let domain = config.run_with(&mut observer, |frame, domain| {
        progress.set_message(format!("t = {:.4}", domain.time()));
        progress.inc(1);
        if let Some(dir) = output {
            let path = dir.join(format!("frame_{:04}.ron", frame + 1));
            if let Err(err) = domain.snapshot().save_as_ron(&path) {
                write_error = Some((path, err));
                return false;
            }
        }
        !interrupted.load(Ordering::SeqCst)
    })?;
    progress.finish();

    if let Some((path, err)) = write_error {
        anyhow::bail!("Failed to write {}: {}", path.display(), err);
    }
    if interrupted.load(Ordering::SeqCst) {
        log::warn!("Interrupted at t = {}", domain.time());
    }
    log::info!("{}", domain);
    Ok(())
}
