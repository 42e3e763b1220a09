//! Navigation replay executable entry point.
//!
//! Drives the navigation core from a run recorded by the simulator.
//!
//! # Architecture
//!
//!     - Initialise session, logging and parameters
//!     - Load the dataset
//!     - For each recorded row:
//!         - Write the row's telemetry into the vehicle state
//!         - Load the row's frame
//!         - Tick the navigation core
//!         - Archive the tick
//!         - Advance the simulated clock by one cycle
//!     - Save the world map overlay and summary

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use nav_lib::{
    decision::DecisionParams,
    params::NavExecParams,
    per::PerParams,
    replay::ReplayDataset,
    tick::{NavCore, TickRecord},
    vehicle_state::VehicleState,
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    params::LoadError,
    session::Session,
    time::{Clock, SimClock},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Replay a recorded simulator run through the navigation core.
#[derive(Debug, StructOpt)]
#[structopt(name = "nav_exec")]
struct Opt {
    /// Dataset directory containing `robot_log.csv` and `IMG/`
    #[structopt(parse(from_os_str))]
    dataset: PathBuf,

    /// Directory to create the session in, defaults to `sessions` under the software root
    #[structopt(long, parse(from_os_str))]
    sessions_dir: Option<PathBuf>,

    /// Stop after this many frames
    #[structopt(long)]
    max_frames: Option<usize>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = match opt.sessions_dir {
        Some(ref dir) => Session::new_in("nav_exec", dir),
        None => Session::new("nav_exec", "sessions"),
    }
    .wrap_err("Failed to create the session")?;

    let exec_params: NavExecParams =
        load_or_default("nav_exec.toml").wrap_err("Could not load exec params")?;

    let log_level: LevelFilter = exec_params
        .log_level
        .parse()
        .map_err(|_| eyre!("Invalid log level {:?}", exec_params.log_level))?;

    logger_init(log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Rover Navigation Replay Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let per_params: PerParams =
        load_or_default("per.toml").wrap_err("Could not load perception params")?;
    let decision_params: DecisionParams =
        load_or_default("decision.toml").wrap_err("Could not load decision params")?;

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    let dataset = ReplayDataset::open(&opt.dataset).wrap_err("Failed to load the dataset")?;

    let mut core = NavCore::new(per_params, decision_params)
        .wrap_err("Failed to initialise the navigation core")?;

    let mut archiver =
        Archiver::from_path(&session, "ticks.csv").wrap_err("Failed to create the archive")?;

    let clock = SimClock::new(0.0);
    let mut state = VehicleState::new();

    let num_frames = opt
        .max_frames
        .map(|m| m.min(dataset.len()))
        .unwrap_or_else(|| dataset.len());

    info!("Replaying {} of {} frames\n", num_frames, dataset.len());

    // ---- MAIN LOOP ----

    for (tick, row) in dataset.rows().iter().take(num_frames).enumerate() {
        row.apply_to(&mut state);

        let frame = match dataset.load_frame(row) {
            Ok(f) => f,
            Err(e) => {
                warn!("Skipping tick {}: {}", tick, e);
                clock.advance(exec_params.cycle_period_s);
                continue;
            }
        };

        let report = core.tick(&frame, &mut state, &clock);

        if state.send_pickup {
            info!("Sample pickup requested at tick {}", tick);
        }

        archiver
            .serialise(TickRecord::new(clock.now_s(), &state, &report))
            .wrap_err("Failed to archive tick")?;

        if exec_params.stats_save_period_ticks > 0
            && tick > 0
            && tick % exec_params.stats_save_period_ticks == 0
        {
            session.save(
                format!("map_stats/tick_{:06}.json", tick),
                core.world_map().stats(),
            );
        }

        clock.advance(exec_params.cycle_period_s);
    }

    // ---- SHUTDOWN ----

    let stats = core.world_map().stats();
    info!(
        "Replay complete, observed {:.1} % of the map, {} rock cells",
        stats.observed_fraction * 100.0,
        stats.rock_cells
    );

    session.save("map_stats.json", stats);

    let map_path = session.session_root.join("world_map.png");
    core.world_map()
        .to_image()
        .save(&map_path)
        .wrap_err_with(|| format!("Failed to save the world map to {:?}", map_path))?;

    info!("World map saved to {:?}", map_path);

    session.exit();

    Ok(())
}

/// Load a parameter file from the software root, falling back to the defaults if the root isn't
/// set.
fn load_or_default<P>(file_name: &str) -> Result<P, LoadError>
where
    P: serde::de::DeserializeOwned + Default,
{
    match util::params::load(file_name) {
        Err(LoadError::SwRootNotSet) => {
            warn!("Software root not set, using default {}", file_name);
            Ok(P::default())
        }
        r => r,
    }
}
