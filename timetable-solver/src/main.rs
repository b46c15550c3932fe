mod render;
mod result;

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::error;
use log::info;
use log::warn;
use log::Level;
use log::LevelFilter;
use result::TimetableError;
use result::TimetableResult;
use timetable_core::backend::write_flatzinc;
use timetable_core::backend::FlatZincBackend;
use timetable_core::backend::DEFAULT_EXECUTABLE;
use timetable_core::config::ScheduleConfig;
use timetable_core::decode::Timetable;
use timetable_core::domain::Domain;
use timetable_core::scheduler::Scheduler;
use timetable_core::ScheduleError;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The JSON document describing the slot grid, buildings, batches, faculty and fixed
    /// placements of the week to schedule.
    config_path: PathBuf,

    /// The time budget of the solver in seconds. Overrides `time_limit_secs` of the
    /// configuration.
    #[arg(short = 't', long = "time-limit")]
    time_limit: Option<u64>,

    /// The FlatZinc solver executable. It is called as `<solver> [-a] -s -t <ms> <instance>`.
    #[arg(long = "solver", default_value = DEFAULT_EXECUTABLE)]
    solver: PathBuf,

    /// An additional argument passed to the solver before the instance path. May be repeated.
    #[arg(long = "solver-arg", allow_hyphen_values = true)]
    solver_args: Vec<String>,

    /// Keep the generated FlatZinc instance and the solver output files after the run.
    #[arg(long = "keep-files", default_value_t = false)]
    keep_files: bool,

    /// Write the complete model as FlatZinc to this path and stop without solving.
    #[arg(long = "emit-fzn")]
    emit_fzn: Option<PathBuf>,

    /// Export the placed lessons to this path as CSV.
    #[arg(long = "csv")]
    csv: Option<PathBuf>,

    /// Enables log message output from the scheduler.
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,

    /// Removes the call site (file and line) from the log messages.
    #[arg(long = "omit-call-site", default_value_t = false)]
    omit_call_site: bool,
}

fn configure_logging(verbose: bool, omit_call_site: bool) {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .format(move |buf, record| {
            write!(buf, "{} ", record.level())?;
            if record.level() != Level::Info && !omit_call_site {
                write!(
                    buf,
                    "[{}:{}] ",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )?;
            }
            writeln!(buf, "{}", record.args())
        })
        .filter_level(level_filter)
        .target(env_logger::Target::Stderr)
        .init();
    info!("Logging successfully configured");
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(e) => {
            error!("Execution failed, error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> TimetableResult<()> {
    let args = Args::parse();
    configure_logging(args.verbose, args.omit_call_site);

    let mut domain = ScheduleConfig::from_path(&args.config_path)?.into_domain()?;
    if let Some(seconds) = args.time_limit {
        domain.time_limit = Duration::from_secs(seconds);
    }
    info!(
        "Loaded {} batches in {} buildings over {} slots",
        domain.batches.len(),
        domain.buildings.len(),
        domain.slots.len()
    );

    let backend = FlatZincBackend::new(args.solver)
        .with_args(args.solver_args)
        .keep_files(args.keep_files);
    let scheduler = Scheduler::new(&domain, backend);

    if let Some(path) = args.emit_fzn {
        let prepared = scheduler.prepare()?;
        let file =
            File::create(&path).map_err(|e| TimetableError::file_writing(e, path.display()))?;
        let mut writer = BufWriter::new(file);
        write_flatzinc(&prepared.model, &mut writer)?;
        writer.flush()?;
        info!("Wrote FlatZinc model to {}", path.display());
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let outcome = match scheduler.run() {
        Ok(outcome) => outcome,
        Err(ScheduleError::ValidationFailure(failure)) => {
            warn!("The solver returned a timetable which breaks the invariants");
            render::write_timetable(&mut out, &domain, &failure.timetable)?;
            render::write_report(&mut out, &failure.report)?;
            return Err(ScheduleError::ValidationFailure(failure).into());
        }
        Err(e) => return Err(e.into()),
    };

    render::write_timetable(&mut out, &domain, &outcome.timetable)?;
    render::write_report(&mut out, &outcome.report)?;
    writeln!(out)?;
    render::write_metadata(&mut out, &outcome.metadata)?;

    if let Some(path) = args.csv {
        export_csv(&path, &domain, &outcome.timetable)?;
        info!("Exported the timetable to {}", path.display());
    }

    Ok(())
}

fn export_csv(path: &Path, domain: &Domain, timetable: &Timetable) -> TimetableResult<()> {
    let file = File::create(path).map_err(|e| TimetableError::file_writing(e, path.display()))?;
    let mut writer = BufWriter::new(file);
    render::write_csv(&mut writer, domain, timetable)
        .and_then(|()| writer.flush())
        .map_err(|e| TimetableError::file_writing(e, path.display()))
}
