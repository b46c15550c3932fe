mod output;
mod writer;

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::info;
use log::warn;
pub use output::parse_output;
use wait_timeout::ChildExt;
pub use writer::write_flatzinc;

use super::SolveOptions;
use super::SolveResponse;
use super::SolverBackend;
use crate::model::Model;
use crate::BackendError;

/// The solver used when none is configured.
pub const DEFAULT_EXECUTABLE: &str = "pumpkin-solver";

/// Time the solver gets on top of its own time limit to print its last solution and exit.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

static INSTANCE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Solves models by writing them as FlatZinc and running an external solver on them.
///
/// The solver is invoked as `<executable> [-a] -s -t <milliseconds> [extra args] <instance>`,
/// the interface of `pumpkin-solver`. Its output is read from a log file next to the instance.
#[derive(Clone, Debug)]
pub struct FlatZincBackend {
    executable: PathBuf,
    extra_args: Vec<String>,
    working_dir: PathBuf,
    keep_files: bool,
}

impl Default for FlatZincBackend {
    fn default() -> Self {
        FlatZincBackend::new(DEFAULT_EXECUTABLE)
    }
}

#[derive(Debug)]
struct Files {
    instance_file: PathBuf,
    log_file: PathBuf,
    err_file: PathBuf,
}

impl Files {
    fn new(working_dir: &Path) -> Self {
        let instance_file = working_dir.join(format!(
            "timetable-{}-{}.fzn",
            std::process::id(),
            INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        Files {
            log_file: instance_file.with_extension("log"),
            err_file: instance_file.with_extension("err"),
            instance_file,
        }
    }

    /// Remove whichever of the files were created.
    fn cleanup(self) -> std::io::Result<()> {
        for file in [self.instance_file, self.log_file, self.err_file] {
            if file.is_file() {
                std::fs::remove_file(file)?;
            }
        }

        Ok(())
    }
}

impl FlatZincBackend {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        FlatZincBackend {
            executable: executable.into(),
            extra_args: Vec::new(),
            working_dir: std::env::temp_dir(),
            keep_files: false,
        }
    }

    /// Pass `args` to the solver, before the instance path.
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    /// Write the instance and the solver output to `dir` instead of the system temp directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Leave the instance and the solver output on disk after solving.
    pub fn keep_files(mut self, keep: bool) -> Self {
        self.keep_files = keep;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn command(&self, model: &Model, options: &SolveOptions, files: &Files) -> Command {
        let mut command = Command::new(&self.executable);

        if model.objective().is_some() {
            let _ = command.arg("-a");
        }
        let _ = command
            .arg("-s")
            .arg("-t")
            .arg(options.time_limit.as_millis().to_string());

        for arg in &self.extra_args {
            let _ = command.arg(arg);
        }

        let _ = command.arg(&files.instance_file);
        command
    }
}

impl SolverBackend for FlatZincBackend {
    fn solve(
        &mut self,
        model: &Model,
        options: &SolveOptions,
    ) -> Result<SolveResponse, BackendError> {
        let files = Files::new(&self.working_dir);
        let result = self.run(model, options, &files);

        if self.keep_files {
            info!("Kept solver files at {}", files.instance_file.display());
        } else if let Err(error) = files.cleanup() {
            debug!("Failed to remove solver files: {error}");
        }

        result
    }
}

impl FlatZincBackend {
    fn run(
        &self,
        model: &Model,
        options: &SolveOptions,
        files: &Files,
    ) -> Result<SolveResponse, BackendError> {
        let mut writer = BufWriter::new(File::create(&files.instance_file)?);
        write_flatzinc(model, &mut writer)?;
        writer.flush()?;
        drop(writer);

        let mut command = self.command(model, options, files);
        debug!("Running {command:?}");

        let start = Instant::now();
        let mut child = command
            .stdout(File::create(&files.log_file)?)
            .stderr(File::create(&files.err_file)?)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| BackendError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;

        let status = match child.wait_timeout(options.time_limit + GRACE_PERIOD)? {
            Some(status) => Some(status),
            None => {
                warn!(
                    "Solver did not stop within {}s of its time limit, killing it",
                    GRACE_PERIOD.as_secs()
                );
                child.kill()?;
                let _ = child.wait()?;
                None
            }
        };
        let wall_time = start.elapsed();

        let stdout = std::fs::read_to_string(&files.log_file)?;
        let stderr = std::fs::read_to_string(&files.err_file)?;

        if let Some(status) = status.filter(|status| !status.success()) {
            return Err(BackendError::SolverFailed {
                status: status.to_string(),
                stderr: stderr.trim().to_owned(),
            });
        }

        let mut response = parse_output(model, &stdout)?;
        response.statistics.wall_time = wall_time;
        info!(
            "Solver finished with status {} ({})",
            response.status, response.statistics
        );
        Ok(response)
    }
}
