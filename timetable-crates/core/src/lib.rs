//! # Timetable core
//!
//! Constructs the constraint model of a weekly timetable, adds the adjacency preferences,
//! hands the model to a solver backend and turns the answer back into a validated timetable.
//!
//! A timetable assigns every (batch, usable slot) pair either nothing or one session of a
//! subject the batch takes, such that every subject receives its two session-units, teachers
//! are never in two rooms of a building at once and never in two buildings a trip apart.
//!
//! The crate does not link against a solver. Modelling code is written against
//! [`model::ConstraintBuilder`], which [`model::Model`] implements by recording the problem; a
//! [`backend::SolverBackend`] then solves the recorded model. [`backend::FlatZincBackend`] does
//! so by running an external FlatZinc solver such as `pumpkin-solver`.
//!
//! # Example
//! ```no_run
//! use timetable_core::backend::FlatZincBackend;
//! use timetable_core::config::ScheduleConfig;
//! use timetable_core::scheduler::Scheduler;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let domain = ScheduleConfig::from_path("instances/coaching_centre.json")?.into_domain()?;
//! let outcome = Scheduler::new(&domain, FlatZincBackend::default()).run()?;
//!
//! println!("{}", outcome.report);
//! println!("adjacency score: {}", outcome.metadata.adjacency_score);
//! # Ok(())
//! # }
//! ```
pub mod backend;
pub mod builder;
pub mod config;
pub mod decode;
pub mod domain;
mod error;
pub mod model;
pub mod preferences;
pub mod scheduler;

pub use builder::build_model;
pub use decode::decode_and_validate;
pub use error::BackendError;
pub use error::ConfigError;
pub use error::ModelBuildError;
pub use error::ScheduleError;
pub use error::ScheduleResult;
pub use error::ValidationFailure;
pub use preferences::add_preferences;
