use thiserror::Error;
use timetable_core::ConfigError;
use timetable_core::ScheduleError;

pub(crate) type TimetableResult<T> = Result<T, TimetableError>;

#[derive(Error, Debug)]
pub(crate) enum TimetableError {
    #[error("IO error, more details: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Failed to write file {1}, more details: {0}")]
    FileWritingError(std::io::Error, String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl TimetableError {
    pub(crate) fn file_writing(error: std::io::Error, path: impl std::fmt::Display) -> Self {
        TimetableError::FileWritingError(error, path.to_string())
    }
}
