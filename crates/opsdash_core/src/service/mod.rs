//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, import, metric and report calls into
//!   use-case level APIs for the CLI.
//! - Keep callers decoupled from storage details.

use crate::config::ConfigError;
use crate::db::DbError;
use crate::io::{ExportError, ImportError};
use crate::repo::RepoError;
use crate::report::ReportError;
use crate::scenario::ScenarioError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod import_service;
pub mod reporting_service;

pub use import_service::{
    import_employees, import_projects, import_timesheet, ImportOutcome, TimesheetOutcome,
};
pub use reporting_service::ReportingService;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Any failure surfaced by a service call.
#[derive(Debug)]
pub enum ServiceError {
    Config(ConfigError),
    Db(DbError),
    Repo(RepoError),
    Import(ImportError),
    Export(ExportError),
    Report(ReportError),
    Scenario(ScenarioError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
            Self::Report(err) => write!(f, "{err}"),
            Self::Scenario(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Import(err) => Some(err),
            Self::Export(err) => Some(err),
            Self::Report(err) => Some(err),
            Self::Scenario(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ServiceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ImportError> for ServiceError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<ExportError> for ServiceError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<ReportError> for ServiceError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

impl From<ScenarioError> for ServiceError {
    fn from(value: ScenarioError) -> Self {
        Self::Scenario(value)
    }
}
