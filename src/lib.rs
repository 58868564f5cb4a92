pub mod aggregate;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod estimator;
pub mod git;
pub mod model;
pub mod publish;
pub mod report;
pub mod run;
pub mod site;

pub use aggregate::aggregate;
pub use error::{OrgHoursError, Result};
pub use model::{ContributorStats, Hours, RepoResult, StatsMapping};
