pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::cache::CacheSynchronizer;
pub use adapters::http::HttpEnrollmentRepository;
pub use crate::core::bulk::{BulkEnroller, BulkPlan, BulkReport};
pub use crate::core::enroller::Enroller;
pub use crate::core::validator::validate;
pub use domain::model::Verdict;
pub use utils::error::{EnrollError, Result};
