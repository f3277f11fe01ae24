pub mod bulk;
pub mod enroller;
pub mod validator;

pub use crate::domain::model::{CandidateEnrollment, Enrollment, Verdict};
pub use crate::domain::ports::{EnrollmentCache, EnrollmentRepository, InvalidationScope};
pub use crate::utils::error::Result;
