mod domain;
pub use domain::*;

mod job;
pub use job::*;

mod error;
pub use error::ModelError;
