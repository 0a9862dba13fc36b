mod resources;
pub use resources::ResourceRequest;

mod description;
pub use description::{JobDescription, JobDescriptionBuilder};
