mod error;
pub use error::ExecError;

pub mod native;
pub use native::{NativeSpec, NativeSpecBuilder, NativeStyle, SpecWarning};

pub mod proc;
pub use proc::{LaunchSpec, OutputTarget, ProcessController, StopOutcome};

mod submit;
pub use submit::{SubmitMode, launch_spec};

mod util;

pub mod prelude {
    pub use crate::error::ExecError;
    pub use crate::native::{NativeSpec, NativeSpecBuilder, NativeStyle};
    pub use crate::proc::{LaunchSpec, ProcessController, StopOutcome};
    pub use crate::submit::{SubmitMode, launch_spec};
}
