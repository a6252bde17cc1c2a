mod collaborators;
mod endpoint_memory;
mod session_command;
mod session_runtime;

pub use collaborators::*;
pub use endpoint_memory::*;
pub use session_command::*;
pub use session_runtime::*;
