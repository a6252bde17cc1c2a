mod signaling_manager;
mod signaling_state;

pub use signaling_manager::*;
pub use signaling_state::*;
