mod frame_recorder;
mod recorder;
mod recording_manager;
mod recording_store;

pub use frame_recorder::*;
pub use recorder::*;
pub use recording_manager::*;
pub use recording_store::*;
