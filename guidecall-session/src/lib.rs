mod config;
mod error;
mod feed;
mod media;
mod recording;
mod session;
mod signaling;
mod transport;

pub use config::*;
pub use error::*;
pub use feed::*;
pub use media::*;
pub use recording::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
