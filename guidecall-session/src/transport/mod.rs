mod peer_backend;
mod rtc_peer;
mod signaling_link;
mod transport_config;
mod transport_event;

pub use peer_backend::*;
pub use rtc_peer::*;
pub use signaling_link::*;
pub use transport_config::*;
pub use transport_event::*;
