pub use guidecall_core::model::{PeerEndpoint, WireMessage};

pub mod model {
    pub use guidecall_core::model::*;
    pub use guidecall_core::utils;
}

#[cfg(feature = "session")]
pub mod session {
    pub use guidecall_session::*;
}

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, `guidecall=info`
/// when unset. Does nothing if a subscriber is already installed.
#[cfg(feature = "session")]
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guidecall=info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
