pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Label of the data channel opened towards the operator.
pub const DATA_CHANNEL_LABEL: &str = "guidecall-data";

/// Stream id announced for the locally captured tracks.
pub const LOCAL_STREAM_ID: &str = "guidecall-local";
