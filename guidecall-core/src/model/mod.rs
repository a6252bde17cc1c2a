mod checklist;
mod operator;
mod peer;
mod signaling;
mod status;
mod wire;

pub use checklist::{
    Action, ActionEvent, ActionLog, Checklist, Session, SessionPhase, Step, Template,
    TemplatePhase, next_step_after,
};
pub use operator::OperatorInfo;
pub use peer::{ConnectionId, PeerEndpoint};
pub use signaling::{ChannelKind, IceServerConfig, SignalMessage};
pub use status::{ConnectionStatus, SignalingStatus};
pub use wire::{EMPTY_PAYLOAD, MessageType, NextStepInfo, WireMessage};
