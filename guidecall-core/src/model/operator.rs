use crate::model::peer::PeerEndpoint;
use serde::{Deserialize, Serialize};

/// Remote party that can be called into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorInfo {
    pub id: PeerEndpoint,
    pub display_name: String,
    pub description: String,
    /// Session the operator is currently taking part in, if any.
    pub current_session: Option<String>,
}

impl OperatorInfo {
    pub fn is_available(&self) -> bool {
        self.current_session.is_none()
    }

    /// Label used when the operator is offered in a selection prompt.
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name, self.description)
    }
}
