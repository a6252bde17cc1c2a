use guidecall_core::ActionEvent;

/// Commands the session view sends to the runtime.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// A checklist step was answered.
    ActionDone(ActionEvent),

    /// The user ends the session, `completed` or aborted.
    Close { completed: bool },

    /// The view went away without closing the session.
    NavigateAway,
}
