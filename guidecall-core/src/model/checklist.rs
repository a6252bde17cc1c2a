use crate::model::wire::NextStepInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub template: String,
    #[serde(default)]
    pub phases: Vec<SessionPhase>,
}

/// Answers already persisted for one checklist of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPhase {
    pub checklist: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phases: Vec<TemplatePhase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePhase {
    pub checklist: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub order: u32,
}

/// A single answered field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub step: String,
    pub field: String,
    pub value: String,
    pub time: DateTime<Utc>,
}

impl Action {
    pub fn new(step: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            field: field.into(),
            value: value.into(),
            time: Utc::now(),
        }
    }

    fn answers_same_field(&self, other: &Action) -> bool {
        self.step == other.step && self.field == other.field
    }
}

/// Emitted by the checklist view when a step has been completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    pub checklist_id: String,
    pub action: Action,
}

/// Answers per checklist, at most one per `(step, field)`.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    actions: HashMap<String, Vec<Action>>,
}

impl ActionLog {
    /// Seeds the log with the answers already persisted for a session.
    pub fn from_session(session: &Session) -> Self {
        let actions = session
            .phases
            .iter()
            .map(|phase| (phase.checklist.clone(), phase.actions.clone()))
            .collect();
        Self { actions }
    }

    /// Records an answer, replacing a previous answer for the same field.
    pub fn record(&mut self, checklist_id: &str, action: Action) {
        let entry = self.actions.entry(checklist_id.to_owned()).or_default();
        entry.retain(|a| !a.answers_same_field(&action));
        entry.push(action);
    }

    pub fn actions_for(&self, checklist_id: &str) -> &[Action] {
        self.actions
            .get(checklist_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_actions(&self, checklist_id: &str) -> bool {
        !self.actions_for(checklist_id).is_empty()
    }
}

/// Resolves the step the operator should move to after `step_id` of
/// `checklist_id` was completed.
///
/// The following step of the same checklist wins; after the last step it is
/// the first step of the next checklist.
pub fn next_step_after(
    checklists: &[Checklist],
    checklist_id: &str,
    step_id: &str,
) -> Option<NextStepInfo> {
    let checklist_index = checklists.iter().position(|c| c.id == checklist_id)?;
    let checklist = &checklists[checklist_index];

    if let Some(step_index) = checklist.steps.iter().position(|s| s.id == step_id) {
        if let Some(next) = checklist.steps.get(step_index + 1) {
            return Some(NextStepInfo::new(&next.name, &next.description));
        }
    }

    checklists
        .get(checklist_index + 1)
        .and_then(|next| next.steps.first())
        .map(|step| NextStepInfo::new(&step.name, &step.description))
}
