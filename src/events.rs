use crate::models::TaskCollection;

pub const EVENT_STATE_UPDATED: &str = "state_updated";
pub const EVENT_RELOAD_REQUESTED: &str = "reload_requested";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub tasks: TaskCollection,
    pub last_updated: Option<String>,
}
