/// Per-entity state machine (spec §4.5):
///
/// ```text
/// PENDING → LOADING → TRANSFORMING_PRE → LINKING → TRANSFORMING_POST → DONE
///                                    ↓          ↓              ↓
///                                  FAILED    FAILED         FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Pending,
    Loading,
    TransformingPre,
    Linking,
    TransformingPost,
    Done,
    Failed,
    /// A descendant of a `Failed` entity, when `stop_on_error == false`.
    Skipped,
    Cancelled,
}

impl EntityState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EntityState::Done | EntityState::Failed | EntityState::Skipped | EntityState::Cancelled
        )
    }
}
