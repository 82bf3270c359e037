//! Repository interfaces shared by the in-memory and SQLite backends.
//!
//! Assignment rows are only ever written from inside
//! [`AssignmentRepository::run_exclusive`], which the draw engine drives. The
//! exclusive section covers the whole check-then-write of a draw so two
//! concurrent draws cannot both see a pending state.

use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

use secreto_types::models::{Assignment, Draw, Participant, SurveyResponse};

use crate::error::{SecretoError, StoreError, StoreResult};

pub trait ParticipantRepository: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the phone is already taken.
    fn insert_participant(&self, participant: &Participant, password_hash: &str) -> StoreResult<()>;

    fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>>;

    fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Participant>>;

    /// Participants in registration order. Inactive ones only when asked.
    fn list_participants(&self, include_inactive: bool) -> StoreResult<Vec<Participant>>;

    /// Returns false when no participant has that id.
    fn set_active(&self, id: Uuid, active: bool) -> StoreResult<bool>;

    fn password_hash(&self, id: Uuid) -> StoreResult<Option<String>>;
}

/// Operations available inside the exclusive draw section.
pub trait DrawTransaction {
    /// Most recent draw, whatever its status.
    fn current_draw(&self) -> StoreResult<Option<Draw>>;

    /// Active, non-admin participants in registration order.
    fn eligible_participants(&self) -> StoreResult<Vec<Participant>>;

    /// Records `draw` and all of its assignment rows.
    fn insert_draw(&mut self, draw: &Draw, assignments: &[Assignment]) -> StoreResult<()>;

    /// Deletes the draw's assignment rows and sets it back to pending.
    /// Returns the number of rows removed.
    fn clear_draw(&mut self, draw_id: Uuid) -> StoreResult<usize>;
}

pub type DrawOp<'a> = dyn FnMut(&mut dyn DrawTransaction) -> Result<(), SecretoError> + 'a;

pub trait AssignmentRepository: Send + Sync {
    fn current_draw(&self) -> StoreResult<Option<Draw>>;

    /// Runs `op` holding the store's exclusive lock. Writes made through the
    /// transaction become visible together when `op` returns `Ok`, and are
    /// discarded when it returns `Err`.
    fn run_exclusive(&self, op: &mut DrawOp<'_>) -> Result<(), SecretoError>;

    /// The caller's edge in the current completed draw, if any.
    fn assignment_for_giver(&self, giver_id: Uuid) -> StoreResult<Option<Assignment>>;

    /// Every row of one draw. Used for auditing and tests, never exposed
    /// to participants.
    fn assignments_for_draw(&self, draw_id: Uuid) -> StoreResult<Vec<Assignment>>;
}

pub trait SurveyRepository: Send + Sync {
    /// Insert or replace the participant's response.
    fn upsert_survey(&self, response: &SurveyResponse) -> StoreResult<()>;

    fn get_survey(&self, participant_id: Uuid) -> StoreResult<Option<SurveyResponse>>;

    fn completed_survey_ids(&self) -> StoreResult<HashSet<Uuid>>;
}

/// Everything the service needs from a backend.
pub trait Store: ParticipantRepository + AssignmentRepository + SurveyRepository {}

impl<T> Store for T where T: ParticipantRepository + AssignmentRepository + SurveyRepository {}

/// Runs a storage call, repeating it once if the backend reports a transient
/// failure.
pub fn with_retry<T>(mut op: impl FnMut() -> StoreResult<T>) -> StoreResult<T> {
    match op() {
        Err(StoreError::Transient(reason)) => {
            warn!("Transient storage failure, retrying once: {}", reason);
            op()
        }
        other => other,
    }
}
