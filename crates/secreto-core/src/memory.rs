use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use secreto_types::models::{Assignment, Draw, DrawStatus, Participant, SurveyResponse};

use crate::error::{SecretoError, StoreError, StoreResult};
use crate::store::{
    AssignmentRepository, DrawOp, DrawTransaction, ParticipantRepository, SurveyRepository,
};

/// Map-backed store for tests and throwaway deployments.
///
/// A single `RwLock` guards all state. Draw operations run against a copy of
/// the state under the write lock and swap it in on success, so readers see
/// either the old assignment set or the new one in full.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryState>,
}

#[derive(Clone, Default)]
struct MemoryState {
    participants: Vec<StoredParticipant>,
    draws: Vec<Draw>,
    assignments: Vec<Assignment>,
    surveys: HashMap<Uuid, SurveyResponse>,
}

#[derive(Clone)]
struct StoredParticipant {
    participant: Participant,
    password_hash: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Backend(format!("memory store lock poisoned: {}", e)))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Backend(format!("memory store lock poisoned: {}", e)))
    }
}

impl MemoryState {
    fn latest_draw(&self) -> Option<&Draw> {
        self.draws.last()
    }

    fn participant(&self, id: Uuid) -> Option<&StoredParticipant> {
        self.participants.iter().find(|p| p.participant.id == id)
    }
}

impl DrawTransaction for MemoryState {
    fn current_draw(&self) -> StoreResult<Option<Draw>> {
        Ok(self.latest_draw().cloned())
    }

    fn eligible_participants(&self) -> StoreResult<Vec<Participant>> {
        Ok(self
            .participants
            .iter()
            .map(|p| &p.participant)
            .filter(|p| p.is_eligible())
            .cloned()
            .collect())
    }

    fn insert_draw(&mut self, draw: &Draw, assignments: &[Assignment]) -> StoreResult<()> {
        if self.draws.iter().any(|d| d.id == draw.id) {
            return Err(StoreError::Conflict(format!("draw {} already exists", draw.id)));
        }
        self.draws.push(draw.clone());
        self.assignments.extend_from_slice(assignments);
        Ok(())
    }

    fn clear_draw(&mut self, draw_id: Uuid) -> StoreResult<usize> {
        let before = self.assignments.len();
        self.assignments.retain(|a| a.draw_id != draw_id);
        if let Some(draw) = self.draws.iter_mut().find(|d| d.id == draw_id) {
            draw.status = DrawStatus::Pending;
            draw.completed_at = None;
        }
        Ok(before - self.assignments.len())
    }
}

impl ParticipantRepository for MemoryStore {
    fn insert_participant(&self, participant: &Participant, password_hash: &str) -> StoreResult<()> {
        let mut state = self.write()?;
        if state
            .participants
            .iter()
            .any(|p| p.participant.id == participant.id || p.participant.phone == participant.phone)
        {
            return Err(StoreError::Conflict(format!(
                "participant with phone {} already exists",
                participant.phone
            )));
        }
        state.participants.push(StoredParticipant {
            participant: participant.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(())
    }

    fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>> {
        Ok(self.read()?.participant(id).map(|p| p.participant.clone()))
    }

    fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Participant>> {
        Ok(self
            .read()?
            .participants
            .iter()
            .find(|p| p.participant.phone == phone)
            .map(|p| p.participant.clone()))
    }

    fn list_participants(&self, include_inactive: bool) -> StoreResult<Vec<Participant>> {
        Ok(self
            .read()?
            .participants
            .iter()
            .map(|p| &p.participant)
            .filter(|p| include_inactive || p.active)
            .cloned()
            .collect())
    }

    fn set_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state.participants.iter_mut().find(|p| p.participant.id == id) {
            Some(stored) => {
                stored.participant.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn password_hash(&self, id: Uuid) -> StoreResult<Option<String>> {
        Ok(self.read()?.participant(id).map(|p| p.password_hash.clone()))
    }
}

impl AssignmentRepository for MemoryStore {
    fn current_draw(&self) -> StoreResult<Option<Draw>> {
        Ok(self.read()?.latest_draw().cloned())
    }

    fn run_exclusive(&self, op: &mut DrawOp<'_>) -> Result<(), SecretoError> {
        let mut state = self.write()?;
        let mut scratch = state.clone();
        let tx: &mut dyn DrawTransaction = &mut scratch;
        op(tx)?;
        *state = scratch;
        Ok(())
    }

    fn assignment_for_giver(&self, giver_id: Uuid) -> StoreResult<Option<Assignment>> {
        let state = self.read()?;
        let Some(draw) = state.latest_draw().filter(|d| d.status == DrawStatus::Completed) else {
            return Ok(None);
        };
        Ok(state
            .assignments
            .iter()
            .find(|a| a.draw_id == draw.id && a.giver_id == giver_id)
            .copied())
    }

    fn assignments_for_draw(&self, draw_id: Uuid) -> StoreResult<Vec<Assignment>> {
        Ok(self
            .read()?
            .assignments
            .iter()
            .filter(|a| a.draw_id == draw_id)
            .copied()
            .collect())
    }
}

impl SurveyRepository for MemoryStore {
    fn upsert_survey(&self, response: &SurveyResponse) -> StoreResult<()> {
        self.write()?
            .surveys
            .insert(response.participant_id, response.clone());
        Ok(())
    }

    fn get_survey(&self, participant_id: Uuid) -> StoreResult<Option<SurveyResponse>> {
        Ok(self.read()?.surveys.get(&participant_id).cloned())
    }

    fn completed_survey_ids(&self) -> StoreResult<HashSet<Uuid>> {
        Ok(self.read()?.surveys.keys().copied().collect())
    }
}
