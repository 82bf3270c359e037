use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use secreto_types::models::Participant;

use crate::error::{Result, SecretoError, StoreError};
use crate::store::{Store, with_retry};

pub const MIN_PASSWORD_CHARS: usize = 6;

/// Trims and bounds a display name.
pub fn normalize_name(raw: &str) -> Result<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let len = name.chars().count();
    if !(2..=100).contains(&len) {
        return Err(SecretoError::Validation(
            "name must be between 2 and 100 characters".into(),
        ));
    }
    Ok(name)
}

/// Strips separators from a phone number and checks what is left is an
/// optional `+` followed by 7 to 15 digits.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let phone: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    let digits = phone.strip_prefix('+').unwrap_or(&phone);
    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SecretoError::Validation(format!("invalid phone number '{}'", raw.trim())));
    }
    Ok(phone)
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(SecretoError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}

/// Sole writer of participant records.
#[derive(Clone)]
pub struct ParticipantService {
    store: Arc<dyn Store>,
}

impl ParticipantService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a participant. `password_hash` is stored as given.
    pub fn register(
        &self,
        name: &str,
        phone: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<Participant> {
        let participant = Participant {
            id: Uuid::new_v4(),
            name: normalize_name(name)?,
            phone: normalize_phone(phone)?,
            is_admin,
            active: true,
            created_at: Utc::now(),
        };

        with_retry(|| self.store.insert_participant(&participant, password_hash)).map_err(
            |e| match e {
                StoreError::Conflict(_) => {
                    SecretoError::Conflict("phone number already registered".into())
                }
                other => other.into(),
            },
        )?;
        info!(
            "Registered participant {} (admin: {})",
            participant.id, participant.is_admin
        );
        Ok(participant)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Participant>> {
        Ok(with_retry(|| self.store.get_participant(id))?)
    }

    pub fn find_by_phone(&self, raw_phone: &str) -> Result<Option<Participant>> {
        let Ok(phone) = normalize_phone(raw_phone) else {
            return Ok(None);
        };
        Ok(with_retry(|| self.store.find_by_phone(&phone))?)
    }

    /// Looks up an active participant by phone and hands its stored hash to
    /// `verify`. `Ok(None)` for unknown, inactive or mismatching credentials.
    pub fn authenticate(
        &self,
        raw_phone: &str,
        verify: impl FnOnce(&str) -> bool,
    ) -> Result<Option<Participant>> {
        let Some(participant) = self.find_by_phone(raw_phone)? else {
            return Ok(None);
        };
        if !participant.active {
            return Ok(None);
        }
        let Some(hash) = with_retry(|| self.store.password_hash(participant.id))? else {
            return Ok(None);
        };
        Ok(verify(&hash).then_some(participant))
    }

    /// Draw-eligible participants with whether each has answered the survey.
    pub fn list_eligible(&self) -> Result<Vec<(Participant, bool)>> {
        let participants = with_retry(|| self.store.list_participants(false))?;
        let surveyed = with_retry(|| self.store.completed_survey_ids())?;
        Ok(participants
            .into_iter()
            .filter(Participant::is_eligible)
            .map(|p| {
                let done = surveyed.contains(&p.id);
                (p, done)
            })
            .collect())
    }

    /// Removes a participant from future draws. Existing assignment rows keep
    /// pointing at the record.
    pub fn deactivate(&self, id: Uuid) -> Result<()> {
        if !with_retry(|| self.store.set_active(id, false))? {
            return Err(SecretoError::NotFound("participant"));
        }
        info!("Participant {} deactivated", id);
        Ok(())
    }
}
