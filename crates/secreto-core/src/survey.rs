use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use secreto_types::models::{Participant, SurveyAnswers, SurveyResponse};

use crate::access::AssignmentAccess;
use crate::error::{Result, SecretoError};
use crate::store::{Store, with_retry};

pub const MAX_ANSWER_CHARS: usize = 1000;

#[derive(Debug, Clone)]
pub struct SurveyStatus {
    pub response: Option<SurveyResponse>,
}

impl SurveyStatus {
    pub fn completed(&self) -> bool {
        self.response.is_some()
    }
}

/// The recipient's survey as shown to their giver.
#[derive(Debug, Clone)]
pub struct RecipientSurvey {
    pub recipient: Participant,
    pub response: SurveyResponse,
}

/// Every answer must be present, non-blank and reasonably short. Answers are
/// stored trimmed.
pub fn validate_answers(answers: SurveyAnswers) -> Result<SurveyAnswers> {
    let missing: Vec<&str> = answers
        .fields()
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(SecretoError::Validation(format!(
            "all survey answers are required, missing: {}",
            missing.join(", ")
        )));
    }
    if let Some((name, _)) = answers
        .fields()
        .iter()
        .find(|(_, value)| value.trim().chars().count() > MAX_ANSWER_CHARS)
    {
        return Err(SecretoError::Validation(format!(
            "{} exceeds {} characters",
            name, MAX_ANSWER_CHARS
        )));
    }

    Ok(SurveyAnswers {
        gustos_actuales: answers.gustos_actuales.trim().to_string(),
        color_favorito: answers.color_favorito.trim().to_string(),
        tipo_regalo: answers.tipo_regalo.trim().to_string(),
        quiere_probar: answers.quiere_probar.trim().to_string(),
        talla_ropa: answers.talla_ropa.trim().to_string(),
    })
}

#[derive(Clone)]
pub struct SurveyService {
    store: Arc<dyn Store>,
    access: AssignmentAccess,
}

impl SurveyService {
    pub fn new(store: Arc<dyn Store>, access: AssignmentAccess) -> Self {
        Self { store, access }
    }

    /// Stores the participant's answers, replacing any earlier submission.
    pub fn submit(&self, participant_id: Uuid, answers: SurveyAnswers) -> Result<SurveyResponse> {
        let answers = validate_answers(answers)?;
        if with_retry(|| self.store.get_participant(participant_id))?.is_none() {
            return Err(SecretoError::NotFound("participant"));
        }

        let response = SurveyResponse {
            participant_id,
            answers,
            completed_at: Utc::now(),
        };
        with_retry(|| self.store.upsert_survey(&response))?;
        info!("Survey stored for participant {}", participant_id);
        Ok(response)
    }

    pub fn verify(&self, participant_id: Uuid) -> Result<SurveyStatus> {
        let response = with_retry(|| self.store.get_survey(participant_id))?;
        Ok(SurveyStatus { response })
    }

    /// The survey of whoever `viewer_id` gives to. The recipient is resolved
    /// from the viewer's own assignment on every call; there is no way to
    /// name a target directly.
    pub fn recipient_survey(&self, viewer_id: Uuid) -> Result<Option<RecipientSurvey>> {
        let Some(mine) = self.access.my_recipient(viewer_id)? else {
            return Ok(None);
        };
        let Some(response) = with_retry(|| self.store.get_survey(mine.recipient.id))? else {
            debug!("Recipient of {} has not answered the survey yet", viewer_id);
            return Ok(None);
        };
        Ok(Some(RecipientSurvey {
            recipient: mine.recipient,
            response,
        }))
    }
}
