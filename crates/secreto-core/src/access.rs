use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use secreto_types::models::Participant;

use crate::error::Result;
use crate::store::{Store, with_retry};

/// A giver's own edge, resolved to participant records.
#[derive(Debug, Clone)]
pub struct MyRecipient {
    pub giver: Participant,
    pub recipient: Participant,
}

/// Read side of the assignment table. The only projection offered is the
/// single row keyed by the caller's own id.
#[derive(Clone)]
pub struct AssignmentAccess {
    store: Arc<dyn Store>,
}

impl AssignmentAccess {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// `Ok(None)` while no completed draw exists or the caller was not part
    /// of it.
    pub fn my_recipient(&self, participant_id: Uuid) -> Result<Option<MyRecipient>> {
        let Some(assignment) = with_retry(|| self.store.assignment_for_giver(participant_id))?
        else {
            debug!("No assignment yet for participant {}", participant_id);
            return Ok(None);
        };

        let giver = with_retry(|| self.store.get_participant(assignment.giver_id))?;
        let recipient = with_retry(|| self.store.get_participant(assignment.recipient_id))?;
        match (giver, recipient) {
            (Some(giver), Some(recipient)) => Ok(Some(MyRecipient { giver, recipient })),
            _ => {
                warn!(
                    "Assignment in draw {} references a missing participant",
                    assignment.draw_id
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{DrawEngine, DrawStrategy};
    use crate::memory::MemoryStore;
    use crate::store::ParticipantRepository;
    use chrono::Utc;

    fn register(store: &MemoryStore, name: &str) -> Participant {
        let p = Participant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: format!("555{:04}", store.list_participants(true).unwrap().len()),
            is_admin: false,
            active: true,
            created_at: Utc::now(),
        };
        store.insert_participant(&p, "hash").unwrap();
        p
    }

    #[test]
    fn nothing_before_the_draw() {
        let store = Arc::new(MemoryStore::new());
        let ana = register(&store, "Ana");
        let access = AssignmentAccess::new(store);
        assert!(access.my_recipient(ana.id).unwrap().is_none());
        assert!(access.my_recipient(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn three_participants_form_a_cycle() {
        let store = Arc::new(MemoryStore::new());
        let a = register(&store, "Ana");
        let b = register(&store, "Beto");
        let c = register(&store, "Carla");
        DrawEngine::new(store.clone(), DrawStrategy::Cycle)
            .perform_draw()
            .unwrap();

        let access = AssignmentAccess::new(store);
        let next = |p: &Participant| access.my_recipient(p.id).unwrap().unwrap();

        let from_a = next(&a);
        assert_eq!(from_a.giver.id, a.id);
        assert_ne!(from_a.recipient.id, a.id);

        // Following the edges from A visits B and C before returning to A.
        let second = next(&from_a.recipient);
        let third = next(&second.recipient);
        assert_eq!(third.recipient.id, a.id);
        let mut visited = vec![from_a.recipient.id, second.recipient.id];
        visited.sort();
        let mut expected = vec![b.id, c.id];
        expected.sort();
        assert_eq!(visited, expected);
    }

    #[test]
    fn reset_hides_assignments_again() {
        let store = Arc::new(MemoryStore::new());
        let a = register(&store, "Ana");
        register(&store, "Beto");
        let engine = DrawEngine::new(store.clone(), DrawStrategy::Cycle);
        engine.perform_draw().unwrap();
        engine.reset_draw().unwrap();

        let access = AssignmentAccess::new(store);
        assert!(access.my_recipient(a.id).unwrap().is_none());
    }

    #[test]
    fn deactivated_recipient_still_resolves() {
        let store = Arc::new(MemoryStore::new());
        let a = register(&store, "Ana");
        let b = register(&store, "Beto");
        DrawEngine::new(store.clone(), DrawStrategy::Cycle)
            .perform_draw()
            .unwrap();
        store.set_active(b.id, false).unwrap();

        let access = AssignmentAccess::new(store);
        let mine = access.my_recipient(a.id).unwrap().unwrap();
        assert_eq!(mine.recipient.id, b.id);
        assert!(!mine.recipient.active);
    }
}
