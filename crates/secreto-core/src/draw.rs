//! The draw engine.
//!
//! A draw turns the eligible participants into a giver -> recipient mapping
//! with no self-assignment, then persists it in one exclusive store section.
//! Two ways of building the mapping are supported:
//!
//! * [`DrawStrategy::Cycle`] shuffles the participants and lets each one give
//!   to the next in the shuffled order, wrapping around. Any order gives a
//!   valid derangement for n >= 2, but only single-cycle ones are produced.
//! * [`DrawStrategy::Uniform`] reshuffles until the permutation has no fixed
//!   point, which samples uniformly over all derangements.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};
use uuid::Uuid;

use secreto_types::models::{Assignment, Draw, DrawStatus, Participant};

use crate::error::{Result, SecretoError, StoreError};
use crate::store::{DrawTransaction, Store, with_retry};

pub const MIN_PARTICIPANTS: usize = 2;

/// Shuffles tried by the uniform strategy before falling back to a cycle.
/// Each attempt succeeds with probability close to 1/e.
const MAX_UNIFORM_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawStrategy {
    #[default]
    Cycle,
    Uniform,
}

impl FromStr for DrawStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cycle" => Ok(DrawStrategy::Cycle),
            "uniform" => Ok(DrawStrategy::Uniform),
            other => Err(format!("unknown draw strategy '{}' (expected cycle or uniform)", other)),
        }
    }
}

/// Result of a completed draw.
#[derive(Debug, Clone)]
pub struct DrawOutcome {
    pub draw: Draw,
    pub assignments: Vec<Assignment>,
    /// The participants that took part, in registration order.
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    /// Assignment rows removed, one per participant whose recipient was cleared.
    pub participants_cleared: usize,
    /// Completed draws put back to pending (0 or 1).
    pub draws_reset: usize,
}

/// Current draw status as seen by the participant listing.
#[derive(Debug, Clone)]
pub struct DrawState {
    pub draw: Option<Draw>,
}

impl DrawState {
    pub fn status(&self) -> DrawStatus {
        self.draw
            .as_ref()
            .map(|d| d.status)
            .unwrap_or(DrawStatus::Pending)
    }
}

/// Pairs `order[i]` with `order[(i + 1) % n]`.
pub fn cyclic_pairs(order: &[Uuid]) -> Vec<(Uuid, Uuid)> {
    let n = order.len();
    (0..n).map(|i| (order[i], order[(i + 1) % n])).collect()
}

/// Builds giver -> recipient pairs over `ids` using `strategy`.
pub fn plan_pairs<R: Rng + ?Sized>(
    ids: &[Uuid],
    strategy: DrawStrategy,
    rng: &mut R,
) -> Result<Vec<(Uuid, Uuid)>> {
    if ids.len() < MIN_PARTICIPANTS {
        return Err(SecretoError::InsufficientParticipants { found: ids.len() });
    }

    let mut order = ids.to_vec();
    match strategy {
        DrawStrategy::Cycle => {
            order.shuffle(rng);
            Ok(cyclic_pairs(&order))
        }
        DrawStrategy::Uniform => {
            for attempt in 1..=MAX_UNIFORM_ATTEMPTS {
                order.shuffle(rng);
                if ids.iter().zip(&order).all(|(giver, recipient)| giver != recipient) {
                    debug!("Uniform derangement found after {} shuffles", attempt);
                    return Ok(ids.iter().copied().zip(order).collect());
                }
            }
            warn!(
                "No derangement after {} shuffles, falling back to a single cycle",
                MAX_UNIFORM_ATTEMPTS
            );
            order.shuffle(rng);
            Ok(cyclic_pairs(&order))
        }
    }
}

/// Checks that `assignments` is a derangement of `ids`: every id gives exactly
/// once, receives exactly once, and never to itself.
pub fn validate_assignments(ids: &[Uuid], assignments: &[Assignment]) -> Result<()> {
    let expected: HashSet<Uuid> = ids.iter().copied().collect();
    if expected.len() != ids.len() {
        return Err(SecretoError::InvalidAssignment("duplicate participant ids".into()));
    }
    if assignments.len() != ids.len() {
        return Err(SecretoError::InvalidAssignment(format!(
            "{} rows for {} participants",
            assignments.len(),
            ids.len()
        )));
    }

    let mut givers = HashSet::with_capacity(ids.len());
    let mut recipients = HashSet::with_capacity(ids.len());
    for a in assignments {
        if a.giver_id == a.recipient_id {
            return Err(SecretoError::InvalidAssignment(format!(
                "participant {} assigned to themselves",
                a.giver_id
            )));
        }
        if !expected.contains(&a.giver_id) || !expected.contains(&a.recipient_id) {
            return Err(SecretoError::InvalidAssignment(
                "row references a participant outside the draw".into(),
            ));
        }
        if !givers.insert(a.giver_id) {
            return Err(SecretoError::InvalidAssignment(format!(
                "participant {} gives twice",
                a.giver_id
            )));
        }
        if !recipients.insert(a.recipient_id) {
            return Err(SecretoError::InvalidAssignment(format!(
                "participant {} receives twice",
                a.recipient_id
            )));
        }
    }
    Ok(())
}

/// Sole writer of assignment rows.
#[derive(Clone)]
pub struct DrawEngine {
    store: Arc<dyn Store>,
    strategy: DrawStrategy,
}

impl DrawEngine {
    pub fn new(store: Arc<dyn Store>, strategy: DrawStrategy) -> Self {
        Self { store, strategy }
    }

    pub fn status(&self) -> Result<DrawState> {
        let draw = with_retry(|| self.store.current_draw())?;
        Ok(DrawState { draw })
    }

    /// Draws over the current eligible participants using the thread RNG.
    pub fn perform_draw(&self) -> Result<DrawOutcome> {
        self.perform_draw_with(&mut rand::rng())
    }

    /// Rejects with [`SecretoError::DrawAlreadyCompleted`] while a completed
    /// draw exists, and with [`SecretoError::InsufficientParticipants`] below
    /// two participants. Nothing is written in either case.
    pub fn perform_draw_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<DrawOutcome> {
        let mut outcome = None;
        let strategy = self.strategy;

        let mut op = |tx: &mut dyn DrawTransaction| -> Result<()> {
            if let Some(current) = tx.current_draw()? {
                if current.status == DrawStatus::Completed {
                    return Err(SecretoError::DrawAlreadyCompleted);
                }
            }

            let participants = tx.eligible_participants()?;
            let ids: Vec<Uuid> = participants.iter().map(|p| p.id).collect();
            let pairs = plan_pairs(&ids, strategy, &mut *rng)?;

            let now = Utc::now();
            let draw = Draw {
                id: Uuid::new_v4(),
                status: DrawStatus::Completed,
                created_at: now,
                completed_at: Some(now),
            };
            let assignments: Vec<Assignment> = pairs
                .into_iter()
                .map(|(giver_id, recipient_id)| Assignment {
                    draw_id: draw.id,
                    giver_id,
                    recipient_id,
                })
                .collect();
            validate_assignments(&ids, &assignments)?;

            tx.insert_draw(&draw, &assignments)?;
            outcome = Some(DrawOutcome {
                draw,
                assignments,
                participants,
            });
            Ok(())
        };

        self.exclusive(&mut op)?;

        let outcome = outcome.ok_or_else(|| {
            SecretoError::InvalidAssignment("draw finished without producing assignments".into())
        })?;
        info!(
            "Draw {} completed with {} participants",
            outcome.draw.id,
            outcome.assignments.len()
        );
        Ok(outcome)
    }

    /// Clears the current draw. Resetting a pending draw is a no-op.
    pub fn reset_draw(&self) -> Result<ResetSummary> {
        let mut summary = ResetSummary::default();

        let mut op = |tx: &mut dyn DrawTransaction| -> Result<()> {
            summary = ResetSummary::default();
            let Some(current) = tx.current_draw()? else {
                return Ok(());
            };
            if current.status != DrawStatus::Completed {
                return Ok(());
            }
            summary.participants_cleared = tx.clear_draw(current.id)?;
            summary.draws_reset = 1;
            Ok(())
        };

        self.exclusive(&mut op)?;

        if summary.draws_reset > 0 {
            info!(
                "Draw reset: {} assignments removed",
                summary.participants_cleared
            );
        } else {
            debug!("Draw reset requested with no completed draw");
        }
        Ok(summary)
    }

    /// `run_exclusive` with one retry when the backend was busy.
    fn exclusive(
        &self,
        op: &mut dyn FnMut(&mut dyn DrawTransaction) -> Result<()>,
    ) -> Result<()> {
        match self.store.run_exclusive(op) {
            Err(SecretoError::Storage(StoreError::Transient(reason))) => {
                warn!("Draw store busy, retrying once: {}", reason);
                self.store.run_exclusive(op)
            }
            other => other,
        }
    }
}
