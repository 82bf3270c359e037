//! Secret friend core: the draw engine, per-participant assignment lookup,
//! the preference survey and the participant registry, all written against
//! the repository traits in [`store`].

pub mod access;
pub mod draw;
pub mod error;
pub mod memory;
pub mod participants;
pub mod store;
pub mod survey;

pub use access::{AssignmentAccess, MyRecipient};
pub use draw::{DrawEngine, DrawOutcome, DrawState, DrawStrategy, ResetSummary};
pub use error::{Result, SecretoError, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use participants::ParticipantService;
pub use store::Store;
pub use survey::{RecipientSurvey, SurveyService, SurveyStatus};
