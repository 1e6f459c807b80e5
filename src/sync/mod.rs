pub mod summary;
pub mod synchronizer;
pub mod transform;
pub mod validation;

pub use summary::{EntitySummary, Flow, PurgedEntity, SyncSummary};
pub use synchronizer::Synchronizer;
pub use validation::{IdValidator, validate_bbmri_id};
