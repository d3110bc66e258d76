mod reading;
mod rule_store;

pub use reading::ReadingRepository;
pub use rule_store::{RuleStore, RuleStoreError};
