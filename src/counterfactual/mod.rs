//! What-if search
//!
//! Finds single-feature changes that flip a decision. Stateless and safe
//! to run concurrently.

mod errors;
mod rule;
mod search;
mod space;

pub use errors::{CounterfactualError, SearchResult};
pub use rule::{DecisionRule, LinearCreditRule};
pub use search::{search, CounterfactualResult, CounterfactualSearch};
pub use space::{Domain, FeatureAxis, SearchSpace};
