//! Round Systems
//!
//! Interaction generation from decisions, and folding of outcomes back into
//! agent state.

pub mod folding;
pub mod interaction;

pub use folding::fold_outcomes;
pub use interaction::{
    rule_pairs, InteractionEngine, InteractionRule, RoundDecisions, RuleBook, RuleTable,
};
