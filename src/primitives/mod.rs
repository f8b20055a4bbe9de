//! Building blocks shared by the detector: path helpers, resource globbing
//! and the rule engine.

pub mod glob_match;
pub mod path;
pub mod rule;
pub mod rule_set;
