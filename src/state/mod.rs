//! Branch state persistence.
//!
//! The only durable output of a release run: the last released commit and
//! tag base per branch, kept as one JSON mapping in a repository variable.

mod branch_state;
mod store;

pub use branch_state::{BranchState, BranchStateMap, PreviousRelease};
pub use store::{
    CommitStateResult, LoadStateResult, ReleaseStateStore, STATE_KEY, StateConfig,
};
