use crate::coordinator::TimerCoordinator;
use crate::domain::Clock;
use crate::error::TimerError;
use crate::notifications::Notice;
use crate::persistence::BlobStore;
use tracing::{info, warn};

/// Result of reacting to a branch switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    /// No branch reported; nothing done
    Ignored,
    /// No task is bound to the branch
    NoMatch,
    /// Exactly one task matched and its timer was started
    Started(String),
    /// Several tasks are bound to the branch; the user has to pick one
    Ambiguous(Vec<String>),
}

/// React to "current branch is now `branch`".
///
/// A running timer is always stopped first. A single bound task is then
/// started automatically; several bound tasks are only reported.
pub fn handle_branch_change<B: BlobStore, C: Clock>(
    coordinator: &mut TimerCoordinator<B, C>,
    branch: Option<&str>,
) -> Result<BranchOutcome, TimerError> {
    let Some(branch) = branch.filter(|branch| !branch.trim().is_empty()) else {
        return Ok(BranchOutcome::Ignored);
    };

    if coordinator.is_running() {
        coordinator.stop()?;
    }

    let mut matches = coordinator.store().keys_for_branch(branch)?;
    match matches.len() {
        0 => Ok(BranchOutcome::NoMatch),
        1 => {
            let key = matches.remove(0);
            coordinator.select_task(&key)?;
            coordinator.start()?;
            info!(task = %key, branch, "auto-started timer for branch");
            Ok(BranchOutcome::Started(key))
        }
        count => {
            let keys = matches.join(", ");
            warn!(branch, tasks = %keys, "multiple tasks found for branch");
            coordinator.notice(Notice::warning(format!(
                "Multiple tasks ({}) are associated with branch \"{}\". Please select a task manually. Tasks: {}",
                count, branch, keys
            )));
            Ok(BranchOutcome::Ambiguous(matches))
        }
    }
}
