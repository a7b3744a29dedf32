//! Routing decisions and the interpreter that applies them
//!
//! Every stage returns a [`RoutingDecision`]: where to go next plus a patch
//! for its scope. [`drive`] is the only place where a patch is applied and
//! control moves to the next stage, for every scope in the crate.

use crate::research::budget::RunBudget;
use crate::research::state::StatePatch;
use crate::types::Result;
use async_trait::async_trait;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next<S> {
    Stage(S),
    Terminate,
}

#[derive(Debug)]
pub struct RoutingDecision<S, P> {
    pub next: Next<S>,
    pub patch: P,
}

impl<S, P: Default> RoutingDecision<S, P> {
    pub fn goto(stage: S, patch: P) -> Self {
        Self {
            next: Next::Stage(stage),
            patch,
        }
    }

    /// Move on without changing state
    pub fn goto_unchanged(stage: S) -> Self {
        Self::goto(stage, P::default())
    }

    pub fn terminate(patch: P) -> Self {
        Self {
            next: Next::Terminate,
            patch,
        }
    }
}

/// A set of stages operating on one state scope
#[async_trait]
pub trait StageMachine: Send + Sync {
    type Stage: Copy + Debug + Send + Sync;
    type State: Send + Sync;
    type Patch: StatePatch<Target = Self::State>;

    /// Scope name used in logs and limit errors
    fn scope(&self) -> &str;

    /// Budget charged for decision stages, if this scope is step-limited
    fn budget(&self) -> Option<&RunBudget> {
        None
    }

    /// Whether entering `stage` costs one step of the budget
    fn is_charged(&self, _stage: Self::Stage) -> bool {
        true
    }

    /// Run one stage against a read-only view of the state
    async fn step(
        &self,
        stage: Self::Stage,
        state: &Self::State,
    ) -> Result<RoutingDecision<Self::Stage, Self::Patch>>;
}

/// Run `machine` from `entry` until a stage terminates the scope.
///
/// A patch is applied only after its stage returned successfully, so an
/// error leaves the state exactly as the last completed stage left it.
pub async fn drive<M: StageMachine>(
    machine: &M,
    entry: M::Stage,
    state: &mut M::State,
) -> Result<()> {
    let mut stage = entry;
    loop {
        if let Some(budget) = machine.budget().filter(|_| machine.is_charged(stage)) {
            budget.charge_step(machine.scope())?;
        }

        tracing::debug!(scope = machine.scope(), stage = ?stage, "Entering stage");
        let decision = machine.step(stage, state).await?;
        decision.patch.apply_to(state);

        match decision.next {
            Next::Stage(next) => stage = next,
            Next::Terminate => {
                tracing::debug!(scope = machine.scope(), stage = ?stage, "Scope terminated");
                return Ok(());
            }
        }
    }
}
