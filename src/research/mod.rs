//! Multi-stage research orchestration
//!
//! A run moves through four top-level stages:
//!
//! 1. **Clarify** - optionally ask the user one question and stop early
//! 2. **Brief** - turn the conversation into a research brief
//! 3. **Research** - the [`supervisor`] loop delegates topics to concurrent
//!    [`worker`] loops and collects their compressed findings
//! 4. **FinalReport** - synthesize the report, with a fallback that always
//!    produces one
//!
//! Every stage returns a [`routing::RoutingDecision`] and the single
//! interpreter in [`routing::drive`] applies it to the owning [`state`] scope.
//! All external calls are bounded by the run's [`budget::RunBudget`].
//!
//! # Failure policies
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | clarification call | proceed to briefing |
//! | briefing call | run fails |
//! | coordinator call | run fails |
//! | one worker tool call | error result for that call only |
//! | any worker in a batch | loop ends with notes folded so far |
//! | compression | placeholder findings |
//! | final report | bounded retry, then fallback report |

pub mod brief;
pub mod budget;
pub mod clarify;
pub mod prompts;
pub mod report;
pub mod routing;
pub mod state;
pub mod supervisor;
pub mod worker;

pub use budget::RunBudget;
pub use routing::{drive, Next, RoutingDecision, StageMachine};
pub use state::{StatePatch, TopStage, TopState, WorkerOutput};
pub use supervisor::{SupervisorLoop, SupervisorSettings, TopicResearcher};
pub use worker::{WorkerLoop, WorkerSettings};
