//! State scopes, their patches and the folds between them
//!
//! Three scopes exist per run, each with exactly one owner at a time:
//!
//! | Scope | Owner | Lifetime |
//! |-------|-------|----------|
//! | [`TopState`] | workflow engine | whole run |
//! | [`LoopState`] | supervisor loop | briefing done until the loop terminates |
//! | [`WorkerState`] | one worker loop | dispatch until its output is folded |
//!
//! Stages never mutate a scope directly. They return a patch that the routing
//! interpreter applies. Sequence fields in a patch are appended; scalar fields
//! replace when set. A patch therefore cannot shrink or reorder a sequence.

use crate::tools::actions::DELEGATE_RESEARCH;
use crate::types::{AppError, Message, Result};

/// A partial update for one scope
pub trait StatePatch: Default + Send {
    type Target;

    fn apply_to(self, state: &mut Self::Target);
}

// ============= Workflow scope =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopStage {
    Clarify,
    Brief,
    Research,
    FinalReport,
}

#[derive(Debug, Clone, Default)]
pub struct TopState {
    pub conversation: Vec<Message>,
    pub research_brief: Option<String>,
    /// Supervisor transcript: the seed from briefing, then the loop's additions
    pub loop_messages: Vec<Message>,
    pub iteration_count: u32,
    pub notes: Vec<String>,
    pub raw_notes: Vec<String>,
    pub final_report: Option<String>,
    /// Set when the run ends early to ask the user a question
    pub clarifying_question: Option<String>,
    /// Non-fatal failure annotation
    pub error: Option<String>,
}

impl TopState {
    pub fn new(conversation: Vec<Message>) -> Self {
        Self {
            conversation,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct TopPatch {
    pub conversation: Vec<Message>,
    pub research_brief: Option<String>,
    pub loop_messages: Vec<Message>,
    pub iteration_count: Option<u32>,
    pub notes: Vec<String>,
    pub raw_notes: Vec<String>,
    pub final_report: Option<String>,
    pub clarifying_question: Option<String>,
    pub error: Option<String>,
}

impl StatePatch for TopPatch {
    type Target = TopState;

    fn apply_to(self, state: &mut TopState) {
        state.conversation.extend(self.conversation);
        state.loop_messages.extend(self.loop_messages);
        state.notes.extend(self.notes);
        state.raw_notes.extend(self.raw_notes);
        if let Some(count) = self.iteration_count {
            state.iteration_count = count;
        }
        if self.research_brief.is_some() {
            state.research_brief = self.research_brief;
        }
        if self.final_report.is_some() {
            state.final_report = self.final_report;
        }
        if self.clarifying_question.is_some() {
            state.clarifying_question = self.clarifying_question;
        }
        if self.error.is_some() {
            state.error = self.error;
        }
    }
}

// ============= Supervisor scope =============

#[derive(Debug, Clone)]
pub struct LoopState {
    pub research_brief: String,
    pub loop_messages: Vec<Message>,
    pub iteration_count: u32,
    pub notes: Vec<String>,
    pub raw_notes: Vec<String>,
    seeded: usize,
}

impl LoopState {
    /// Open the supervisor scope from the workflow scope.
    ///
    /// Briefing must have produced a brief and seeded the transcript.
    pub fn from_top(top: &TopState) -> Result<Self> {
        let research_brief = top
            .research_brief
            .clone()
            .ok_or_else(|| AppError::Internal("research loop started without a brief".into()))?;
        if top.loop_messages.is_empty() {
            return Err(AppError::Internal(
                "research loop started without seed messages".into(),
            ));
        }

        Ok(Self {
            research_brief,
            loop_messages: top.loop_messages.clone(),
            iteration_count: top.iteration_count,
            notes: Vec::new(),
            raw_notes: Vec::new(),
            seeded: top.loop_messages.len(),
        })
    }

    /// Compressed findings of every completed delegate, in transcript order
    pub fn delegate_notes(&self) -> Vec<String> {
        self.loop_messages
            .iter()
            .filter(|m| m.is_tool_result_of(DELEGATE_RESEARCH))
            .map(|m| m.content.clone())
            .collect()
    }

    /// Patch that closes the scope by folding delegate results into notes
    pub fn closing_patch(&self) -> LoopPatch {
        LoopPatch {
            notes: self.delegate_notes(),
            ..Default::default()
        }
    }

    pub fn into_output(self) -> LoopOutput {
        LoopOutput {
            research_brief: self.research_brief,
            new_messages: self.loop_messages.into_iter().skip(self.seeded).collect(),
            iteration_count: self.iteration_count,
            notes: self.notes,
            raw_notes: self.raw_notes,
            cut_short: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct LoopPatch {
    pub loop_messages: Vec<Message>,
    /// Count one coordinator pass
    pub advance_iteration: bool,
    pub notes: Vec<String>,
    pub raw_notes: Vec<String>,
}

impl LoopPatch {
    /// Fold one worker's output into the supervisor scope: its findings
    /// answer the delegate call and its raw notes carry over.
    pub fn fold_worker(&mut self, call_id: &str, output: WorkerOutput) {
        self.loop_messages.push(Message::tool_result(
            call_id,
            DELEGATE_RESEARCH,
            output.compressed_findings,
        ));
        self.raw_notes.extend(output.raw_notes);
    }
}

impl StatePatch for LoopPatch {
    type Target = LoopState;

    fn apply_to(self, state: &mut LoopState) {
        state.loop_messages.extend(self.loop_messages);
        state.notes.extend(self.notes);
        state.raw_notes.extend(self.raw_notes);
        if self.advance_iteration {
            state.iteration_count += 1;
        }
    }
}

/// What the supervisor scope hands back when it terminates
#[derive(Debug, Clone)]
pub struct LoopOutput {
    pub research_brief: String,
    pub notes: Vec<String>,
    pub raw_notes: Vec<String>,
    /// Messages added after the seed
    pub new_messages: Vec<Message>,
    pub iteration_count: u32,
    /// Why the run budget cut research short, if it did
    pub cut_short: Option<String>,
}

impl LoopOutput {
    /// Fold the terminated loop into the workflow scope
    pub fn into_top_patch(self) -> TopPatch {
        TopPatch {
            loop_messages: self.new_messages,
            iteration_count: Some(self.iteration_count),
            notes: self.notes,
            raw_notes: self.raw_notes,
            error: self
                .cut_short
                .map(|reason| format!("Research ended early: {}", reason)),
            ..Default::default()
        }
    }
}

// ============= Worker scope =============

#[derive(Debug, Clone)]
pub struct WorkerState {
    pub topic: String,
    pub worker_messages: Vec<Message>,
    pub tool_iteration_count: u32,
    /// Tool outputs gathered by this worker
    pub raw_notes: Vec<String>,
    pub compressed_findings: Option<String>,
}

impl WorkerState {
    pub fn new(topic: impl Into<String>, instructions: Message) -> Self {
        let topic = topic.into();
        Self {
            worker_messages: vec![instructions, Message::user(topic.clone())],
            topic,
            tool_iteration_count: 0,
            raw_notes: Vec::new(),
            compressed_findings: None,
        }
    }

    pub fn into_output(self) -> WorkerOutput {
        match self.compressed_findings {
            Some(findings) => WorkerOutput::from_findings(findings),
            None => WorkerOutput::placeholder(&self.topic),
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkerPatch {
    pub worker_messages: Vec<Message>,
    /// Count one agent pass
    pub advance_iteration: bool,
    pub raw_notes: Vec<String>,
    pub compressed_findings: Option<String>,
}

impl StatePatch for WorkerPatch {
    type Target = WorkerState;

    fn apply_to(self, state: &mut WorkerState) {
        state.worker_messages.extend(self.worker_messages);
        state.raw_notes.extend(self.raw_notes);
        if self.advance_iteration {
            state.tool_iteration_count += 1;
        }
        if self.compressed_findings.is_some() {
            state.compressed_findings = self.compressed_findings;
        }
    }
}

/// Immutable result handed from a worker to the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutput {
    pub compressed_findings: String,
    pub raw_notes: Vec<String>,
}

impl WorkerOutput {
    pub fn from_findings(findings: String) -> Self {
        Self {
            raw_notes: vec![findings.clone()],
            compressed_findings: findings,
        }
    }

    /// Deterministic stand-in used when compression cannot run
    pub fn placeholder(topic: &str) -> Self {
        Self::from_findings(placeholder_findings(topic))
    }
}

pub fn placeholder_findings(topic: &str) -> String {
    format!("Research findings from: {}", topic)
}
