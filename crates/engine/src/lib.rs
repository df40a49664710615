// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow engine: state machine (C6), priority scorer (C7),
//! persistence loop (C8), agent invoker (C9), and approval gate (C10).
//! Together these turn a scored task sitting in `/Needs_Action` into a
//! completed or rejected one, with the audit log and the approval
//! manager as the seams where other crates plug in.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent_invoker;
pub mod approval_gate;
pub mod persistence_loop;
pub mod priority_scorer;
pub mod state_machine;

pub use agent_invoker::{AgentInvoker, AgentInvokerConfig, InvocationResult};
pub use approval_gate::{ApprovalGate, ApprovalGateConfig};
pub use persistence_loop::{
    PersistenceLoop, PersistenceLoopConfig, PersistenceLoopOutcome, RetryPolicy, TransientErrorType,
};
pub use priority_scorer::{PriorityScorer, PriorityScorerConfig, PriorityScorerError};
pub use state_machine::{StateMachine, StateMachineError};
