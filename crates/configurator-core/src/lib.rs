//! # configurator-core
//!
//! Core types and abstractions for the configurator SDK.
//!
//! This crate provides:
//! - Attribute, decision and configuration primitives
//! - Partial (delta) payloads reported by the engine
//! - Explain questions, answers and candidate solutions
//! - Session identity, context and the immutable session snapshot
//! - The closed failure taxonomy
//! - Configuration system

pub mod attribute;
pub mod config;
pub mod decision;
pub mod delta;
pub mod error;
pub mod explain;
pub mod session;

pub use attribute::{
    Attribute, AttributeId, BooleanAttribute, Cardinality, ChoiceAttribute, ChoiceValue,
    ChoiceValueDecisionState, ComponentAttribute, ComponentDecisionState, Decision, DecisionKind,
    NumericAttribute, NumericRange,
};
pub use config::{Config, ConfigError, RetryConfig};
pub use decision::{AttributeDecision, ConflictHandling, ExplainSolution, SetManyMode};
pub use delta::{ConsequencesDelta, DecisionResponse, DecisionsDelta, SetManyResponse};
pub use error::{ConflictReason, Failure, Result};
pub use explain::{
    ConstraintExplanation, DecisionExplanation, ExplainAnswer, ExplainAnswerType,
    ExplainQuestion, ExplainSubject,
};
pub use session::{
    AllowedInExplain, Configuration, ConfigurationModelSource, SessionContext, SessionId,
    SessionState,
};
