//! Explain questions and the engine's answers.

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeId;
use crate::decision::{AttributeDecision, ExplainSolution};

/// What a "why is it not satisfied" question is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "attributeId")]
pub enum ExplainSubject {
    Configuration,
    Attribute(AttributeId),
}

/// Which parts of an explanation the engine should compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExplainAnswerType {
    Causes,
    Solutions,
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "question", rename_all_fields = "camelCase")]
pub enum ExplainQuestion {
    WhyIsNotSatisfied {
        subject: ExplainSubject,
        answer_type: ExplainAnswerType,
    },
    WhyIsStateNotPossible {
        state: AttributeDecision,
        answer_type: ExplainAnswerType,
    },
}

impl ExplainQuestion {
    pub fn answer_type(&self) -> ExplainAnswerType {
        match self {
            ExplainQuestion::WhyIsNotSatisfied { answer_type, .. }
            | ExplainQuestion::WhyIsStateNotPossible { answer_type, .. } => *answer_type,
        }
    }
}

/// Constraints of the model that take part in an explanation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConstraintExplanation {
    pub caused_by_rules: Vec<String>,
    pub caused_by_cardinalities: Vec<AttributeId>,
}

/// Caller decisions that take part in an explanation, with an optional way
/// out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionExplanation {
    pub caused_by_decisions: Vec<AttributeDecision>,
    pub solution: Option<ExplainSolution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplainAnswer {
    pub constraint_explanations: Vec<ConstraintExplanation>,
    pub decision_explanations: Vec<DecisionExplanation>,
}

impl ExplainAnswer {
    /// Candidate solutions proposed by the decision explanations.
    pub fn solutions(&self) -> Vec<ExplainSolution> {
        self.decision_explanations
            .iter()
            .filter_map(|e| e.solution.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::SetManyMode;

    #[test]
    fn test_solutions_skip_explanations_without_solution() {
        let solution = ExplainSolution {
            decisions: vec![AttributeDecision::Boolean {
                attribute_id: AttributeId::new("A"),
                state: None,
            }],
            mode: SetManyMode::KeepExistingDecisions,
        };
        let answer = ExplainAnswer {
            constraint_explanations: vec![],
            decision_explanations: vec![
                DecisionExplanation {
                    caused_by_decisions: vec![],
                    solution: None,
                },
                DecisionExplanation {
                    caused_by_decisions: vec![],
                    solution: Some(solution.clone()),
                },
            ],
        };
        assert_eq!(answer.solutions(), vec![solution]);
    }

    #[test]
    fn test_question_serialization() {
        let question = ExplainQuestion::WhyIsNotSatisfied {
            subject: ExplainSubject::Attribute(AttributeId::new("Color")),
            answer_type: ExplainAnswerType::Causes,
        };
        let json = serde_json::to_value(&question).unwrap();
        assert_eq!(json["question"], "WhyIsNotSatisfied");
        assert_eq!(json["subject"]["type"], "Attribute");
        assert_eq!(json["subject"]["attributeId"]["localId"], "Color");
        assert_eq!(json["answerType"], "Causes");
    }
}
