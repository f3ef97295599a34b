//! Text rendering of configurations and explanations.

use std::fmt::Write;

use configurator_core::{
    Attribute, AttributeDecision, Configuration, Decision, ExplainAnswer, ExplainSolution,
};

fn decision_text<T: std::fmt::Debug>(decision: &Option<Decision<T>>) -> String {
    match decision {
        Some(d) if d.is_explicit() => format!("{:?}", d.state),
        Some(d) => format!("{:?} (implicit)", d.state),
        None => "-".to_string(),
    }
}

fn describe(attribute: &Attribute) -> String {
    match attribute {
        Attribute::Boolean(a) => format!(
            "{}  possible: {:?}",
            decision_text(&a.decision),
            a.possible_decision_states
        ),
        Attribute::Numeric(a) => format!(
            "{}  range: [{}, {}]",
            decision_text(&a.decision),
            a.range.min,
            a.range.max
        ),
        Attribute::Choice(a) => {
            let values: Vec<String> = a
                .values
                .values()
                .map(|v| match v.decision {
                    Some(d) if d.is_explicit() => format!("{}={:?}", v.id, d.state),
                    Some(d) => format!("{}={:?}*", v.id, d.state),
                    None => v.id.clone(),
                })
                .collect();
            format!(
                "[{}]  cardinality: {}..{}",
                values.join(", "),
                a.cardinality.lower_bound,
                a.cardinality.upper_bound
            )
        }
        Attribute::Component(a) => format!(
            "{}  possible: {:?}",
            decision_text(&a.decision),
            a.possible_decision_states
        ),
    }
}

pub fn render_configuration(configuration: &Configuration) -> String {
    let mut out = String::new();
    let status = if configuration.is_satisfied {
        "satisfied"
    } else {
        "not satisfied"
    };
    let _ = writeln!(
        out,
        "Configuration ({}, {} attributes)",
        status,
        configuration.len()
    );

    for attribute in configuration.attributes.values() {
        let marker = if attribute.is_satisfied() { ' ' } else { '!' };
        let _ = writeln!(
            out,
            "{} {:<28} {:<9} {}",
            marker,
            attribute.id().to_string(),
            attribute.kind_name(),
            describe(attribute)
        );
    }
    out
}

pub fn render_decision(decision: &AttributeDecision) -> String {
    match decision {
        AttributeDecision::Boolean {
            attribute_id,
            state,
        } => format!("{} = {:?}", attribute_id, state),
        AttributeDecision::Numeric {
            attribute_id,
            state,
        } => format!("{} = {:?}", attribute_id, state),
        AttributeDecision::ChoiceValue {
            attribute_id,
            choice_value_id,
            state,
        } => format!("{}.{} = {:?}", attribute_id, choice_value_id, state),
        AttributeDecision::Component {
            attribute_id,
            state,
        } => format!("{} = {:?}", attribute_id, state),
    }
}

pub fn render_solutions(solutions: &[ExplainSolution]) -> String {
    if solutions.is_empty() {
        return "No solutions available.\n".to_string();
    }

    let mut out = String::new();
    for (i, solution) in solutions.iter().enumerate() {
        let _ = writeln!(out, "{}. ({:?})", i + 1, solution.mode);
        for decision in &solution.decisions {
            let _ = writeln!(out, "     {}", render_decision(decision));
        }
    }
    out
}

pub fn render_answer(answer: &ExplainAnswer) -> String {
    let mut out = String::new();

    for explanation in &answer.constraint_explanations {
        if !explanation.caused_by_rules.is_empty() {
            let _ = writeln!(out, "Rules: {}", explanation.caused_by_rules.join(", "));
        }
        if !explanation.caused_by_cardinalities.is_empty() {
            let ids: Vec<String> = explanation
                .caused_by_cardinalities
                .iter()
                .map(|id| id.to_string())
                .collect();
            let _ = writeln!(out, "Cardinalities: {}", ids.join(", "));
        }
    }

    for explanation in &answer.decision_explanations {
        let causes: Vec<String> = explanation
            .caused_by_decisions
            .iter()
            .map(render_decision)
            .collect();
        let _ = writeln!(out, "Caused by: {}", causes.join(", "));
    }

    if out.is_empty() {
        out.push_str("Nothing to explain.\n");
    }
    out
}
