//! Parsing of REPL input into commands and decisions.

use std::path::PathBuf;

use configurator_core::{
    Attribute, AttributeDecision, AttributeId, ChoiceValueDecisionState, ComponentDecisionState,
};

/// A parsed REPL command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Show,
    Decide {
        attribute: AttributeId,
        value: String,
    },
    Clear {
        attribute: AttributeId,
        value: Option<String>,
    },
    Explain {
        attribute: Option<AttributeId>,
    },
    Solutions,
    /// 1-based index into the listed solutions
    Apply(usize),
    Store(PathBuf),
    Restore(PathBuf),
    Context(Vec<(String, String)>),
    Close,
    Quit,
}

/// Parse a `NAME=VALUE` pair.
pub fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", s)),
    }
}

fn parse_attribute(s: &str) -> Result<AttributeId, String> {
    s.parse().map_err(|e| format!("{}", e))
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = parts.split_first() else {
        return Err("empty command".to_string());
    };

    match (command, args) {
        ("help" | "h" | "?", []) => Ok(Command::Help),
        ("show" | "s", []) => Ok(Command::Show),
        ("decide" | "d", [attribute, value]) => Ok(Command::Decide {
            attribute: parse_attribute(attribute)?,
            value: value.to_string(),
        }),
        ("clear", [attribute]) => Ok(Command::Clear {
            attribute: parse_attribute(attribute)?,
            value: None,
        }),
        ("clear", [attribute, value]) => Ok(Command::Clear {
            attribute: parse_attribute(attribute)?,
            value: Some(value.to_string()),
        }),
        ("explain", []) => Ok(Command::Explain { attribute: None }),
        ("explain", [attribute]) => Ok(Command::Explain {
            attribute: Some(parse_attribute(attribute)?),
        }),
        ("solutions", []) => Ok(Command::Solutions),
        ("apply", [index]) => match index.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Command::Apply(n)),
            _ => Err(format!("invalid solution number '{}'", index)),
        },
        ("store", [path]) => Ok(Command::Store(PathBuf::from(path))),
        ("restore", [path]) => Ok(Command::Restore(PathBuf::from(path))),
        ("context", params) if !params.is_empty() => params
            .iter()
            .map(|p| parse_param(p))
            .collect::<Result<Vec<_>, _>>()
            .map(Command::Context),
        ("close", []) => Ok(Command::Close),
        ("quit" | "exit" | "q", []) => Ok(Command::Quit),
        (
            "help" | "h" | "?" | "show" | "s" | "decide" | "d" | "clear" | "explain"
            | "solutions" | "apply" | "store" | "restore" | "context" | "close" | "quit"
            | "exit" | "q",
            _,
        ) => Err(format!(
            "wrong arguments for '{}'. Type help for usage.",
            command
        )),
        _ => Err(format!(
            "Unknown command: {}. Type help for available commands.",
            command
        )),
    }
}

/// Decision setting `value` on `attribute`.
///
/// Choice values are included by name; prefix the name with `!` to exclude.
pub fn decision_for(attribute: &Attribute, value: &str) -> Result<AttributeDecision, String> {
    let attribute_id = attribute.id().clone();
    match attribute {
        Attribute::Boolean(_) => {
            let state = match value {
                "true" | "yes" | "on" => true,
                "false" | "no" | "off" => false,
                _ => return Err(format!("expected true or false, got '{}'", value)),
            };
            Ok(AttributeDecision::Boolean {
                attribute_id,
                state: Some(state),
            })
        }
        Attribute::Numeric(a) => {
            let state: f64 = value
                .parse()
                .map_err(|_| format!("expected a number, got '{}'", value))?;
            if !a.range.contains(state) {
                return Err(format!(
                    "{} is outside [{}, {}]",
                    state, a.range.min, a.range.max
                ));
            }
            Ok(AttributeDecision::Numeric {
                attribute_id,
                state: Some(state),
            })
        }
        Attribute::Choice(a) => {
            let (choice_value_id, state) = match value.strip_prefix('!') {
                Some(id) => (id, ChoiceValueDecisionState::Excluded),
                None => (value, ChoiceValueDecisionState::Included),
            };
            if !a.values.contains_key(choice_value_id) {
                return Err(format!(
                    "'{}' is not a value of {}",
                    choice_value_id, attribute_id
                ));
            }
            Ok(AttributeDecision::ChoiceValue {
                attribute_id,
                choice_value_id: choice_value_id.to_string(),
                state: Some(state),
            })
        }
        Attribute::Component(_) => {
            let state = match value {
                "included" | "include" | "in" => ComponentDecisionState::Included,
                "excluded" | "exclude" | "out" => ComponentDecisionState::Excluded,
                _ => return Err(format!("expected included or excluded, got '{}'", value)),
            };
            Ok(AttributeDecision::Component {
                attribute_id,
                state: Some(state),
            })
        }
    }
}

/// Decision clearing `attribute`, or one of its values for choices.
pub fn clear_for(attribute: &Attribute, value: Option<&str>) -> Result<AttributeDecision, String> {
    let attribute_id = attribute.id().clone();
    match (attribute, value) {
        (Attribute::Choice(a), Some(choice_value_id)) => {
            if !a.values.contains_key(choice_value_id) {
                return Err(format!(
                    "'{}' is not a value of {}",
                    choice_value_id, attribute_id
                ));
            }
            Ok(AttributeDecision::ChoiceValue {
                attribute_id,
                choice_value_id: choice_value_id.to_string(),
                state: None,
            })
        }
        (Attribute::Choice(_), None) => Err("choice attributes are cleared per value".to_string()),
        (_, Some(_)) => Err(format!("{} has no values to clear", attribute_id)),
        (Attribute::Boolean(_), None) => Ok(AttributeDecision::Boolean {
            attribute_id,
            state: None,
        }),
        (Attribute::Numeric(_), None) => Ok(AttributeDecision::Numeric {
            attribute_id,
            state: None,
        }),
        (Attribute::Component(_), None) => Ok(AttributeDecision::Component {
            attribute_id,
            state: None,
        }),
    }
}
