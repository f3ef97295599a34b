//! Interactive exploration of a live configuration session.

use std::path::Path;
use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info, warn};

use configurator_client::HttpTransport;
use configurator_core::error::format_failure_with_suggestion;
use configurator_core::{
    Config, Configuration, ConfigurationModelSource, ExplainAnswerType, ExplainQuestion,
    ExplainSubject, Failure, SessionContext,
};
use configurator_session::{ConfigurationSession, SessionBuilder, StoredConfiguration};

use super::input::{clear_for, decision_for, parse_command, Command};
use super::render::{render_answer, render_configuration, render_decision, render_solutions};
use crate::ExploreArgs;

/// Result of command execution.
pub enum CommandResult {
    /// Continue the REPL loop
    Continue,
    /// Exit the REPL
    Exit,
    /// An error occurred
    Error(String),
}

impl From<Failure> for CommandResult {
    fn from(failure: Failure) -> Self {
        CommandResult::Error(format_failure_with_suggestion(&failure))
    }
}

/// Run the interactive REPL.
pub async fn run(args: ExploreArgs, config: &Config) -> anyhow::Result<()> {
    let transport = HttpTransport::from_config(config)?;
    info!(
        base_url = transport.base_url(),
        lifetime = transport.lifetime_name(),
        "Connecting to engine"
    );

    let context = args.params.into_iter().fold(
        SessionContext::new(ConfigurationModelSource::channel(
            args.deployment,
            args.channel,
        )),
        |context, (name, value)| context.with_usage_rule_parameter(name, value),
    );

    let session = SessionBuilder::new(Arc::new(transport), context)
        .with_retry(config.retry.clone())
        .on_configuration_changed(Arc::new(|configuration: Arc<Configuration>| {
            debug!(
                attributes = configuration.len(),
                satisfied = configuration.is_satisfied,
                "Configuration changed"
            );
        }))
        .connect()
        .await
        .map_err(|f| anyhow::anyhow!(format_failure_with_suggestion(&f)))?;

    println!("{}", render_configuration(&session.configuration()));
    println!("Type help for available commands.\n");

    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline("configurator> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                let result = match parse_command(line) {
                    Ok(command) => execute(command, session.as_ref()).await,
                    Err(e) => CommandResult::Error(e),
                };
                match result {
                    CommandResult::Continue => {}
                    CommandResult::Exit => break,
                    CommandResult::Error(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Err(failure) = session.close().await {
        warn!("Failed to close session: {}", failure);
    }
    println!("Goodbye!");
    Ok(())
}

/// Execute one command against the session.
pub async fn execute(command: Command, session: &dyn ConfigurationSession) -> CommandResult {
    match command {
        Command::Help => {
            print_help();
        }
        Command::Show => {
            print!("{}", render_configuration(&session.configuration()));
        }
        Command::Decide { attribute, value } => {
            let configuration = session.configuration();
            let Some(target) = configuration.attribute(&attribute) else {
                return Failure::AttributeNotFound {
                    attribute_id: attribute,
                }
                .into();
            };
            let decision = match decision_for(target, &value) {
                Ok(decision) => decision,
                Err(e) => return CommandResult::Error(e),
            };
            if let Err(failure) = session.make_decision(&decision).await {
                return failure.into();
            }
            println!("Set {}", render_decision(&decision));
        }
        Command::Clear { attribute, value } => {
            let configuration = session.configuration();
            let Some(target) = configuration.attribute(&attribute) else {
                return Failure::AttributeNotFound {
                    attribute_id: attribute,
                }
                .into();
            };
            let decision = match clear_for(target, value.as_deref()) {
                Ok(decision) => decision,
                Err(e) => return CommandResult::Error(e),
            };
            if let Err(failure) = session.make_decision(&decision).await {
                return failure.into();
            }
            println!("Cleared {}", decision.attribute_id());
        }
        Command::Explain { attribute } => {
            let subject = match attribute {
                Some(id) => ExplainSubject::Attribute(id),
                None => ExplainSubject::Configuration,
            };
            let question = ExplainQuestion::WhyIsNotSatisfied {
                subject,
                answer_type: ExplainAnswerType::All,
            };
            match session.explain(&question).await {
                Ok(answer) => {
                    print!("{}", render_answer(&answer));
                    print!("{}", render_solutions(&session.solutions()));
                }
                Err(failure) => return failure.into(),
            }
        }
        Command::Solutions => {
            print!("{}", render_solutions(&session.solutions()));
        }
        Command::Apply(n) => {
            let solutions = session.solutions();
            let Some(solution) = solutions.get(n - 1) else {
                return CommandResult::Error(format!(
                    "no solution {} ({} available)",
                    n,
                    solutions.len()
                ));
            };
            match session.apply_solution(solution).await {
                Ok(result) => {
                    println!("Applied solution {}", n);
                    for decision in &result.rejected_decisions {
                        println!("  rejected: {}", render_decision(decision));
                    }
                }
                Err(failure) => return failure.into(),
            }
        }
        Command::Store(path) => {
            if let Err(e) = store(&path, &session.configuration()) {
                return CommandResult::Error(format!("{:#}", e));
            }
            println!("Stored to {}", path.display());
        }
        Command::Restore(path) => {
            let stored = match load(&path) {
                Ok(stored) => stored,
                Err(e) => return CommandResult::Error(format!("{:#}", e)),
            };
            if let Err(failure) = session.restore_configuration(&stored).await {
                return failure.into();
            }
            println!(
                "Restored {} decisions from {}",
                stored.explicit_decisions.len(),
                path.display()
            );
        }
        Command::Context(params) => {
            let mut context = session.session_context();
            for (name, value) in params {
                if value.is_empty() {
                    context.usage_rule_parameters.remove(&name);
                } else {
                    context.usage_rule_parameters.insert(name, value);
                }
            }
            if let Err(failure) = session.set_session_context(&context).await {
                return failure.into();
            }
            println!("Context switched");
        }
        Command::Close => {
            if let Err(failure) = session.close().await {
                return failure.into();
            }
            println!("Session closed (the next command opens a new one)");
        }
        Command::Quit => return CommandResult::Exit,
    }
    CommandResult::Continue
}

/// Write the explicit decisions of `configuration` to `path`.
fn store(path: &Path, configuration: &Configuration) -> anyhow::Result<()> {
    let json = StoredConfiguration::from_configuration(configuration).to_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

fn load(path: &Path) -> anyhow::Result<StoredConfiguration> {
    let json = std::fs::read_to_string(path)?;
    Ok(StoredConfiguration::from_json(&json)?)
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  show                     Show the configuration");
    println!("  decide <attr> <value>    Decide an attribute (choice: <value> or !<value>)");
    println!("  clear <attr> [value]     Clear a decision");
    println!("  explain [attr]           Explain why something is not satisfied");
    println!("  solutions                List the current solutions");
    println!("  apply <n>                Apply solution n");
    println!("  store <file>             Store explicit decisions to a file");
    println!("  restore <file>           Restore explicit decisions from a file");
    println!("  context <name=value>...  Change usage rule parameters (empty value removes)");
    println!("  close                    Close the remote session");
    println!("  quit                     Exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    use configurator_core::{Attribute, AttributeId, BooleanAttribute, Decision};

    fn configuration() -> Configuration {
        let decided = Attribute::Boolean(BooleanAttribute {
            id: AttributeId::new("Sunroof"),
            is_satisfied: true,
            can_contribute_to_configuration_satisfaction: true,
            possible_decision_states: vec![true, false],
            decision: Some(Decision::explicit(true)),
        });
        let derived = Attribute::Boolean(BooleanAttribute {
            id: AttributeId::new("Roofbox"),
            is_satisfied: true,
            can_contribute_to_configuration_satisfaction: true,
            possible_decision_states: vec![false],
            decision: Some(Decision::implicit(false)),
        });
        Configuration {
            is_satisfied: true,
            attributes: [decided, derived]
                .into_iter()
                .map(|a| (a.id().clone(), a))
                .collect(),
        }
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car.json");

        store(&path, &configuration()).unwrap();
        let stored = load(&path).unwrap();

        assert_eq!(stored.explicit_decisions.len(), 1);
        assert_eq!(
            stored.explicit_decisions[0].attribute_id(),
            &AttributeId::new("Sunroof")
        );
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        std::fs::write(&path, r#"{"schemaVersion": 99, "explicitDecisions": []}"#).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported stored configuration version 99"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("missing.json")).is_err());
    }
}
