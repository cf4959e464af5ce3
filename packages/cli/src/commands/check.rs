use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tessera_evaluator::{AppDefinition, CommandRegistry, Node};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// App definition (JSON)
    pub app: PathBuf,
}

pub fn check(args: CheckArgs) -> Result<()> {
    let definition = AppDefinition::load(&args.app)?;
    definition.validate()?;

    println!(
        "{} {}",
        "✅".green(),
        args.app.display().to_string().bold()
    );
    println!("   main screen: {}", definition.main_screen_id.cyan());
    println!("   screens: {}", definition.screens.len());
    println!(
        "   initial variables: {}",
        definition.initial_context_variables.len()
    );

    let commands = CommandRegistry::with_builtins();
    let unknown = unknown_commands(&definition, &commands);
    for (screen, name) in &unknown {
        println!(
            "   {} screen '{}' uses unregistered command '{}'",
            "⚠️".yellow(),
            screen,
            name
        );
    }

    Ok(())
}

/// Top-level commands in each onAppear event that no built-in handles
fn unknown_commands(definition: &AppDefinition, commands: &CommandRegistry) -> Vec<(String, String)> {
    let mut unknown = Vec::new();
    for screen in &definition.screens {
        let Some(event) = &screen.on_appear else {
            continue;
        };
        let entries: Vec<&Node> = match event {
            Node::Sequence(items) => items.iter().collect(),
            other => vec![other],
        };
        for entry in entries {
            if let Node::Mapping(map) = entry {
                if map.len() == 1 {
                    if let Some(name) = map.keys().next() {
                        if !commands.contains(name) {
                            unknown.push((screen.id.clone(), name.clone()));
                        }
                    }
                }
            }
        }
    }
    unknown
}
