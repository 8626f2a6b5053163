use std::collections::HashMap;

use once_cell::sync::Lazy;

pub mod account;
pub mod budget;
pub mod config;
pub mod system;
pub mod transaction;

use crate::cli::context::{CommandResult, ShellContext};

pub type CommandHandler = fn(&mut ShellContext<'_>, &[&str]) -> CommandResult;

#[derive(Clone)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub handler: CommandHandler,
}

impl CommandDefinition {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            handler,
        }
    }
}

pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDefinition>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new(definitions: Vec<CommandDefinition>) -> Self {
        let mut commands = HashMap::new();
        let mut order = Vec::new();
        for definition in definitions {
            order.push(definition.name);
            commands.insert(definition.name, definition);
        }
        Self { commands, order }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.order
            .iter()
            .filter_map(move |name| self.commands.get(name))
    }
}

/// Closest command name within two edits of `name`.
pub fn suggest(name: &str) -> Option<&'static str> {
    registry()
        .iter()
        .map(|definition| (strsim::levenshtein(name, definition.name), definition.name))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

static REGISTRY: Lazy<CommandRegistry> = Lazy::new(|| CommandRegistry::new(all_definitions()));

pub fn registry() -> &'static CommandRegistry {
    &REGISTRY
}

fn all_definitions() -> Vec<CommandDefinition> {
    let mut commands = Vec::new();
    commands.extend(system::definitions());
    commands.extend(config::definitions());
    commands.extend(account::definitions());
    commands.extend(transaction::definitions());
    commands.extend(budget::definitions());
    commands
}
