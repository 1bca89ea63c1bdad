//! Filter and settings subcommands. Everything here is a thin read-modify-write
//! over the settings store.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chatvoice_core::{
    validate_regex, Command, CommandOptions, CommandRule, FilterId, FilterRule, FilterTarget,
    NewFilter, PatternRule, SpeechTemplate, TextFilter, TtsRate, TtsVoice, TtsVolume,
};
use chatvoice_engine::{
    load, set_rate, set_speech_template, set_voice, set_volume, toggle_enabled, FilterRepository,
    SettingsStore,
};
use clap::{Args, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CommandName {
    Mute,
    Notify,
    End,
}

impl From<CommandName> for Command {
    fn from(name: CommandName) -> Self {
        match name {
            CommandName::Mute => Command::Mute,
            CommandName::Notify => Command::Notify,
            CommandName::End => Command::End,
        }
    }
}

/// Where a new filter applies.
#[derive(Debug, Args)]
pub(crate) struct TargetArgs {
    /// Apply to one extracted field instead of the formatted sentence.
    #[arg(long)]
    pub field: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Add the filter disabled.
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum FilterCommand {
    /// Print the stored filters in evaluation order.
    List,
    /// Add a replacement filter.
    AddPattern {
        pattern: String,
        #[arg(default_value = "")]
        replacement: String,
        #[arg(long)]
        regex: bool,
        /// Extra regex flags (m, s, x).
        #[arg(long)]
        flags: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Add a command filter; without a pattern it always fires.
    AddCommand {
        command: CommandName,
        pattern: Option<String>,
        #[arg(long)]
        regex: bool,
        /// Fire when the pattern does not match.
        #[arg(long)]
        not: bool,
        #[arg(long)]
        silent: bool,
        #[command(flatten)]
        target: TargetArgs,
    },
    Remove { id: FilterId },
    /// Move a filter to the position of another.
    Move { id: FilterId, to: FilterId },
    Enable { id: FilterId },
    Disable { id: FilterId },
    /// Write the filter list as JSON to a file, or stdout.
    Export { path: Option<std::path::PathBuf> },
    /// Replace the filter list with the contents of a JSON file.
    Import { path: std::path::PathBuf },
}

pub(crate) fn run_filter_command(
    store: Arc<dyn SettingsStore>,
    command: FilterCommand,
) -> anyhow::Result<()> {
    let repository = FilterRepository::new(store);
    match command {
        FilterCommand::List => {
            let collection = repository.collection();
            if collection.filters.is_empty() {
                println!("No filters.");
            }
            for filter in &collection.filters {
                println!("{}", describe_filter(filter));
            }
        }
        FilterCommand::AddPattern {
            pattern,
            replacement,
            regex,
            flags,
            target,
        } => {
            if regex {
                check_regex(&pattern)?;
            }
            let rule = FilterRule::Pattern(PatternRule {
                is_regex: regex,
                pattern,
                replacement,
                flags,
            });
            let added = repository.add(new_filter(target, rule))?;
            println!("Added {}", describe_filter(&added));
        }
        FilterCommand::AddCommand {
            command,
            pattern,
            regex,
            not,
            silent,
            target,
        } => {
            if let (true, Some(pattern)) = (regex, pattern.as_deref()) {
                check_regex(pattern)?;
            }
            let rule = FilterRule::Command(CommandRule {
                command: command.into(),
                is_regex: regex,
                pattern,
                options: CommandOptions {
                    is_not: not,
                    silent,
                },
            });
            let added = repository.add(new_filter(target, rule))?;
            println!("Added {}", describe_filter(&added));
        }
        FilterCommand::Remove { id } => {
            let removed = repository.remove(id)?;
            println!("Removed {}", describe_filter(&removed));
        }
        FilterCommand::Move { id, to } => repository.reorder(id, to)?,
        FilterCommand::Enable { id } => repository.set_enabled(id, true)?,
        FilterCommand::Disable { id } => repository.set_enabled(id, false)?,
        FilterCommand::Export { path } => {
            let json = repository.export_json();
            match path {
                Some(path) => fs::write(&path, json).with_context(|| format!("writing {:?}", path))?,
                None => println!("{json}"),
            }
        }
        FilterCommand::Import { path } => {
            let json = read_text(&path)?;
            let count = repository.import_json(&json)?;
            println!("Imported {count} filters");
        }
    }
    Ok(())
}

#[derive(Debug, Subcommand)]
pub(crate) enum SettingsCommand {
    /// Show every stored setting.
    Show,
    /// Flip the global speech switch.
    Toggle,
    /// Set the speech template, or reset it to the default.
    Template { template: Option<String> },
    Rate { rate: f32 },
    Volume { volume: f32 },
    /// Set the voice URI, or go back to the system default.
    Voice { uri: Option<String> },
}

pub(crate) fn run_settings_command(
    store: &dyn SettingsStore,
    command: SettingsCommand,
) -> anyhow::Result<()> {
    match command {
        SettingsCommand::Show => {
            let enabled = load::<chatvoice_core::ExtensionEnabled>(store).enabled;
            println!("enabled:  {enabled}");
            println!("template: {}", load::<SpeechTemplate>(store).effective());
            println!("rate:     {}", load::<TtsRate>(store).rate);
            println!("volume:   {}", load::<TtsVolume>(store).volume);
            let voice = load::<TtsVoice>(store).uri;
            println!("voice:    {}", voice.as_deref().unwrap_or("(default)"));
        }
        SettingsCommand::Toggle => {
            let enabled = toggle_enabled(store)?;
            println!("Speech {}", if enabled { "enabled" } else { "disabled" });
        }
        SettingsCommand::Template { template } => set_speech_template(store, template)?,
        SettingsCommand::Rate { rate } => {
            let stored = set_rate(store, rate)?;
            println!("Rate set to {}", stored.rate);
        }
        SettingsCommand::Volume { volume } => {
            let stored = set_volume(store, volume)?;
            println!("Volume set to {}", stored.volume);
        }
        SettingsCommand::Voice { uri } => set_voice(store, uri)?,
    }
    Ok(())
}

fn new_filter(target: TargetArgs, rule: FilterRule) -> NewFilter {
    NewFilter {
        enabled: !target.disabled,
        target: if target.field.is_some() {
            FilterTarget::Field
        } else {
            FilterTarget::Output
        },
        field_name: target.field,
        description: target.description,
        rule,
    }
}

fn check_regex(pattern: &str) -> anyhow::Result<()> {
    if let Some(message) = validate_regex(pattern) {
        bail!("invalid regular expression {pattern:?}: {message}");
    }
    Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {:?}", path))?;
    Ok(chatvoice_engine::decode_page(&bytes)?.html)
}

/// One-line summary used by `filters list`.
pub(crate) fn describe_filter(filter: &TextFilter) -> String {
    let state = if filter.enabled { " " } else { "x" };
    let scope = match (&filter.target, &filter.field_name) {
        (FilterTarget::Field, Some(field)) => format!("field:{field}"),
        _ => "output".to_string(),
    };
    let rule = match &filter.rule {
        FilterRule::Pattern(rule) => {
            let kind = if rule.is_regex { "regex" } else { "text" };
            format!("{kind} {:?} -> {:?}", rule.pattern, rule.replacement)
        }
        FilterRule::Command(rule) => {
            let name: String = rule.command.clone().into();
            let negated = if rule.options.is_not { "not " } else { "" };
            match &rule.pattern {
                Some(pattern) => format!("{name} when {negated}{pattern:?}"),
                None => name,
            }
        }
    };
    let description = filter
        .description
        .as_deref()
        .map(|d| format!("  # {d}"))
        .unwrap_or_default();
    format!("[{state}] {:>3} {scope:<12} {rule}{description}", filter.id)
}
