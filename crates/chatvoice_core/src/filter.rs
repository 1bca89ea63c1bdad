//! Ordered text-filter rules and the engine that evaluates them.
//!
//! Filters run in stored order. Pattern rules rewrite the text; command rules
//! either drop the message (`mute`, `end`) or raise a notification
//! (`notify`). Matching is always case-insensitive.

use chat_logging::{chat_debug, chat_warn};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::ExtractedFields;

pub type FilterId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterTarget {
    /// Applied to one extracted field before formatting.
    Field,
    /// Applied to the formatted sentence.
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFilter {
    pub id: FilterId,
    pub enabled: bool,
    pub target: FilterTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub rule: FilterRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterRule {
    Pattern(PatternRule),
    Command(CommandRule),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRule {
    #[serde(default)]
    pub is_regex: bool,
    pub pattern: String,
    pub replacement: String,
    /// Extra regex flags (`m`, `s`, `x`); `i` and `g` always apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRule {
    pub command: Command,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "CommandOptions::is_default")]
    pub options: CommandOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOptions {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_not: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub silent: bool,
}

impl CommandOptions {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Command names. Names this build does not know are kept verbatim so that
/// stored collections survive a round trip; they evaluate as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Command {
    Mute,
    Notify,
    End,
    Other(String),
}

impl From<String> for Command {
    fn from(name: String) -> Self {
        match name.as_str() {
            "mute" => Command::Mute,
            "notify" => Command::Notify,
            "end" => Command::End,
            _ => Command::Other(name),
        }
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        match command {
            Command::Mute => "mute".to_string(),
            Command::Notify => "notify".to_string(),
            Command::End => "end".to_string(),
            Command::Other(name) => name,
        }
    }
}

/// Result of running a filter list over a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Text(String),
    /// A `mute` or `end` fired; the message must not be spoken.
    Terminated,
}

impl FilterOutcome {
    pub fn into_text(self) -> Option<String> {
        match self {
            FilterOutcome::Text(text) => Some(text),
            FilterOutcome::Terminated => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, FilterOutcome::Terminated)
    }
}

/// Raised by a `notify` command whose condition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub filter_id: FilterId,
    pub field_name: Option<String>,
    /// Field values as extracted, before any filtering.
    pub fields: ExtractedFields,
    /// Text at the point the command ran.
    pub text: String,
    pub silent: bool,
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Clone, Copy, Default)]
pub struct FilterContext<'a> {
    /// Field being processed; `None` for the formatted output.
    pub field_name: Option<&'a str>,
    pub fields: Option<&'a ExtractedFields>,
    pub notifier: Option<&'a dyn NotificationSink>,
}

impl<'a> FilterContext<'a> {
    pub fn for_field(field_name: &'a str) -> Self {
        Self {
            field_name: Some(field_name),
            ..Self::default()
        }
    }
}

enum Step {
    Continue(String),
    Terminate,
}

/// Runs `filters` over `text` in order.
pub fn apply_text_filters(
    text: &str,
    filters: &[TextFilter],
    ctx: &FilterContext<'_>,
) -> FilterOutcome {
    let mut result = text.to_string();

    for filter in filters {
        if !filter.enabled {
            continue;
        }
        if let Some(field_name) = filter.field_name.as_deref() {
            if ctx.field_name != Some(field_name) {
                continue;
            }
        }

        match &filter.rule {
            FilterRule::Pattern(rule) => {
                result = apply_pattern(result, filter.id, rule);
            }
            FilterRule::Command(rule) => match run_command(result, filter, rule, ctx) {
                Step::Continue(text) => result = text,
                Step::Terminate => return FilterOutcome::Terminated,
            },
        }
    }

    FilterOutcome::Text(result)
}

fn apply_pattern(text: String, filter_id: FilterId, rule: &PatternRule) -> String {
    match build_matcher(&rule.pattern, rule.is_regex, rule.flags.as_deref()) {
        Ok(regex) => {
            let replacement = translate_replacement(&rule.replacement, regex.captures_len() - 1);
            regex.replace_all(&text, replacement.as_str()).into_owned()
        }
        Err(err) => {
            chat_warn!("Invalid pattern in filter {}: {}", filter_id, err);
            text
        }
    }
}

fn run_command(
    text: String,
    filter: &TextFilter,
    rule: &CommandRule,
    ctx: &FilterContext<'_>,
) -> Step {
    match &rule.command {
        Command::Mute | Command::End => {
            if condition_holds(&text, filter.id, rule) {
                chat_debug!("Terminated by filter {}", filter.id);
                Step::Terminate
            } else {
                Step::Continue(text)
            }
        }
        Command::Notify => {
            if condition_holds(&text, filter.id, rule) {
                if let Some(notifier) = ctx.notifier {
                    notifier.notify(Notification {
                        filter_id: filter.id,
                        field_name: ctx.field_name.map(str::to_string),
                        fields: ctx.fields.cloned().unwrap_or_default(),
                        text: text.clone(),
                        silent: rule.options.silent,
                    });
                }
            }
            Step::Continue(text)
        }
        Command::Other(name) => {
            chat_warn!("Unknown command in filter {}: {}", filter.id, name);
            Step::Continue(text)
        }
    }
}

/// `match XOR isNot`; a missing pattern never matches, an invalid one never fires.
fn condition_holds(text: &str, filter_id: FilterId, rule: &CommandRule) -> bool {
    let matched = match rule.pattern.as_deref().filter(|p| !p.is_empty()) {
        None => false,
        Some(pattern) => match build_matcher(pattern, rule.is_regex, None) {
            Ok(regex) => regex.is_match(text),
            Err(err) => {
                chat_warn!("Invalid pattern in command filter {}: {}", filter_id, err);
                return false;
            }
        },
    };
    matched != rule.options.is_not
}

/// Case-insensitive matcher; literal patterns are escaped.
pub fn build_matcher(
    pattern: &str,
    is_regex: bool,
    flags: Option<&str>,
) -> Result<Regex, regex::Error> {
    let source = if is_regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };
    let mut builder = RegexBuilder::new(&source);
    builder.case_insensitive(true);
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            _ => {}
        }
    }
    builder.build()
}

/// Returns the compiler message for an invalid pattern, `None` when valid.
pub fn validate_regex(pattern: &str) -> Option<String> {
    Regex::new(pattern).err().map(|err| err.to_string())
}

/// Rewrites `$1`, `$&`, `$<name>` and `$$` replacement syntax into the
/// `${..}` form the regex crate expands. Anything else stays literal.
fn translate_replacement(replacement: &str, group_count: usize) -> String {
    let chars: Vec<char> = replacement.chars().collect();
    let mut out = String::with_capacity(replacement.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '$' {
            out.push(c);
            i += 1;
            continue;
        }
        match chars.get(i + 1).copied() {
            Some('$') => {
                out.push_str("$$");
                i += 2;
            }
            Some('&') => {
                out.push_str("${0}");
                i += 2;
            }
            Some(d1) if d1.is_ascii_digit() => {
                let first = d1 as usize - '0' as usize;
                let two = chars
                    .get(i + 2)
                    .filter(|d2| d2.is_ascii_digit())
                    .map(|d2| first * 10 + (*d2 as usize - '0' as usize))
                    .filter(|n| (1..=group_count).contains(n));
                if let Some(n) = two {
                    out.push_str(&format!("${{{n}}}"));
                    i += 3;
                } else if (1..=group_count).contains(&first) {
                    out.push_str(&format!("${{{first}}}"));
                    i += 2;
                } else {
                    out.push_str("$$");
                    i += 1;
                }
            }
            Some('<') => {
                let close = chars[i + 2..].iter().position(|c| *c == '>');
                match close {
                    Some(len) => {
                        let name: String = chars[i + 2..i + 2 + len].iter().collect();
                        out.push_str(&format!("${{{name}}}"));
                        i += len + 3;
                    }
                    None => {
                        out.push_str("$$");
                        i += 1;
                    }
                }
            }
            _ => {
                out.push_str("$$");
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{translate_replacement, validate_regex};

    #[test]
    fn numbered_groups_are_braced() {
        assert_eq!(translate_replacement("$2 $1", 2), "${2} ${1}");
        assert_eq!(translate_replacement("$1a", 1), "${1}a");
    }

    #[test]
    fn two_digit_group_only_when_it_exists() {
        assert_eq!(translate_replacement("$12", 12), "${12}");
        assert_eq!(translate_replacement("$12", 1), "${1}2");
    }

    #[test]
    fn missing_groups_and_bare_dollars_stay_literal() {
        assert_eq!(translate_replacement("$3", 1), "$$3");
        assert_eq!(translate_replacement("cost: $", 0), "cost: $$");
        assert_eq!(translate_replacement("$$", 0), "$$");
    }

    #[test]
    fn whole_match_and_named_groups() {
        assert_eq!(translate_replacement("[$&]", 0), "[${0}]");
        assert_eq!(translate_replacement("$<word>!", 1), "${word}!");
        assert_eq!(translate_replacement("$<open", 0), "$$<open");
    }

    #[test]
    fn validate_regex_reports_errors() {
        assert!(validate_regex("[a-z").is_some());
        assert!(validate_regex("(\\w+)").is_none());
    }
}
