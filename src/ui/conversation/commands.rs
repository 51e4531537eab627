use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Show or change the backend endpoint
    Api,
    /// Exit the application
    Bye,
    /// Show help
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Api => "show the endpoint, or save a new one and reload (/api <url>)",
            SlashCommand::Bye => "exit the application",
            SlashCommand::Help => "show available commands",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input. Unknown commands are not
/// commands, so they go to the backend as ordinary text.
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let tail: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "quit" | "exit" => Some(SlashCommand::Bye),
        "endpoint" => Some(SlashCommand::Api),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if tail.is_empty() {
        None
    } else {
        Some(tail.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("/{} - {}\n", command.command(), command.description()));
    }

    help.push_str("Aliases: /q for /bye, /endpoint for /api.\n");
    help.push_str("Start with // to send a query that begins with /.\n");
    help.push_str("Keys: Tab switches to the endpoint field, PageUp/PageDown scroll, Esc quits.");

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!(
            parse_slash_command("/api http://rag:8000"),
            Some(ParsedCommand {
                command: SlashCommand::Api,
                argument: Some("http://rag:8000".to_string()),
            })
        );
        assert_eq!(
            parse_slash_command("/HELP").map(|c| c.command),
            Some(SlashCommand::Help)
        );
        assert_eq!(
            parse_slash_command("/q").map(|c| c.command),
            Some(SlashCommand::Bye)
        );
    }

    #[test]
    fn non_commands_are_left_alone() {
        assert_eq!(parse_slash_command("what is /api?"), None);
        assert_eq!(parse_slash_command("/usr/bin is where?"), None);
        assert_eq!(parse_slash_command("/"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for command in SlashCommand::iter() {
            assert!(help.contains(&format!("/{}", command.command())));
        }
        assert!(help.contains("//"));
    }
}
