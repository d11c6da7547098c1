//! Parsing of interactive input lines into chat commands.
//!
//! ```rust
//! use rchat::{Command, parse_command};
//!
//! assert_eq!(
//!     parse_command("@folders", "papers"),
//!     Command::Resource("papers://folders".to_string())
//! );
//! assert_eq!(parse_command("QUIT", "papers"), Command::Quit);
//! ```

use rtooling::{PromptArguments, parse_prompt_args, split_scheme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free text for the model.
    Query(String),
    /// `@name`, resolved to a resource URI.
    Resource(String),
    ListPrompts,
    Prompt {
        name: String,
        arguments: PromptArguments,
    },
    ListTools,
    ListResources,
    Help,
    Quit,
    Empty,
    /// Malformed or unknown command, with a hint for the user.
    Invalid(String),
}

pub const HELP_TEXT: &str = "\
Commands:
  <text>                   ask the model (tools are called as needed)
  @folders                 list available topic folders
  @<topic>                 read the resource for a topic
  /prompts                 list server prompts
  /prompt <name> k=v ...   run a server prompt
  /tools                   list tools
  /resources               list resources and templates
  /help                    show this help
  quit                     exit";

/// Classifies one input line. `resource_scheme` expands `@name` shorthands.
pub fn parse_command(line: &str, resource_scheme: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if line.eq_ignore_ascii_case("quit") {
        return Command::Quit;
    }

    if let Some(target) = line.strip_prefix('@') {
        return parse_resource(target, resource_scheme);
    }

    if let Some(rest) = line.strip_prefix('/') {
        return parse_slash(rest);
    }

    Command::Query(line.to_string())
}

fn parse_resource(target: &str, resource_scheme: &str) -> Command {
    let target = target.trim();
    if target.is_empty() {
        return Command::Invalid("usage: @folders or @<topic>".to_string());
    }
    // A full URI after `@` is used as-is.
    if split_scheme(target).is_some() {
        return Command::Resource(target.to_string());
    }
    Command::Resource(format!("{resource_scheme}://{target}"))
}

fn parse_slash(rest: &str) -> Command {
    let (command, tail) = match rest.split_once(char::is_whitespace) {
        Some((command, tail)) => (command, tail.trim()),
        None => (rest, ""),
    };

    match command.to_ascii_lowercase().as_str() {
        "prompts" => Command::ListPrompts,
        "tools" => Command::ListTools,
        "resources" => Command::ListResources,
        "help" => Command::Help,
        "prompt" => {
            let (name, args) = match tail.split_once(char::is_whitespace) {
                Some((name, args)) => (name, args),
                None => (tail, ""),
            };
            if name.is_empty() {
                return Command::Invalid("usage: /prompt <name> <arg1=value1> ...".to_string());
            }
            Command::Prompt {
                name: name.to_string(),
                arguments: parse_prompt_args(args),
            }
        }
        other => Command::Invalid(format!("unknown command '/{other}'; type /help")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_query_and_blank_is_empty() {
        assert_eq!(
            parse_command("  find papers on agents ", "papers"),
            Command::Query("find papers on agents".to_string())
        );
        assert_eq!(parse_command("   ", "papers"), Command::Empty);
    }

    #[test]
    fn at_shorthands_expand_with_the_configured_scheme() {
        assert_eq!(
            parse_command("@graph_neural_networks", "papers"),
            Command::Resource("papers://graph_neural_networks".to_string())
        );
        assert_eq!(
            parse_command("@notes://today", "papers"),
            Command::Resource("notes://today".to_string())
        );
        assert!(matches!(parse_command("@", "papers"), Command::Invalid(_)));
    }

    #[test]
    fn multi_word_topics_keep_every_word() {
        assert_eq!(
            parse_command("@graph neural networks", "papers"),
            Command::Resource("papers://graph neural networks".to_string())
        );
        assert_eq!(
            parse_command("@  machine learning  ", "papers"),
            Command::Resource("papers://machine learning".to_string())
        );
    }

    #[test]
    fn prompt_command_parses_name_and_arguments() {
        let command = parse_command(
            r#"/prompt generate_search_prompt topic="graph neural networks" num_papers=3"#,
            "papers",
        );

        let Command::Prompt { name, arguments } = command else {
            panic!("expected prompt command");
        };
        assert_eq!(name, "generate_search_prompt");
        assert_eq!(
            arguments.get("topic").map(String::as_str),
            Some("graph neural networks")
        );
        assert_eq!(arguments.get("num_papers").map(String::as_str), Some("3"));
    }

    #[test]
    fn listing_and_unknown_commands() {
        assert_eq!(parse_command("/prompts", "papers"), Command::ListPrompts);
        assert_eq!(parse_command("/TOOLS", "papers"), Command::ListTools);
        assert_eq!(parse_command("/resources", "papers"), Command::ListResources);
        assert_eq!(parse_command("/help", "papers"), Command::Help);
        assert!(matches!(parse_command("/prompt", "papers"), Command::Invalid(_)));
        assert!(matches!(parse_command("/frobnicate", "papers"), Command::Invalid(_)));
    }
}
