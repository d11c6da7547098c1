//! Interactive command dispatch.
//!
//! Each input line is parsed into a [`Command`] and its output written to the
//! supplied console. Errors are printed with a `❌` marker and never end the
//! session; only `quit` does.

use std::io::{self, Write};

use rchat::{ChatError, ChatService, ChatSession, ChatTurnRequest, Command, HELP_TEXT, parse_command};

use crate::runtime::RelayRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub const BANNER: &str = "\
MCP Chatbot Started!
Type your queries or 'quit' to exit.
Use @folders to see available topics
Use @<topic> to search papers in that topic
Use /prompts to list available prompts
Use /prompt <name> <arg1=value1> to execute a prompt
Use /help for all commands";

pub struct Repl {
    chat: ChatService,
    session: ChatSession,
    resource_scheme: String,
}

impl Repl {
    pub fn new(chat: ChatService, session: ChatSession, resource_scheme: impl Into<String>) -> Self {
        Self {
            chat,
            session,
            resource_scheme: resource_scheme.into(),
        }
    }

    pub fn from_runtime(runtime: &RelayRuntime) -> Self {
        Self::new(
            runtime.chat.clone(),
            runtime.session.clone(),
            runtime.resource_scheme.clone(),
        )
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub async fn handle_line<W: Write>(&self, line: &str, out: &mut W) -> io::Result<Flow> {
        let command = parse_command(line, &self.resource_scheme);
        self.dispatch(command, out).await
    }

    pub async fn dispatch<W: Write>(&self, command: Command, out: &mut W) -> io::Result<Flow> {
        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Empty => {}
            Command::Help => writeln!(out, "{HELP_TEXT}")?,
            Command::Invalid(hint) => writeln!(out, "❌ {hint}")?,
            Command::Query(query) => {
                let request = ChatTurnRequest::new(self.session.clone(), query);
                match self.chat.run_turn(request).await {
                    Ok(result) => writeln!(out, "{}", result.final_answer)?,
                    Err(error) => print_error(out, &error)?,
                }
            }
            Command::Resource(uri) => {
                writeln!(out, "📄 Accessing resource: {uri}")?;
                match self.chat.get_resource(&uri).await {
                    Ok(text) => writeln!(out, "{text}")?,
                    Err(error) => print_error(out, &error)?,
                }
            }
            Command::ListPrompts => self.list_prompts(out)?,
            Command::Prompt { name, arguments } => {
                writeln!(out, "🤖 Executing prompt: '{name}'...")?;
                match self
                    .chat
                    .execute_prompt(self.session.clone(), &name, arguments)
                    .await
                {
                    Ok(run) => {
                        writeln!(
                            out,
                            "\n--- Generated Prompt ---\n{}\n--- End Prompt ---\n",
                            run.rendered
                        )?;
                        writeln!(out, "{}", run.turn.final_answer)?;
                    }
                    Err(error) => print_error(out, &error)?,
                }
            }
            Command::ListTools => {
                let tools = self.chat.list_tools();
                if tools.is_empty() {
                    writeln!(out, "No tools available.")?;
                } else {
                    writeln!(out, "\nAvailable tools:")?;
                    for tool in tools {
                        writeln!(out, "- {}: {}", tool.name, tool.description)?;
                    }
                }
            }
            Command::ListResources => {
                let resources = self.chat.list_resources();
                if resources.is_empty() {
                    writeln!(out, "No resources available.")?;
                } else {
                    writeln!(out, "\nAvailable resources:")?;
                    for resource in resources {
                        match &resource.description {
                            Some(description) => {
                                writeln!(out, "- {} ({}): {description}", resource.uri, resource.name)?
                            }
                            None => writeln!(out, "- {} ({})", resource.uri, resource.name)?,
                        }
                    }
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn list_prompts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let prompts = self.chat.list_prompts();
        if prompts.is_empty() {
            return writeln!(out, "No prompts available.");
        }

        writeln!(out, "\nAvailable prompts:")?;
        for prompt in prompts {
            writeln!(out, "- {}: {}", prompt.name, prompt.description)?;
            if !prompt.arguments.is_empty() {
                writeln!(out, "  Usage: {}", prompt.usage())?;
            }
        }
        Ok(())
    }
}

fn print_error<W: Write>(out: &mut W, error: &ChatError) -> io::Result<()> {
    writeln!(out, "❌ Error: {}", error.message)
}
