//! Interactive chat loop.
//!
//! Plain lines are prompts about the current file; lines starting with `/`
//! are commands.

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::{debug, error, warn};

use codecontext_config::mask_secret;
use codecontext_engine::Session;
use codecontext_logging::redact_error;
use codecontext_markdown::Renderer;

use crate::config::Runtime;
use crate::terminal_output::{
    note_error, note_info, note_success, spawn_phase_reporter, stdout_color,
};

const COMMANDS: &[&str] = &["/url", "/key", "/export", "/history", "/help", "/quit"];

const HELP: &str = "\
/url <github-url>   set the file to ask about (no argument shows the current one)
/key <api-key>      use a different API key (no argument restores the default)
/export             save the conversation as a PDF
/history            show the conversation so far
/help               show this help
/quit               leave the chat";

#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Url(Option<&'a str>),
    Key(&'a str),
    Export,
    History,
    Help,
    Quit,
    Unknown(&'a str),
    Prompt(&'a str),
}

/// Classify one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ChatCommand<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(ChatCommand::Prompt(line));
    }

    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let command = match name {
        "/url" => ChatCommand::Url(Some(arg).filter(|a| !a.is_empty())),
        "/key" => ChatCommand::Key(arg),
        "/export" => ChatCommand::Export,
        "/history" => ChatCommand::History,
        "/help" => ChatCommand::Help,
        "/quit" | "/exit" => ChatCommand::Quit,
        other => ChatCommand::Unknown(other),
    };
    Some(command)
}

/// Tab completion and inline hints for slash commands.
struct ChatHelper;

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ChatHelper {}

impl Validator for ChatHelper {}

pub async fn run_chat(runtime: &Runtime, initial_url: Option<String>) -> Result<()> {
    let mut session = runtime.build_session();
    if let Some(url) = initial_url {
        session.set_github_url(url);
    }

    let mut rl: Editor<ChatHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ChatHelper));

    note_info("Ask anything about the file. Type /help for commands.");
    if session.github_url().is_empty() {
        note_info("Set a file first with /url <github-url>.");
    } else {
        note_info(&format!("File: {}", session.github_url()));
    }
    if !session.api_key().is_set() {
        note_info("No API key in the environment; set one with /key <api-key>.");
    }

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                note_info("CTRL-C detected. Type /quit to exit.");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                error!(error = %err, "Readline failed");
                break;
            }
        };

        let Some(command) = parse_line(&line) else { continue };
        if !matches!(command, ChatCommand::Key(_)) {
            let _ = rl.add_history_entry(line.trim());
        }

        match command {
            ChatCommand::Quit => break,
            ChatCommand::Help => println!("{HELP}"),
            ChatCommand::Url(None) => {
                if session.github_url().is_empty() {
                    note_info("No file set.");
                } else {
                    note_info(&format!("File: {}", session.github_url()));
                }
            }
            ChatCommand::Url(Some(url)) => {
                session.set_github_url(url);
                note_success(&format!("File set to {url}"));
            }
            ChatCommand::Key(input) => {
                session.api_key_mut().set_input(input);
                let shown = session.api_key().display_value();
                if shown.is_empty() {
                    note_success("Using the default API key.");
                } else {
                    note_success(&format!("Using API key {}", mask_secret(shown)));
                }
            }
            ChatCommand::History => {
                if session.transcript().is_empty() {
                    note_info("No conversation yet.");
                } else {
                    println!(
                        "{}",
                        Renderer::markdown_to_terminal(session.transcript().as_str(), stdout_color())
                    );
                }
            }
            ChatCommand::Export => export(runtime, &session).await,
            ChatCommand::Unknown(name) => {
                note_error(&format!("Unknown command {name}. Type /help for commands."))
            }
            ChatCommand::Prompt(prompt) => ask(&mut session, prompt).await,
        }
    }

    debug!(session = %session.id(), "Chat ended");
    Ok(())
}

async fn ask(session: &mut Session, prompt: &str) {
    session.set_user_prompt(prompt);
    let reporter = spawn_phase_reporter(session.subscribe_phase());
    let result = session.generate().await;
    reporter.abort();

    match result {
        Ok(outcome) => println!("\n{}\n", Renderer::markdown_to_terminal(&outcome.reply, stdout_color())),
        Err(e) => {
            warn!(category = e.category(), detail = %redact_error(&e), "Turn failed");
            note_error(e.user_message());
        }
    }
}

async fn export(runtime: &Runtime, session: &Session) {
    let Some(reply) = session.latest_reply() else {
        note_info("Nothing to export yet.");
        return;
    };
    match runtime
        .exporter()
        .export(session.transcript().as_str(), reply, &runtime.export_options())
        .await
    {
        Ok(path) => note_success(&format!("Saved {}", path.display())),
        Err(e) => {
            error!(error = %redact_error(&e), "Export failed");
            note_error(&format!("Export failed: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(parse_line("  explain this  "), Some(ChatCommand::Prompt("explain this")));
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn url_takes_optional_argument() {
        assert_eq!(
            parse_line("/url https://github.com/o/r/blob/main/a.rs"),
            Some(ChatCommand::Url(Some("https://github.com/o/r/blob/main/a.rs")))
        );
        assert_eq!(parse_line("/url"), Some(ChatCommand::Url(None)));
    }

    #[test]
    fn bare_key_restores_default() {
        assert_eq!(parse_line("/key"), Some(ChatCommand::Key("")));
        assert_eq!(parse_line("/key   AIzaXYZ "), Some(ChatCommand::Key("AIzaXYZ")));
    }

    #[test]
    fn recognizes_other_commands() {
        assert_eq!(parse_line("/export"), Some(ChatCommand::Export));
        assert_eq!(parse_line("/history"), Some(ChatCommand::History));
        assert_eq!(parse_line("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_line("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_line("/nope x"), Some(ChatCommand::Unknown("/nope")));
    }
}
