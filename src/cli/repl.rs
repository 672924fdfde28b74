//! Interactive chat loop.

use crate::agent::{Agent, AgentHooks};
use crate::session::Session;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tracing::debug;

/// What a line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Blank,
    Exit,
    Reset,
    Prompt(String),
}

pub fn parse_input(line: &str) -> ReplInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplInput::Blank;
    }
    match trimmed.to_lowercase().as_str() {
        "exit" | "quit" | "/exit" | "/quit" | ":q" => ReplInput::Exit,
        "reset" | "/reset" => ReplInput::Reset,
        _ => ReplInput::Prompt(trimmed.to_string()),
    }
}

/// Whether the prompt loop keeps going after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Exit,
}

fn history_path() -> Option<PathBuf> {
    crate::config::user_dir().map(|d| d.join("history"))
}

/// Run the prompt loop until exit, EOF or Ctrl-C.
pub async fn run(
    agent: &Agent,
    session: &mut Session,
    hooks: &dyn AgentHooks,
    init: Option<&str>,
) -> Result<()> {
    if let Some(init) = init.filter(|s| !s.trim().is_empty()) {
        turn(agent, session, hooks, init).await;
    }

    let mut editor = DefaultEditor::new()?;
    let history = history_path();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    println!("Interactive chat. Type /exit to quit, /reset to clear context.");
    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                println!();
                break;
            }
            Err(e) => return Err(e.into()),
        };

        let input = parse_input(&line);
        if let ReplInput::Prompt(prompt) = &input {
            let _ = editor.add_history_entry(prompt.as_str());
        }
        if dispatch(agent, session, hooks, input).await == LineOutcome::Exit {
            break;
        }
    }

    if let Some(path) = &history {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = editor.save_history(path) {
            debug!(error = %e, "failed to save history");
        }
    }
    Ok(())
}

/// Act on one parsed line. Turn failures are reported, never fatal.
pub async fn dispatch(
    agent: &Agent,
    session: &mut Session,
    hooks: &dyn AgentHooks,
    input: ReplInput,
) -> LineOutcome {
    match input {
        ReplInput::Blank => {}
        ReplInput::Exit => return LineOutcome::Exit,
        ReplInput::Reset => {
            session.reset();
            println!("Context cleared.");
        }
        ReplInput::Prompt(prompt) => turn(agent, session, hooks, &prompt).await,
    }
    LineOutcome::Continue
}

/// One turn. Failures are reported and the session carries on.
async fn turn(agent: &Agent, session: &mut Session, hooks: &dyn AgentHooks, prompt: &str) {
    match agent.run_turn(session, prompt, hooks).await {
        Ok(result) => {
            debug!(stats = ?result.stats, "turn stats");
            super::print_response(&result.response);
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
