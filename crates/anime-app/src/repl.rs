//! Interactive chat loop.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use anime_chat::{Transcript, Turn, WorkflowCoordinator};

const HELP: &str = "Commands: /history, /debug, /help, /quit (or /exit). Anything else is a question.";

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Ask(&'a str),
    History,
    Debug,
    Help,
    Quit,
    Blank,
}

impl<'a> ReplCommand<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReplCommand::Blank;
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "/quit" | "/exit" => ReplCommand::Quit,
            "/history" => ReplCommand::History,
            "/debug" => ReplCommand::Debug,
            s if s.starts_with('/') => ReplCommand::Help,
            _ => ReplCommand::Ask(trimmed),
        }
    }
}

/// Read questions from stdin until EOF or `/quit`.
pub async fn run(coordinator: &mut WorkflowCoordinator) -> std::io::Result<()> {
    println!("Ask me about anime. {}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Blank => continue,
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::History => println!("{}", format_history(coordinator.transcript())),
            ReplCommand::Debug => match coordinator.transcript().last() {
                Some(turn) => println!("{}", format_debug(turn)),
                None => println!("No turns yet."),
            },
            ReplCommand::Ask(question) => {
                let answer = coordinator.handle_turn(question).await;
                println!("{}\n", answer);
            }
        }
    }
    Ok(())
}

/// One line per turn: number, intent, status, question.
pub fn format_history(transcript: &Transcript) -> String {
    if transcript.is_empty() {
        return "No turns yet.".to_string();
    }
    transcript
        .turns()
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                "{:>3}. [{} / {}] {}",
                i + 1,
                t.query.intent(),
                status_name(t),
                t.user_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Both envelopes of a turn as pretty JSON, error detail included.
pub fn format_debug(turn: &Turn) -> String {
    let value = serde_json::json!({
        "turn": turn.id.to_string(),
        "query": &turn.query,
        "result": &turn.result,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("<unprintable turn: {}>", e))
}

fn status_name(turn: &Turn) -> String {
    serde_json::to_value(turn.result.status())
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "?".to_string())
}
