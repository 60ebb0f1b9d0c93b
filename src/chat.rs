//! The interactive read-eval loop.
//!
//! Single-threaded and cooperatively suspending: the loop waits for operator
//! input, forwards the transcript to the transport, and prints streamed
//! chunks as they arrive. It ends on `exit`, `quit`, or end-of-input. A
//! remote failure is reported and the loop keeps going; there is no
//! mid-request cancellation.

use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::api::client::{ChatTransport, Reply, StreamEvent};
use crate::api::{ChatMessage, ChatRequest};
use crate::error::{Error, Result};
use crate::logging::TranscriptLog;
use crate::session::{Session, SessionStore};

pub struct ChatOptions {
    pub model: String,
    pub stream: bool,
    pub temperature: Option<f64>,
}

struct LoopState<'a> {
    session: &'a mut Session,
    store: &'a SessionStore,
    log: TranscriptLog,
    options: ChatOptions,
}

enum InputAction {
    /// Forward this text to the remote API.
    Message(String),
    /// Input was consumed locally; prompt again.
    Handled,
    Exit,
}

enum SlashResult {
    Handled,
    Exit,
}

type SlashHandler = fn(&mut LoopState<'_>, &str) -> SlashResult;

struct SlashCommand {
    name: &'static str,
    help: &'static str,
    handler: SlashHandler,
}

const SLASH_COMMANDS: &[SlashCommand] = &[
    SlashCommand {
        name: "help",
        help: "Show in-chat commands.",
        handler: slash_help,
    },
    SlashCommand {
        name: "save",
        help: "Save the session: /save [path]",
        handler: slash_save,
    },
    SlashCommand {
        name: "system",
        help: "Show or replace the system prompt: /system [prompt]",
        handler: slash_system,
    },
    SlashCommand {
        name: "log",
        help: "Toggle transcript logging or set the log file: /log [path]",
        handler: slash_log,
    },
    SlashCommand {
        name: "exit",
        help: "Leave the chat.",
        handler: slash_exit,
    },
];

fn slash_help(_state: &mut LoopState<'_>, _args: &str) -> SlashResult {
    println!("In-chat commands:");
    for command in SLASH_COMMANDS {
        println!("  /{:<8} {}", command.name, command.help);
    }
    println!("Plain 'exit' or 'quit' also leaves the chat.");
    SlashResult::Handled
}

fn slash_save(state: &mut LoopState<'_>, args: &str) -> SlashResult {
    let saved = if args.is_empty() {
        state.store.save(state.session).map(|path| {
            format!("Session saved as '{}' ({})", state.session.id, path.display())
        })
    } else {
        state
            .store
            .save_to_path(state.session, std::path::Path::new(args))
            .map(|_| format!("Session saved to {args}"))
    };
    match saved {
        Ok(message) => println!("{message}"),
        Err(e) => println!("Save failed: {e}"),
    }
    SlashResult::Handled
}

fn slash_system(state: &mut LoopState<'_>, args: &str) -> SlashResult {
    if args.is_empty() {
        match &state.session.system_prompt {
            Some(prompt) => println!("System prompt: {prompt}"),
            None => println!("No system prompt set."),
        }
    } else {
        state.session.system_prompt = Some(args.to_string());
        println!("System prompt updated.");
    }
    SlashResult::Handled
}

fn slash_log(state: &mut LoopState<'_>, args: &str) -> SlashResult {
    let result = if args.is_empty() {
        state.log.toggle()
    } else {
        state
            .log
            .set_log_file(args.to_string())
            .map(|_| format!("Logging enabled to: {args}"))
    };
    match result {
        Ok(message) => println!("{message}"),
        Err(e) => println!("Log error: {e}"),
    }
    SlashResult::Handled
}

fn slash_exit(_state: &mut LoopState<'_>, _args: &str) -> SlashResult {
    SlashResult::Exit
}

/// Classifies one line of operator input: sentinel, slash command, or a
/// message for the remote API. Unknown slash commands are reported locally
/// rather than being sent upstream by accident.
fn process_input(state: &mut LoopState<'_>, input: &str) -> InputAction {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return InputAction::Handled;
    }
    if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        return InputAction::Exit;
    }
    if let Some(rest) = trimmed.strip_prefix('/') {
        let mut parts = rest.splitn(2, ' ');
        let name = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim();
        if let Some(command) = SLASH_COMMANDS
            .iter()
            .find(|command| command.name.eq_ignore_ascii_case(name))
        {
            return match (command.handler)(state, args) {
                SlashResult::Handled => InputAction::Handled,
                SlashResult::Exit => InputAction::Exit,
            };
        }
        println!("Unknown command '/{name}'; try /help");
        return InputAction::Handled;
    }
    InputAction::Message(trimmed.to_string())
}

/// Builds the request for the current transcript. The system prompt, when
/// set, always leads the message list.
fn build_request(session: &Session, options: &ChatOptions) -> ChatRequest {
    let mut messages = Vec::with_capacity(session.messages.len() + 1);
    if let Some(system) = &session.system_prompt {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.clone(),
        });
    }
    for turn in &session.messages {
        messages.push(ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        });
    }
    ChatRequest {
        model: options.model.clone(),
        messages,
        stream: options.stream,
        temperature: options.temperature,
    }
}

async fn exchange(
    state: &mut LoopState<'_>,
    transport: &dyn ChatTransport,
    text: String,
) -> Result<()> {
    state.session.push_user(text.clone());
    if let Err(e) = state.log.log_message(&format!("You: {text}")) {
        warn!(error = %e, "transcript logging failed");
    }

    let request = build_request(state.session, &state.options);
    match transport.send_message(request).await? {
        Reply::Complete(content) => {
            println!("{content}");
            record_reply(state, content);
        }
        Reply::Stream(mut rx) => {
            let mut full = String::new();
            while let Some(event) = rx.recv().await {
                match event {
                    StreamEvent::Chunk(chunk) => {
                        print!("{chunk}");
                        let _ = std::io::stdout().flush();
                        full.push_str(&chunk);
                    }
                    StreamEvent::Error(message) => {
                        println!();
                        return Err(Error::api(message));
                    }
                    StreamEvent::End => break,
                }
            }
            println!();
            if !full.is_empty() {
                record_reply(state, full);
            }
        }
    }
    Ok(())
}

fn record_reply(state: &mut LoopState<'_>, content: String) {
    if let Err(e) = state.log.log_message(&content) {
        warn!(error = %e, "transcript logging failed");
    }
    state.session.push_assistant(content);
}

/// Runs the chat loop until the operator leaves or input ends.
pub async fn run_loop(
    transport: &dyn ChatTransport,
    store: &SessionStore,
    session: &mut Session,
    log: TranscriptLog,
    options: ChatOptions,
) -> Result<()> {
    println!(
        "Chatting with {}. Type 'exit' or 'quit' to leave, /help for commands.",
        options.model
    );
    let mut state = LoopState {
        session,
        store,
        log,
        options,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let line = lines
            .next_line()
            .await
            .map_err(|e| Error::configuration_with("could not read input", e))?;
        let Some(line) = line else {
            break;
        };
        match process_input(&mut state, &line) {
            InputAction::Message(text) => {
                // A failed exchange is reported and the loop continues; the
                // operator can retry or leave.
                if let Err(e) = exchange(&mut state, transport, text).await {
                    eprintln!("{e}");
                }
            }
            InputAction::Handled => {}
            InputAction::Exit => break,
        }
    }
    Ok(())
}
