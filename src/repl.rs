use anyhow::{Context, Result};
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::dispatch::{DispatchError, Dispatcher};
use crate::gateway::ModelGateway;
use crate::model::Message;

/// Matched exactly against the whole line, case-sensitive.
pub const EXIT_KEYWORDS: [&str; 5] = ["exit", "quit", "bye", "goodbye", "q"];

const ASSISTANT_LABEL: &str = "Hopper";
const EXHAUSTED_NOTICE: &str = "All models have reached their rate limits. Please try again later.";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Exit,
    Skip,
    History,
    Model,
    Prompt(&'a str),
}

fn parse_line(line: &str) -> Command<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    if EXIT_KEYWORDS.contains(&line) {
        return Command::Exit;
    }
    match line.trim() {
        "" => Command::Skip,
        "/history" => Command::History,
        "/model" => Command::Model,
        _ => Command::Prompt(line),
    }
}

/// How an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// End of input or an exit keyword.
    Finished,
    /// Ctrl-C at the prompt. Stdin may still have a pending read that
    /// blocks runtime shutdown, so the caller should exit the process.
    Interrupted,
}

pub fn render_error(err: &DispatchError) -> String {
    match err {
        DispatchError::RosterExhausted {
            last_response: Some(_),
            ..
        } => EXHAUSTED_NOTICE.to_string(),
        other => format!("Error: {other}"),
    }
}

async fn ctrl_c() {
    let _ = tokio::signal::ctrl_c().await;
}

pub async fn run_repl<G>(dispatcher: &mut Dispatcher<G>) -> Result<SessionEnd>
where
    G: ModelGateway,
{
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_session(dispatcher, stdin, &mut stdout, ctrl_c).await
}

/// `interrupt` is polled at the prompt and while a turn is in flight.
async fn run_session<G, R, W, I, F>(
    dispatcher: &mut Dispatcher<G>,
    input: R,
    out: &mut W,
    interrupt: I,
) -> Result<SessionEnd>
where
    G: ModelGateway,
    R: AsyncBufRead + Unpin,
    W: Write,
    I: Fn() -> F,
    F: Future<Output = ()>,
{
    writeln!(out, "------------------------------")?;
    writeln!(out, "          Hopper Chat         ")?;
    writeln!(out, "------------------------------")?;
    writeln!(
        out,
        "model: {}",
        dispatcher.active_model().unwrap_or("<none>")
    )?;
    writeln!(
        out,
        "type a message, '/history' to show the transcript, '/model' for the model roster, or 'exit' to quit"
    )?;

    let mut lines = input.lines();
    loop {
        write!(out, "\nYou: ")?;
        out.flush().context("Failed to flush stdout")?;

        let next = tokio::select! {
            biased;
            _ = interrupt() => {
                writeln!(out, "\n\nCtrl+C received, exiting!")?;
                out.flush().context("Failed to flush stdout")?;
                info!(
                    message_count = dispatcher.conversation().len(),
                    "chat session interrupted"
                );
                return Ok(SessionEnd::Interrupted);
            }
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = next else {
            break;
        };

        match parse_line(&line) {
            Command::Exit => break,
            Command::Skip => continue,
            Command::History => print_history(out, dispatcher.conversation().snapshot())?,
            Command::Model => print_roster(out, dispatcher)?,
            Command::Prompt(prompt) => {
                match dispatcher.send_user_message_until(prompt, interrupt()).await {
                    Ok(reply) => writeln!(out, "\n{ASSISTANT_LABEL}: {}", reply.content.trim())?,
                    Err(err) => {
                        warn!(error = %err, "turn failed");
                        writeln!(out, "{}", render_error(&err))?;
                    }
                }
            }
        }
    }

    info!(
        message_count = dispatcher.conversation().len(),
        "chat session ended"
    );
    Ok(SessionEnd::Finished)
}

fn print_roster<G: ModelGateway, W: Write>(out: &mut W, dispatcher: &Dispatcher<G>) -> Result<()> {
    let roster = dispatcher.roster();
    if roster.is_empty() {
        writeln!(out, "(no models configured)")?;
        return Ok(());
    }

    let active = roster.active();
    for model in roster.models() {
        let marker = if Some(model.as_str()) == active { "*" } else { " " };
        writeln!(out, "{marker} {model}")?;
    }
    Ok(())
}

fn print_history<W: Write>(out: &mut W, history: &[Message]) -> Result<()> {
    if history.is_empty() {
        writeln!(out, "(history is empty)")?;
        return Ok(());
    }

    for (idx, msg) in history.iter().enumerate() {
        writeln!(out, "[{}] {}: {}", idx, msg.role.as_str(), msg.content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::future;

    use super::{Command, SessionEnd, parse_line, render_error, run_session};
    use crate::conversation::Conversation;
    use crate::dispatch::{DispatchError, Dispatcher};
    use crate::gateway::{ChatRequest, GatewayFuture, ModelGateway, RawResponse, TransportFailure};
    use crate::roster::ModelRoster;

    struct CannedGateway {
        responses: RefCell<VecDeque<RawResponse>>,
    }

    impl ModelGateway for CannedGateway {
        fn send<'a>(&'a self, _request: ChatRequest<'a>) -> GatewayFuture<'a> {
            let next = self
                .responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| TransportFailure::new("no canned response left"));
            Box::pin(async move { next })
        }
    }

    fn dispatcher(responses: Vec<RawResponse>) -> Dispatcher<CannedGateway> {
        Dispatcher::new(
            CannedGateway {
                responses: RefCell::new(responses.into()),
            },
            ModelRoster::new(["primary", "backup"]),
            Conversation::seeded("sys", ""),
            64,
        )
    }

    #[test]
    fn exit_keywords_match_whole_line_exactly() {
        for keyword in ["exit", "quit", "bye", "goodbye", "q", "exit\r\n"] {
            assert_eq!(parse_line(keyword), Command::Exit, "keyword {keyword:?}");
        }
        assert_eq!(parse_line("Exit"), Command::Prompt("Exit"));
        assert_eq!(parse_line("QUIT"), Command::Prompt("QUIT"));
        assert_eq!(parse_line(" exit"), Command::Prompt(" exit"));
        assert_eq!(parse_line("exit now"), Command::Prompt("exit now"));
    }

    #[test]
    fn parse_line_recognizes_commands_and_blank_lines() {
        assert_eq!(parse_line("   "), Command::Skip);
        assert_eq!(parse_line("/history"), Command::History);
        assert_eq!(parse_line("/model\n"), Command::Model);
        assert_eq!(parse_line("hello there"), Command::Prompt("hello there"));
    }

    #[test]
    fn render_error_uses_friendly_notice_for_exhaustion() {
        let exhausted = DispatchError::RosterExhausted {
            reason: "all models exhausted".to_string(),
            last_response: Some("Rate limit exceeded".to_string()),
        };
        assert_eq!(
            render_error(&exhausted),
            "All models have reached their rate limits. Please try again later."
        );

        let provider = DispatchError::Provider {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(
            render_error(&provider),
            "Error: provider error (status 500): boom"
        );
    }

    #[tokio::test]
    async fn session_prints_replies_and_survives_failed_turns() {
        let mut dispatcher = dispatcher(vec![
            RawResponse::new(500, r#"{"error":{"message":"boom"}}"#),
            RawResponse::new(
                200,
                r#"{"choices":[{"message":{"role":"assistant","content":" hey! "}}]}"#,
            ),
        ]);
        let input: &[u8] = b"first\n\nsecond\n/history\n/model\nexit\nnever sent\n";
        let mut out = Vec::new();

        let end = run_session(&mut dispatcher, input, &mut out, future::pending::<()>)
            .await
            .expect("session should end cleanly");

        assert_eq!(end, SessionEnd::Finished);
        let printed = String::from_utf8(out).expect("utf8 output");
        assert!(printed.contains("Error: provider error (status 500): boom"), "{printed}");
        assert!(printed.contains("Hopper: hey!"), "{printed}");
        assert!(printed.contains("[1] user: first"), "{printed}");
        assert!(printed.contains("[3] assistant:  hey! "), "{printed}");
        assert!(printed.contains("* primary\n  backup\n"), "{printed}");
        assert_eq!(dispatcher.conversation().len(), 4);
    }

    #[tokio::test]
    async fn session_ends_at_end_of_input() {
        let mut dispatcher = dispatcher(Vec::new());
        let input: &[u8] = b"";
        let mut out = Vec::new();

        let end = run_session(&mut dispatcher, input, &mut out, future::pending::<()>)
            .await
            .expect("session should end cleanly");

        assert_eq!(end, SessionEnd::Finished);
        assert_eq!(dispatcher.conversation().len(), 1);
    }

    #[tokio::test]
    async fn interrupt_at_prompt_returns_instead_of_exiting() {
        let mut dispatcher = dispatcher(Vec::new());
        let input: &[u8] = b"never sent\n";
        let mut out = Vec::new();

        let end = run_session(&mut dispatcher, input, &mut out, || future::ready(()))
            .await
            .expect("interrupt should not be an error");

        assert_eq!(end, SessionEnd::Interrupted);
        let printed = String::from_utf8(out).expect("utf8 output");
        assert!(printed.contains("Ctrl+C received, exiting!"), "{printed}");
        assert_eq!(dispatcher.conversation().len(), 1);
    }
}
