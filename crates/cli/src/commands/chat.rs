use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use securebank_agent::{ConversationController, SimulatedBankBackend, TracingAuditSink};
use securebank_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use securebank_core::{Message, Sender};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::commands::CommandResult;
use crate::logging::init_logging;

const QUIT_COMMAND: &str = "/quit";
const TYPING_POLL: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, Default)]
pub struct ChatOptions {
    pub json: bool,
    pub no_latency: bool,
    pub seed: Option<u64>,
}

impl ChatOptions {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            disable_latency: self.no_latency.then_some(true),
            rng_seed: self.seed,
            ..ConfigOverrides::default()
        }
    }
}

pub fn run(options: ChatOptions) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        overrides: options.overrides(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2)
        }
    };
    init_logging(&config.logging);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        }
    };

    let result = runtime.block_on(run_session(
        &config,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        options.json,
    ));

    match result {
        // The transcript already went to stdout; keep the exit quiet.
        Ok(_) => CommandResult { exit_code: 0, output: String::new() },
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 4),
    }
}

/// Runs one conversation over `input`/`output` until end of input or `/quit`.
/// Returns the number of turns that produced a reply.
pub async fn run_session<R, W>(config: &AppConfig, input: R, mut output: W, json: bool) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let backend = Arc::new(SimulatedBankBackend::new(config.backend.clone()));
    let mut controller = ConversationController::from_config(backend, &config.session)
        .with_audit_sink(Arc::new(TracingAuditSink));
    let busy = controller.busy_flag();

    for message in controller.transcript().messages() {
        render(&mut output, message, json).await?;
    }

    let mut lines = input.lines();
    let mut turns = 0;
    loop {
        if !json {
            output.write_all(b"you> ").await?;
            output.flush().await?;
        }
        let Some(line) = lines.next_line().await.context("failed to read from input")? else {
            break;
        };
        if line.trim() == QUIT_COMMAND {
            break;
        }

        let turn = controller.submit(&line);
        tokio::pin!(turn);
        let mut typing = tokio::time::interval(TYPING_POLL);
        let mut typing_shown = false;
        let replies = loop {
            tokio::select! {
                replies = &mut turn => break replies,
                _ = typing.tick() => {
                    if !json && !typing_shown && busy.is_busy() {
                        output.write_all(b"   (assistant is typing...)\n").await?;
                        output.flush().await?;
                        typing_shown = true;
                    }
                }
            }
        };

        if !replies.is_empty() {
            turns += 1;
        }
        for message in &replies {
            render(&mut output, message, json).await?;
        }
    }

    output.flush().await?;
    Ok(turns)
}

async fn render<W>(output: &mut W, message: &Message, json: bool) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let rendered = if json {
        let mut line = serde_json::to_string(message).context("failed to serialize message")?;
        line.push('\n');
        line
    } else {
        let speaker = match message.sender {
            Sender::User => "you",
            Sender::Agent if message.is_error => "assistant (error)",
            Sender::Agent => "assistant",
        };
        format!("{speaker}> {}\n\n", message.text)
    };

    output.write_all(rendered.as_bytes()).await.context("failed to write to output")?;
    Ok(())
}
