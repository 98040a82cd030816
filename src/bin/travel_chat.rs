//! Interactive travel planning chat in the terminal

use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_agent::app::build_session;
use travel_agent::config::{load_dotenv, SessionConfig};
use travel_agent::llm::LlmConfig;

const FOLLOW_UP_PROMPT: &str =
    "\nDo you have more details to add? (Type your response or 'done' to finish): ";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment is settled before any runtime thread exists
    load_dotenv();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(chat())
}

async fn chat() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the reply on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let session = build_session(&LlmConfig::from_env(), SessionConfig::from_env());
    let conversation_id = uuid::Uuid::new_v4().to_string();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("Welcome to your Travel Planning Assistant!");
    let Some(mut message) =
        read_message(&mut input, "How can I assist you with your travel plans: ").await?
    else {
        return Ok(());
    };
    println!("\nProcessing your request...");

    loop {
        print!("\nAssistant: ");
        io::stdout().flush()?;

        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let result = session
            .chat_streaming(
                Some(conversation_id.clone()),
                message,
                |chunk| {
                    print!("{chunk}");
                    let _ = io::stdout().flush();
                },
                cancel,
            )
            .await;
        interrupt.abort();
        println!();

        if let Err(e) = result {
            eprintln!("Error: {e}");
        }

        let Some(follow_up) = read_message(&mut input, FOLLOW_UP_PROMPT).await? else {
            break;
        };
        if follow_up.eq_ignore_ascii_case("done") {
            println!("Thank you for using our Travel Planning Assistant!");
            break;
        }
        message = follow_up;
    }

    Ok(())
}

/// Prompt until a non-blank line arrives; `None` on end of input
async fn read_message(input: &mut Lines<BufReader<Stdin>>, prompt: &str) -> io::Result<Option<String>> {
    loop {
        print!("{prompt}");
        io::stdout().flush()?;

        match input.next_line().await? {
            Some(line) if line.trim().is_empty() => {}
            Some(line) => return Ok(Some(line.trim().to_string())),
            None => {
                println!();
                return Ok(None);
            }
        }
    }
}
