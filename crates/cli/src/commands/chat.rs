//! `toolloop chat`: interactive or single-message chat mode.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use toolloop_agent::AgentResponse;

use super::session::{self, SessionOptions};

pub async fn run(
    message: Option<String>,
    options: SessionOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = session::load_config(&options)?;
    let provider = toolloop_providers::build_from_config(&config)?;
    let mut session = session::build_session(&config, provider).await?;

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let response = session.respond(&msg).await;
        eprint!("\r              \r");
        print_response(&response?);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ToolLoop interactive chat");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    println!("  Mode:      {}", session.describe());
    println!("  Max tool calls per message: {}", config.agent.max_tool_calls);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type '/reset' to start over, 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                session.reset();
                println!("  (conversation cleared)");
                println!();
                continue;
            }
            _ => {}
        }

        eprint!("  ...");
        match session.respond(input).await {
            Ok(response) => {
                eprint!("\r     \r");
                println!();
                print_response(&response);
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn print_response(response: &AgentResponse) {
    for call in &response.tool_calls {
        println!("  [tool] {}({}) = {}", call.name, call.arguments, call.output);
    }
    for line in response.text().lines() {
        println!("  Assistant > {line}");
    }
    if response.ceiling_reached {
        println!("  (stopped: tool call limit reached)");
    }
}
