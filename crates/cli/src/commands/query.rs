//! `toolloop query`: one question in, one answer out.

use super::session::{self, SessionOptions};

pub async fn run(text: &str, options: SessionOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = session::load_config(&options)?;
    let provider = toolloop_providers::build_from_config(&config)?;
    let session = session::build_session(&config, provider).await?;

    let response = session.query(text).await?;
    println!("{response}");
    Ok(())
}
