//! Content Suggestion Example
//!
//! Generates one suggestion of the given content type and prints the outcome
//! as JSON. Videos are verified against the YouTube Data API.
//!
//! To run this example:
//! ```
//! PORTFOLIO_OPENAI_API_KEY=... PORTFOLIO_YOUTUBE_API_KEY=... \
//!     cargo run --example generate_suggestion -- video "graph traversal"
//! ```

use anyhow::Context;
use content_gen_sdk::{content_service_from_env, params};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut args = std::env::args().skip(1);
    let content_type = args.next().unwrap_or_else(|| "lesson".to_string());
    let topic = args.next().unwrap_or_else(|| "ownership in Rust".to_string());

    let service = content_service_from_env().context("failed to configure the content service")?;

    let outcome = service
        .generate_named(&content_type, params([("topic", topic)]))
        .await
        .context("invalid generation request")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
