//! Generate a document set against a running node.
//!
//! ```text
//! SPECFORGE_MODEL_PROVIDER=echo cargo run -p specforge-node
//! cargo run -p specforge-sdk --example quickstart -- http://127.0.0.1:8080
//! ```

use specforge_sdk::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());

    let client = SpecForgeClient::connect(&url).await?;
    let mut events = client.events(None).await?;

    let request = ProjectRequest::builder()
        .project_name("Task Tracker")
        .description("Lightweight kanban for small teams")
        .features(["Boards", "Due dates", "Email reminders"])
        .tech_stack(["Rust", "PostgreSQL"])
        .build()?;

    let envelope = client.generate_spec(&request).await?;
    println!("{}", envelope.message);

    let Some(run_id) = envelope.run_id else {
        return Ok(());
    };
    for event in events.until_finished(run_id).await {
        println!("{}", serde_json::to_string(&event)?);
    }

    if let Some(files) = &envelope.files {
        for (kind, file) in files {
            println!("{kind:?}: {} ({} bytes)", file.path, file.size);
        }
    }
    Ok(())
}
