//! Register a participant and complete payment with a receipt PDF
//!
//! ```text
//! RUST_LOG=debug cargo run --example verify_receipt -- path/to/receipt.pdf
//! ```

use registration_core::utils::MemoryStorage;
use registration_core::{AppConfig, RegistrationDesk, RegistrationError, RegistrationRequest, ReceiptDocument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: verify_receipt <receipt.pdf>")?;
    let bytes = std::fs::read(&path)?;
    let file_name = std::path::Path::new(&path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("receipt.pdf")
        .to_string();

    let config = AppConfig::from_env()?;
    println!("Expected payment facts:");
    println!("{}\n", serde_json::to_string_pretty(&config.expected_facts)?);

    let mut desk = RegistrationDesk::new(MemoryStorage::new(), config);

    let registration = desk
        .create_registration(RegistrationRequest {
            first_name: "Иван".to_string(),
            last_name: "Петров".to_string(),
            email: "ivan@example.com".to_string(),
            birth_date: "15/03/1990".to_string(),
            phone: "+79001234567".to_string(),
            telegram: "@ivanp".to_string(),
            city: "Саратов".to_string(),
            role: "служитель".to_string(),
            consent_donation: true,
            consent_personal_data: true,
            ..RegistrationRequest::default()
        })
        .await?;
    println!("Registered {} ({})", registration.full_name(), registration.id);

    let document = ReceiptDocument::new(file_name, "application/pdf", bytes);
    match desk.complete_payment(registration.id, document).await {
        Ok(receipt) => {
            println!("Receipt accepted, stored as {}", receipt.stored_name);
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Err(RegistrationError::ReceiptRejected(result)) => {
            println!("Receipt rejected:");
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Err(e) => return Err(e.into()),
    }

    let stats = desk.registration_stats().await?;
    println!(
        "\nRegistrations: {} total, {} completed, {} pending",
        stats.total, stats.completed, stats.pending
    );

    Ok(())
}
