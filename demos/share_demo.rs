//! Minimal example: two users sharing one encrypted file.
//!
//! Demonstrates upload, sharing by key re-wrapping, revocation and audit
//! logging with file persistence.
//! Run with: `cargo run --example share_demo`

use sharevault::audit::FileAuditSink;
use sharevault::{EnvelopeConfig, Permission, SharevaultError, Vault};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    // 1. Setup
    let mut vault = Vault::new(EnvelopeConfig::default())?;

    // Optional: persist audit log to file
    let audit_path = std::env::temp_dir().join("sharevault_audit.jsonl");
    vault.add_audit_sink(Box::new(FileAuditSink::new(&audit_path)?));

    // 2. Register users (each gets an RSA key pair)
    vault.register_user("alice")?;
    vault.register_user("bob")?;

    // 3. Alice uploads a file
    let file_id = vault.upload("alice", "customer_pii.csv", b"Alice, alice@example.com")?;
    println!("alice uploaded file #{file_id}");

    // 4. Alice shares with Bob: only the file key is re-wrapped
    vault.share("alice", file_id, "bob", Permission::Read)?;
    let for_bob = vault.download("bob", file_id)?;
    println!("bob read {} bytes", for_bob.len());

    // 5. Alice revokes; Bob's next download is refused
    vault.revoke("alice", file_id, "bob")?;
    match vault.download("bob", file_id) {
        Err(SharevaultError::AccessDenied) => println!("bob's access revoked"),
        other => println!("unexpected: {other:?}"),
    }

    // 6. Audit log
    let log = vault.audit_log();
    println!("Audit log: {} record(s)", log.len());
    for record in log.iter() {
        println!(
            "  {:?} by {} @ {}",
            record.action,
            record.actor.as_deref().unwrap_or("-"),
            record.timestamp
        );
    }
    println!("Full audit also written to: {}", audit_path.display());

    Ok(())
}
