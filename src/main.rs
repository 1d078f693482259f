/*
 * Responsibility
 * - tokio runtime boot
 * - delegate to app::run() (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    policy_gate::app::run().await
}
