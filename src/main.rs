use anyhow::Result;
use hopper::repl::SessionEnd;

#[tokio::main]
async fn main() -> Result<()> {
    if hopper::run().await? == SessionEnd::Interrupted {
        // A pending stdin read cannot be cancelled and would block runtime shutdown.
        std::process::exit(0);
    }
    Ok(())
}
