/// Main entry point for the dispatch hub
///
/// This serves as a thin wrapper that delegates to the interfaces layer.
/// The actual application logic is implemented in `interfaces::cli`.

use dispatch_hub::interfaces::cli;

#[tokio::main]
async fn main() {
    cli::run().await;
}
