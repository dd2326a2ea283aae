//! Registration demo binary
//!
//! Runs `registration/loginAndRegister` against scripted collaborators and
//! prints the lifecycle events and the resulting voice state.
//!
//! ```text
//! SWITCHBOARD_DEMO_SCENARIO=token-fails cargo run --bin registration-demo
//! ```

use switchboard_core::{LifecycleAction, RejectReason, Rejection, Settled};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_registration::mocks::MockServices;
use voice_registration::{DemoConfig, Operations, app_store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_registration=debug,switchboard_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DemoConfig::from_env()?;
    tracing::info!(scenario = %config.scenario, "Starting registration demo");

    println!("=== Registration Demo: {} ===\n", config.scenario);

    let mocks = MockServices::for_scenario(config.scenario);
    let operations = Operations::new(&mocks.services());
    let store = app_store(config.store.clone());
    let mut actions = store.subscribe_actions();

    let settled = store.dispatch(&operations.login_and_register, ()).await;

    println!("Events:");
    while let Ok(action) = actions.try_recv() {
        if let Some(record) = action.lifecycle() {
            println!("  {}", record.action_type());
        }
    }

    match &settled {
        Settled::Fulfilled { .. } => println!("\nResult: registered"),
        Settled::Rejected {
            reason: Rejection::Reason(reason),
        } => println!("\nResult: rejected with {}", reason.tag()),
        Settled::Rejected {
            reason: Rejection::Error(error),
        } => println!("\nResult: failed unexpectedly: {error}"),
    }

    let voice = store.state(|s| s.voice.clone()).await;
    println!("\nVoice state:\n{}", serde_json::to_string_pretty(&voice)?);

    println!(
        "\nCollaborator calls: login={} logout={} token={} register={}",
        mocks.auth.logins(),
        mocks.auth.logouts(),
        mocks.tokens.fetches(),
        mocks.voice.registrations().len(),
    );

    store.shutdown(config.store.default_shutdown_timeout).await?;
    Ok(())
}
