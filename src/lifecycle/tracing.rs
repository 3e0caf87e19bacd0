//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the
//! `tracing` crate for the whole dispatch layer.
//!
//! ## Configuration
//!
//! Log levels come from `RUST_LOG`; without it, `info` is used. The compact
//! format hides the module prefix (`with_target(false)`): every event already
//! carries `transport`, `destination` and `operation` fields.
//!
//! ```bash
//! # Lifecycle and per-command results (default)
//! RUST_LOG=info cargo run
//!
//! # Raw payloads and consumer state transitions
//! RUST_LOG=debug cargo run
//!
//! # Only the consumer loop
//! RUST_LOG=command_dispatch::framework::consumer=debug cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! - **Consumer Lifecycle**: Started, state transitions, stopped with its tally
//! - **Deliveries**: Payload on receipt (`debug`), executed outcome (`info`)
//! - **Failures**: Decode and executor failures with destination context,
//!   transport failures that end a consumer
//! - **Producer Calls**: A span per publish carrying the transport and size
//!
//! With `RUST_LOG=info` a rejected update looks like:
//!
//! ```text
//! INFO Consumer started transport=rabbitmq destination="COMPUTER_UPDATED" operation=update_computer
//! ERROR Executor failed, rejecting destination="COMPUTER_UPDATED" operation=update_computer error=not found: 65f0...
//! ```

use tracing_subscriber::EnvFilter;

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
