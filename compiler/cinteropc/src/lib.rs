//! Cinteropc - the cinterop driver.
//!
//! Reads a TOML configuration, runs the generator over the native index it
//! names, compiles the C glue with an external toolchain and writes the
//! interop library.
//!
//! # Debugging
//!
//! - `RUST_LOG=cinterop_gen=debug` - per-declaration builder decisions
//! - `RUST_LOG=cinterop_link=debug` - forward-declaration resolution
//! - `CINTEROP_LOG_TREE=1` - hierarchical span output

pub mod config;
pub mod driver;
mod error;
pub mod toolchain;

use std::sync::Once;

pub use config::{DriverConfig, OutputConfig, ToolchainConfig};
pub use driver::{link, read_index, run, run_config, DriverOutput};
pub use error::DriverError;
pub use toolchain::{CcToolchain, NativeToolchain};

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber. Safe to call more than once.
///
/// Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        let registry = tracing_subscriber::registry().with(filter);
        if std::env::var("CINTEROP_LOG_TREE").is_ok_and(|v| v == "1") {
            registry
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .init();
        } else {
            registry
                .with(fmt::layer().with_target(true).with_level(true))
                .init();
        }
    });
}
