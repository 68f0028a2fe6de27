//! Utility modules

pub mod memory_storage;
pub mod validation;

pub use memory_storage::*;
pub use validation::*;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a global fmt subscriber once; `RUST_LOG` adds to `directive`
pub fn init_tracing(directive: &str) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        match directive.parse() {
            Ok(parsed) => filter = filter.add_directive(parsed),
            Err(err) => eprintln!("ignoring invalid log directive {directive:?}: {err}"),
        }

        if fmt().with_env_filter(filter).try_init().is_ok() {
            tracing::info!("bookkeeping tracing initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_tracing_does_not_panic() {
        super::init_tracing("bookkeeping_core=debug");
        super::init_tracing("not a [valid directive");
    }
}
