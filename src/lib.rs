#![doc(test(attr(deny(warnings))))]

//! homefin keeps a household's books: two independent profiles per user, accounts whose
//! balances are derived from their transactions, transfers, budgets, a category registry
//! and a recoverable trash.
//!
//! The workspace crates carry the model ([`domain`]), the services ([`core`]), JSON
//! persistence ([`storage`]) and preferences ([`config`]). This crate wires them into a
//! [`session::Session`] and a line-oriented [`cli`].

pub mod cli;
pub mod errors;
pub mod session;
pub mod utils;

pub use homefin_config as config;
pub use homefin_core as core;
pub use homefin_domain as domain;
pub use homefin_storage_json as storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    init_with(None);
}

/// Like [`init`], layering `directive` (the config's `log_filter`) over `RUST_LOG`.
/// Only the first call has any effect.
pub fn init_with(directive: Option<&str>) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing_with(directive);
        tracing::info!("homefin tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init_with(Some("homefin=debug"));
        super::init();
    }
}
