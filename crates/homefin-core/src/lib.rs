//! homefin-core
//!
//! Business logic and services for homefin: derived balances, transfers, trash,
//! budgets, the category registry, import validation and export rows.
//! Depends on homefin-domain. No CLI, no terminal I/O, no direct filesystem access.

pub mod account_service;
pub mod budget_service;
pub mod category_service;
pub mod error;
pub mod export_service;
pub mod import_service;
pub mod ledger_service;
pub mod profile_service;
pub mod storage;
pub mod store;
pub mod time;
pub mod transaction_service;
pub mod transfer_service;
pub mod trash_service;

pub use account_service::*;
pub use budget_service::*;
pub use category_service::*;
pub use error::{CoreError, CoreResult};
pub use export_service::*;
pub use import_service::*;
pub use ledger_service::*;
pub use profile_service::*;
pub use store::ProfileStore;
pub use time::{Clock, FixedClock, SystemClock};
pub use transaction_service::*;
pub use transfer_service::*;
pub use trash_service::*;
