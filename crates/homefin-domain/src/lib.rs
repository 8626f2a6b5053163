//! homefin-domain
//!
//! Pure domain models (Account, Transaction, Category, Budget, DashboardData, ProfileBundle).
//! No I/O, no CLI, no storage. Only data types, core enums and lenient deserialisers.

pub mod account;
pub mod budget;
pub mod category;
pub mod common;
pub mod profile;
pub mod transaction;

pub use account::*;
pub use budget::*;
pub use category::*;
pub use common::*;
pub use profile::*;
pub use transaction::*;
