//! Registration module containing the desk orchestrator and receipt naming

pub mod core;
pub mod receipt;

pub use self::core::*;
pub use self::receipt::*;
