pub mod action;
pub mod error;

pub use action::{ActionFactory, ActionKind, AuditResult, StandardActionFactory, StandardAuditAction};
pub use error::{AuditError, Result};
