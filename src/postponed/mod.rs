pub mod manager;
pub mod storage;

pub use manager::PostponedAuditManager;
pub use storage::PostponedAuditStorage;
