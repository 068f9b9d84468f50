pub mod cache;
pub mod identity;
pub mod keys;
pub mod paths;

pub use cache::ResolveCache;
pub use identity::audit_entity_id;
pub use keys::resolve_primary_key;
pub use paths::{DEFAULT_INCLUDE_DEPTH, IncludeCacheKey, include_paths};
