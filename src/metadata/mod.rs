pub mod entity;
pub mod registry;

pub use entity::{EntityType, KeyProperty, KeyShape, Navigation};
pub use registry::{MetadataModel, MetadataRegistry};
