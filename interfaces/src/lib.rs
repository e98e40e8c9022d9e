pub mod baseline;
pub mod defs;
pub mod empty;

pub use baseline::StaticRegistry;
pub use defs::{Credentials, Item, ItemKey, ProductImage, Source, SourceId, SourceRegistry, SourceStatus};
pub use empty::EmptyRegistry;
