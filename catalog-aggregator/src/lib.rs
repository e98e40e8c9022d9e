pub mod types;
pub mod traits;
pub mod fetcher;
pub mod merge;
pub mod progress;
pub mod state;
pub mod aggregator;
pub mod registry;
pub mod view;

pub use types::*;
pub use traits::CatalogFetcher;
pub use fetcher::Fetcher;
pub use merge::{merge, AggregatedSet};
pub use progress::{BatchId, ProgressHub, ProgressReceiver, ProgressState};
pub use aggregator::{estimate_has_more, CatalogAggregator};
pub use registry::{load_sources, parse_sources};
pub use view::{sort_items, SortDirection, SortKey, SortOrder};
pub use interfaces::{EmptyRegistry, StaticRegistry};
