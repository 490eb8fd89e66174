pub mod change;
pub mod compaction;
pub mod model;
pub mod price;
pub mod retention;
pub mod vendor;
pub mod wire;

pub mod error;

pub use change::has_changed;
pub use compaction::{FoldOutcome, apply_observation, fold};
pub use error::HistoryError;
pub use model::PriceHistory;
pub use price::PricePoint;
pub use retention::{PruneAction, RETENTION_WINDOW_DAYS, RetentionPolicy, enforce_window};
pub use vendor::{VendorOffer, cheapest_offer, is_available};
pub use wire::PriceHistoryWire;
