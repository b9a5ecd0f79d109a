//! Collaborator seams. The scheduler only ever talks to these traits.

pub mod clock;
pub mod earnings;
pub mod extractor;
pub mod repository;

pub use clock::{Clock, FixedClock, SystemClock};
pub use earnings::EarningsClient;
pub use extractor::Extractor;
pub use repository::Repository;
