mod record;
mod summary;

pub use record::{Detection, IpRecord};
pub use summary::{Summary, UNKNOWN_COUNTRY};
