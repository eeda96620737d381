pub mod channel;
pub mod region;
pub mod sync;

pub use channel::{ShmConsumer, ShmProducer};
pub use region::ShmRegion;
pub use sync::SyncHeader;
