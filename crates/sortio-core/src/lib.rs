pub mod buffer_pool;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod file_assignment;
pub mod first_read;
pub mod in_flight;
pub mod roles;
pub mod sort_consumer;

pub use buffer_pool::{Buffer, BufferPool};
pub use config::{REC, RunConfig};
pub use dispatch::{CyclicDestRank, DispatchAssignment, DispatchCoordinator};
pub use error::{SortioError, TimeoutKind};
pub use file_assignment::{file_iteration_count, file_index, record_count_mismatch};
pub use first_read::{FIRST_READ_MAX_ATTEMPTS, FIRST_READ_POLL_INTERVAL, FirstReadGate};
pub use in_flight::{InFlightMessage, InFlightQueue, TransferHandle, TransferStatus};
pub use roles::{GroupRanges, HostTopology, Role};
pub use sort_consumer::{NullSortConsumer, SortConsumer};
