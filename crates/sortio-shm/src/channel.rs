use sortio_core::SortioError;

use crate::region::ShmRegion;
use crate::sync::{HEADER_BYTES, SyncHeader, SyncState};

/// Shared-memory object names (§6 "Shared-memory objects").
pub const SYNC_FLAGS_NAME: &str = "syncFlags";
pub const RAW_DATA_NAME: &str = "rawData";

/// Producer (Transferrer) side of the per-host shared-memory channel
/// (§4.5). Creates both named regions; they are unlinked when this value
/// drops.
pub struct ShmProducer {
    header: ShmRegion,
    data: ShmRegion,
}

impl ShmProducer {
    /// `data_capacity` must be large enough to hold the largest batch this
    /// host will ever forward (`FileSizeMax * M`, §4.5).
    pub fn create(data_capacity: usize) -> Result<Self, SortioError> {
        Self::create_named(SYNC_FLAGS_NAME, RAW_DATA_NAME, data_capacity)
    }

    fn create_named(sync_name: &str, data_name: &str, data_capacity: usize) -> Result<Self, SortioError> {
        let header = ShmRegion::create(sync_name, HEADER_BYTES)?;
        let data = ShmRegion::create(data_name, data_capacity)?;
        Ok(Self { header, data })
    }

    /// Copy `payload` into the data area, then flip `state` to `Full`
    /// (§4.5 "Production"). Fails with a `Protocol` error if the previous
    /// payload has not yet been consumed, or if `payload` overflows the
    /// data area.
    pub fn write(&mut self, rank: i32, payload: &[u8]) -> Result<(), SortioError> {
        if payload.len() > self.data.len() {
            return Err(SortioError::protocol(
                rank,
                format!("payload of {} bytes exceeds shared data area of {} bytes", payload.len(), self.data.len()),
            ));
        }
        let sync = SyncHeader::new(&mut self.header);
        if sync.state() != SyncState::Empty {
            return Err(SortioError::protocol(rank, "producer found state != Empty before write"));
        }
        self.data.as_mut_slice()[..payload.len()].copy_from_slice(payload);
        sync.set_full(payload.len() as i32);
        Ok(())
    }
}

/// Consumer (local Sorter-master) side of the per-host shared-memory
/// channel (§4.5). Opens the regions the Transferrer already created;
/// must only be constructed after the READY handshake (§4.5) has proven
/// they exist.
pub struct ShmConsumer {
    header: ShmRegion,
    data: ShmRegion,
}

impl ShmConsumer {
    pub fn open(data_capacity: usize) -> Result<Self, SortioError> {
        Self::open_named(SYNC_FLAGS_NAME, RAW_DATA_NAME, data_capacity)
    }

    fn open_named(sync_name: &str, data_name: &str, data_capacity: usize) -> Result<Self, SortioError> {
        let header = ShmRegion::open_existing(sync_name, HEADER_BYTES)?;
        let data = ShmRegion::open_existing(data_name, data_capacity)?;
        Ok(Self { header, data })
    }

    /// Check `state` exactly once, with no spin. Returns `Ok(None)` if the
    /// channel is `Empty`, or the payload if `Full` (§4.5 "Consumption").
    /// Used by a Sorter-master that also has to watch for the Transferrer's
    /// `AllSent` handshake, so the bounded spin-wait of §4.5/§5 (~100µs
    /// cadence, ~200s bound) is the caller's loop, not this method's (§9,
    /// DESIGN.md "relay termination").
    pub fn try_read(&mut self, rank: i32) -> Result<Option<Vec<u8>>, SortioError> {
        let sync = SyncHeader::new(&mut self.header);
        if sync.state() != SyncState::Full {
            return Ok(None);
        }
        let size = sync.size();
        if size <= 0 {
            return Err(SortioError::protocol(rank, "state=Full but size<=0"));
        }
        let payload = self.data.as_slice()[..size as usize].to_vec();
        sync.set_empty();
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tag: &str) -> (String, String) {
        (format!("sortio-chan-sync-{tag}-{}", std::process::id()), format!("sortio-chan-data-{tag}-{}", std::process::id()))
    }

    #[test]
    fn producer_then_consumer_round_trip_one_payload() {
        let (sync_name, data_name) = names("roundtrip");
        let mut producer = ShmProducer::create_named(&sync_name, &data_name, 64).unwrap();
        producer.write(0, b"hello").unwrap();

        let mut consumer = ShmConsumer::open_named(&sync_name, &data_name, 64).unwrap();
        let payload = consumer.try_read(0).unwrap();
        assert_eq!(payload, Some(b"hello".to_vec()));
    }

    #[test]
    fn write_before_previous_payload_consumed_is_a_protocol_error() {
        let (sync_name, data_name) = names("doublewrite");
        let mut producer = ShmProducer::create_named(&sync_name, &data_name, 64).unwrap();
        producer.write(0, b"first").unwrap();
        let err = producer.write(0, b"second").unwrap_err();
        assert!(matches!(err, SortioError::Protocol { .. }));
    }

    #[test]
    fn try_read_returns_none_without_blocking_when_empty() {
        let (sync_name, data_name) = names("tryread-empty");
        let producer = ShmProducer::create_named(&sync_name, &data_name, 64).unwrap();
        let mut consumer = ShmConsumer::open_named(&sync_name, &data_name, 64).unwrap();
        assert_eq!(consumer.try_read(0).unwrap(), None);
        drop(producer);
    }

    #[test]
    fn try_read_returns_the_payload_once_full() {
        let (sync_name, data_name) = names("tryread-full");
        let mut producer = ShmProducer::create_named(&sync_name, &data_name, 64).unwrap();
        producer.write(0, b"payload").unwrap();
        let mut consumer = ShmConsumer::open_named(&sync_name, &data_name, 64).unwrap();
        assert_eq!(consumer.try_read(0).unwrap(), Some(b"payload".to_vec()));
        assert_eq!(consumer.try_read(0).unwrap(), None);
    }

    #[test]
    fn write_larger_than_data_area_is_a_protocol_error() {
        let (sync_name, data_name) = names("toobig");
        let mut producer = ShmProducer::create_named(&sync_name, &data_name, 4).unwrap();
        let err = producer.write(0, b"way too big").unwrap_err();
        assert!(matches!(err, SortioError::Protocol { .. }));
    }
}
