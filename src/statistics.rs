use std::{
    net::IpAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::AHashMap;
use parking_lot::RwLock;

/// The type of information passed into the statistics registry.
#[derive(Debug, Clone, Copy)]
pub enum Stats {
    ReceivedBytes(u64),
    SendBytes(u64),
    ReceivedPkts(u64),
    SendPkts(u64),
    ErrorPkts(u64),
}

pub trait Number {
    fn add(&self, value: u64);
    fn get(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct Count(AtomicU64);

impl Number for Count {
    fn add(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// One client's counter set.
#[derive(Debug, Default)]
pub struct Counts<T> {
    pub received_bytes: T,
    pub send_bytes: T,
    pub received_pkts: T,
    pub send_pkts: T,
    pub error_pkts: T,
}

impl<T: Number> Counts<T> {
    fn add(&self, payload: &Stats) {
        match payload {
            Stats::ReceivedBytes(value) => self.received_bytes.add(*value),
            Stats::SendBytes(value) => self.send_bytes.add(*value),
            Stats::ReceivedPkts(value) => self.received_pkts.add(*value),
            Stats::SendPkts(value) => self.send_pkts.add(*value),
            Stats::ErrorPkts(value) => self.error_pkts.add(*value),
        }
    }
}

/// A point-in-time copy of one client's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub received_bytes: u64,
    pub send_bytes: u64,
    pub received_pkts: u64,
    pub send_pkts: u64,
    pub error_pkts: u64,
}

/// Packet statistics, tracked per client address.
///
/// # Example
///
/// ```
/// use radius_server::statistics::{Statistics, Stats};
///
/// let statistics = Statistics::default();
/// let client = "127.0.0.1".parse().unwrap();
///
/// statistics.add(client, &Stats::ReceivedPkts(1));
/// statistics.add(client, &Stats::ReceivedBytes(42));
///
/// let summary = statistics.get(&client).unwrap();
/// assert_eq!(summary.received_pkts, 1);
/// assert_eq!(summary.received_bytes, 42);
/// ```
#[derive(Default, Clone)]
pub struct Statistics(Arc<RwLock<AHashMap<IpAddr, Arc<Counts<Count>>>>>);

impl Statistics {
    /// Add statistics for a client, registering it on first sight.
    pub fn add(&self, ip: IpAddr, payload: &Stats) {
        if let Some(counts) = self.0.read().get(&ip) {
            counts.add(payload);
            return;
        }

        let counts = self.0.write().entry(ip).or_default().clone();
        counts.add(payload);
    }

    /// Get a snapshot of a client's counters.
    pub fn get(&self, ip: &IpAddr) -> Option<Summary> {
        self.0.read().get(ip).map(|counts| Summary {
            received_bytes: counts.received_bytes.get(),
            send_bytes: counts.send_bytes.get(),
            received_pkts: counts.received_pkts.get(),
            send_pkts: counts.send_pkts.get(),
            error_pkts: counts.error_pkts.get(),
        })
    }
}
