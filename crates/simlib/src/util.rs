use rand::prelude::SliceRandom;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU32, Ordering};

/// Characters Kubernetes uses in generated name suffixes: no vowels, and none
/// of the easily confused `0`, `1`, `3`.
pub static UID_CHARACTERS: &[char] = &[
    'b', 'c', 'd', 'f', 'g', 'h', 'j', 'k', 'l', 'm', 'n', 'p', 'q', 'r', 's', 't', 'v', 'w', 'x',
    'z', '2', '4', '5', '6', '7', '8', '9',
];

/// Length of a generated uid.
pub static UID_LENGTH: usize = 8;

/// First address handed out by `SequentialAddresses::default()` is the one
/// after this.
pub static DEFAULT_BASE_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 0);

/// Source of the identity fields a simulated pod fills in when the caller
/// leaves them blank.
pub trait IdentityAllocator {
    /// A uid, unique among the pods this allocator has served.
    fn unique_id(&self) -> String;

    /// An address, unique among the pods this allocator has served.
    fn address(&self) -> String;
}

/// Generate a random uid, suitable as the suffix of a pod name.
pub fn random_uid() -> String {
    let mut rng = rand::thread_rng();

    (0..UID_LENGTH)
        .filter_map(|_| UID_CHARACTERS.choose(&mut rng))
        .collect()
}

/// Hands out IPv4 addresses in order, skipping any whose last octet is 0 or
/// 255.  Safe to share between tasks.
#[derive(Debug)]
pub struct SequentialAddresses {
    next: AtomicU32,
}

impl SequentialAddresses {
    /// Start counting after `base`.
    pub fn new(base: Ipv4Addr) -> Self {
        Self {
            next: AtomicU32::new(u32::from(base).wrapping_add(1)),
        }
    }

    pub fn next_address(&self) -> Ipv4Addr {
        loop {
            let ip = Ipv4Addr::from(self.next.fetch_add(1, Ordering::Relaxed));
            if !matches!(ip.octets()[3], 0 | 255) {
                return ip;
            }
        }
    }
}

impl Default for SequentialAddresses {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_ADDRESS)
    }
}

/// The allocator used outside of tests: random uids, sequential addresses.
#[derive(Debug, Default)]
pub struct RandomAllocator {
    addresses: SequentialAddresses,
}

impl RandomAllocator {
    pub fn new(base: Ipv4Addr) -> Self {
        Self {
            addresses: SequentialAddresses::new(base),
        }
    }
}

impl IdentityAllocator for RandomAllocator {
    fn unique_id(&self) -> String {
        random_uid()
    }

    fn address(&self) -> String {
        self.addresses.next_address().to_string()
    }
}
