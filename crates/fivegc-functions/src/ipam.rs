//! UE address pool.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// An IPv4 pool with a gateway. Hosts are every address in the prefix except
/// the network, the gateway and the broadcast address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPool {
    network: Ipv4Addr,
    prefix_length: u8,
    gateway: Ipv4Addr,
}

impl IpPool {
    /// Pool over `cidr` (e.g. `10.45.0.0/24`) using `gateway`
    pub fn new(cidr: &str, gateway: &str) -> Result<Self, String> {
        let (addr, len) = cidr
            .split_once('/')
            .ok_or_else(|| format!("pool {cidr:?} is not in a.b.c.d/len form"))?;
        let addr: Ipv4Addr = addr.parse().map_err(|e| format!("pool {cidr:?}: {e}"))?;
        let prefix_length: u8 = len.parse().map_err(|e| format!("pool {cidr:?}: {e}"))?;
        if !(8..=30).contains(&prefix_length) {
            return Err(format!("pool prefix /{prefix_length} out of range 8..=30"));
        }
        let gateway: Ipv4Addr = gateway
            .parse()
            .map_err(|e| format!("gateway {gateway:?}: {e}"))?;
        let pool = Self {
            network: Ipv4Addr::from(u32::from(addr) & mask(prefix_length)),
            prefix_length,
            gateway,
        };
        if !pool.contains(gateway) {
            return Err(format!("gateway {gateway} outside {cidr}"));
        }
        Ok(pool)
    }

    /// Prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Gateway address
    pub fn gateway(&self) -> Ipv4Addr {
        self.gateway
    }

    /// Whether `addr` is inside the prefix
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask(self.prefix_length) == u32::from(self.network)
    }

    /// Whether `addr` can be handed to a UE
    pub fn is_host(&self, addr: Ipv4Addr) -> bool {
        let base = u32::from(self.network);
        let last = base | !mask(self.prefix_length);
        let a = u32::from(addr);
        self.contains(addr) && a != base && a != last && addr != self.gateway
    }

    /// Deterministic address for `owner`: BLAKE3 of the owner picks a start
    /// slot, the first host at or after it (wrapping) is returned.
    pub fn address_for(&self, owner: &str) -> Ipv4Addr {
        let digest = blake3::hash(owner.as_bytes());
        let mut seed = [0u8; 4];
        seed.copy_from_slice(&digest.as_bytes()[..4]);
        let size = 1u32 << (32 - u32::from(self.prefix_length));
        let base = u32::from(self.network);
        let start = u32::from_be_bytes(seed) % size;
        (0..size)
            .map(|i| Ipv4Addr::from(base + (start + i) % size))
            .find(|addr| self.is_host(*addr))
            .unwrap_or(self.gateway)
    }
}

impl Default for IpPool {
    fn default() -> Self {
        Self {
            network: Ipv4Addr::new(10, 45, 0, 0),
            prefix_length: 24,
            gateway: Ipv4Addr::new(10, 45, 0, 1),
        }
    }
}

fn mask(prefix_length: u8) -> u32 {
    u32::MAX << (32 - u32::from(prefix_length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_pool_hands_out_dot_2_to_254() {
        let pool = IpPool::default();
        assert!(!pool.is_host(Ipv4Addr::new(10, 45, 0, 0)));
        assert!(!pool.is_host(Ipv4Addr::new(10, 45, 0, 1)));
        assert!(pool.is_host(Ipv4Addr::new(10, 45, 0, 2)));
        assert!(pool.is_host(Ipv4Addr::new(10, 45, 0, 254)));
        assert!(!pool.is_host(Ipv4Addr::new(10, 45, 0, 255)));
    }

    #[test]
    fn parse_errors() {
        assert!(IpPool::new("10.45.0.0", "10.45.0.1").is_err());
        assert!(IpPool::new("10.45.0.0/33", "10.45.0.1").is_err());
        assert!(IpPool::new("10.45.0.0/24", "10.46.0.1").is_err());
        let pool = IpPool::new("10.45.0.17/24", "10.45.0.1").unwrap();
        assert_eq!(pool, IpPool::default());
    }

    proptest! {
        #[test]
        fn allocation_is_a_stable_host(owner in "[a-z0-9-]{1,20}/[a-z0-9-]{1,20}") {
            let pool = IpPool::default();
            let addr = pool.address_for(&owner);
            prop_assert!(pool.is_host(addr));
            prop_assert_eq!(addr, pool.address_for(&owner));
        }
    }
}
