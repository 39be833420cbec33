// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Address Space Allocation
//!
//! Hands out IPv4 CIDR blocks to workspaces from a fixed base pool. Every
//! active workspace owns exactly one block and no two active blocks may
//! overlap.
//!
//! The allocator is a pure function of `(pool, in_use, prefix_length)`:
//! candidates of the requested size are walked in ascending address order and
//! the lowest candidate that intersects none of the in-use blocks wins. Overlap
//! is decided on address ranges, so a `/23` in use blocks both `/24` halves.
//!
//! The allocator never retries. `Exhausted` is surfaced to the caller, which
//! may try again once a workspace reaches `Deleted` and frees its block.

use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Default subnet size handed to a new workspace
pub const DEFAULT_PREFIX_LENGTH: u8 = 24;

/// Default base pool
pub const DEFAULT_ADDRESS_POOL: &str = "10.0.0.0/8";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressSpaceError {
    #[error("No free /{prefix_length} address space left in pool {pool}")]
    Exhausted { pool: Ipv4Network, prefix_length: u8 },

    #[error("Invalid prefix length /{prefix_length} for pool {pool}")]
    InvalidPrefixLength { pool: Ipv4Network, prefix_length: u8 },

    #[error("Invalid address space '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },
}

/// Parse a stored address space into an IPv4 network.
///
/// Host bits are tolerated (`10.0.0.7/24` is read as `10.0.0.0/24`); a bare
/// address is a `/32`.
pub fn parse_address_space(value: &str) -> Result<Ipv4Network, AddressSpaceError> {
    Ipv4Network::from_str(value.trim()).map_err(|e| AddressSpaceError::InvalidCidr {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Inclusive `[first, last]` address range covered by a block.
fn block_range(network: &Ipv4Network) -> (u64, u64) {
    let first = u64::from(u32::from(network.network()));
    let size = 1u64 << (32 - u32::from(network.prefix()));
    (first, first + size - 1)
}

/// True when the address ranges of `a` and `b` intersect.
pub fn overlaps(a: &Ipv4Network, b: &Ipv4Network) -> bool {
    let (a_first, a_last) = block_range(a);
    let (b_first, b_last) = block_range(b);
    a_first <= b_last && b_first <= a_last
}

/// Index pairs `(i, j)` with `i < j` whose blocks overlap.
pub fn overlapping_pairs(blocks: &[Ipv4Network]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..blocks.len() {
        for j in (i + 1)..blocks.len() {
            if overlaps(&blocks[i], &blocks[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Lowest-free-block allocator over a fixed base pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpaceAllocator {
    pool: Ipv4Network,
    default_prefix_length: u8,
}

impl AddressSpaceAllocator {
    /// Create an allocator over `pool` handing out `/24` blocks by default
    pub fn new(pool: Ipv4Network) -> Self {
        Self {
            pool,
            default_prefix_length: DEFAULT_PREFIX_LENGTH.max(pool.prefix()),
        }
    }

    /// Create an allocator from a CIDR string such as `10.0.0.0/8`
    pub fn from_cidr(pool: &str) -> Result<Self, AddressSpaceError> {
        Ok(Self::new(parse_address_space(pool)?))
    }

    /// Override the block size used by [`allocate_default`](Self::allocate_default)
    pub fn with_default_prefix_length(mut self, prefix_length: u8) -> Result<Self, AddressSpaceError> {
        self.check_prefix_length(prefix_length)?;
        self.default_prefix_length = prefix_length;
        Ok(self)
    }

    pub fn pool(&self) -> Ipv4Network {
        self.pool
    }

    pub fn default_prefix_length(&self) -> u8 {
        self.default_prefix_length
    }

    fn check_prefix_length(&self, prefix_length: u8) -> Result<(), AddressSpaceError> {
        if prefix_length < self.pool.prefix() || prefix_length > 32 {
            return Err(AddressSpaceError::InvalidPrefixLength {
                pool: self.pool,
                prefix_length,
            });
        }
        Ok(())
    }

    /// Allocate a block of the default size
    pub fn allocate_default(&self, in_use: &[Ipv4Network]) -> Result<Ipv4Network, AddressSpaceError> {
        self.allocate(in_use, self.default_prefix_length)
    }

    /// Return the lowest `/prefix_length` block of the pool that overlaps
    /// none of `in_use`.
    ///
    /// In-use blocks outside the pool are ignored. The result only depends on
    /// the set of in-use blocks, not on their order.
    pub fn allocate(
        &self,
        in_use: &[Ipv4Network],
        prefix_length: u8,
    ) -> Result<Ipv4Network, AddressSpaceError> {
        self.check_prefix_length(prefix_length)?;

        let (pool_first, pool_last) = block_range(&self.pool);
        let size = 1u64 << (32 - u32::from(prefix_length));

        let used: Vec<(u64, u64)> = in_use
            .iter()
            .map(block_range)
            .filter(|(first, last)| *last >= pool_first && *first <= pool_last)
            .collect();

        // The pool start is aligned to the pool size, hence to any smaller block size.
        let mut candidate = pool_first;
        loop {
            let candidate_last = candidate + size - 1;
            if candidate_last > pool_last {
                return Err(AddressSpaceError::Exhausted {
                    pool: self.pool,
                    prefix_length,
                });
            }

            let blocking_last = used
                .iter()
                .filter(|(first, last)| *first <= candidate_last && candidate <= *last)
                .map(|(_, last)| *last)
                .max();

            match blocking_last {
                None => {
                    let address = Ipv4Addr::from(candidate as u32);
                    return Ipv4Network::new(address, prefix_length).map_err(|_| {
                        AddressSpaceError::InvalidPrefixLength {
                            pool: self.pool,
                            prefix_length,
                        }
                    });
                }
                // Jump to the first aligned block past everything that overlapped.
                Some(last) => candidate = (last + 1).div_ceil(size) * size,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
