use std::fmt;

use serde::{Deserialize, Serialize};

/// Rank of a participant in the pool. Rank 0 is the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub u32);

impl Address {
    pub const COORDINATOR: Address = Address(0);

    /// Address of the n-th worker (1-based ranks; `worker(0)` is the first worker, rank 1).
    pub fn worker(n: u32) -> Self {
        Address(n + 1)
    }

    pub fn rank(self) -> u32 {
        self.0
    }

    pub fn is_coordinator(self) -> bool {
        self == Self::COORDINATOR
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_coordinator() {
            write!(f, "coordinator")
        } else {
            write!(f, "worker-{}", self.0)
        }
    }
}

/// Which senders a receive or probe will match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Any,
    Exact(Address),
}

impl Source {
    pub fn matches(self, address: Address) -> bool {
        match self {
            Source::Any => true,
            Source::Exact(a) => a == address,
        }
    }
}

impl From<Address> for Source {
    fn from(address: Address) -> Self {
        Source::Exact(address)
    }
}
