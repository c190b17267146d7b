//! Affinity domains: a debug-only observer that binds entities to an
//! opaque domain and reports cross-domain access, with no semantic
//! effect on the entity itself.
//!
//! This is deliberately weaker than the transition tables elsewhere in
//! the runtime: binding, transfer, and cross-domain access are all
//! reportable conditions, not admission gates. Nothing here ever blocks
//! an operation on the entity it is tracking.

use crate::error::{Error, ErrorKind};
use crate::util::{DetHashMap, Handle};

/// An opaque affinity domain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AffinityDomain(pub u32);

/// The outcome of one cross-domain access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffinityReport {
    /// The access was same-domain, or the entity is unbound.
    Clean,
    /// The access crossed domains without an explicit transfer.
    Violation,
}

/// Fixed-capacity table binding entities to affinity domains.
#[derive(Debug)]
pub struct AffinityTable {
    capacity: usize,
    bindings: DetHashMap<Handle, AffinityDomain>,
    violation_count: u64,
}

impl AffinityTable {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            bindings: DetHashMap::default(),
            violation_count: 0,
        }
    }

    /// Binds `entity` to `domain`. Rejects a second bind without an
    /// intervening `transfer`.
    pub fn bind(&mut self, entity: Handle, domain: AffinityDomain) -> Result<(), Error> {
        if self.bindings.contains_key(&entity) {
            return Err(ErrorKind::AffinityAlreadyBound.into());
        }
        if self.bindings.len() >= self.capacity {
            return Err(ErrorKind::AffinityTableFull.into());
        }
        self.bindings.insert(entity, domain);
        Ok(())
    }

    /// Moves an already-bound entity to a new domain explicitly.
    pub fn transfer(&mut self, entity: Handle, domain: AffinityDomain) -> Result<(), Error> {
        if !self.bindings.contains_key(&entity) {
            return Err(ErrorKind::AffinityNotBound.into());
        }
        self.bindings.insert(entity, domain);
        Ok(())
    }

    #[must_use]
    pub fn domain_of(&self, entity: Handle) -> Option<AffinityDomain> {
        self.bindings.get(&entity).copied()
    }

    /// Checks whether accessing `entity` from `accessing_domain` crosses
    /// domains. Unbound entities are always `Clean` — affinity is opt-in.
    /// A crossing is counted but never rejects the access itself.
    pub fn check_access(&mut self, entity: Handle, accessing_domain: AffinityDomain) -> AffinityReport {
        match self.bindings.get(&entity) {
            Some(bound) if *bound != accessing_domain => {
                self.violation_count += 1;
                AffinityReport::Violation
            }
            _ => AffinityReport::Clean,
        }
    }

    #[must_use]
    pub const fn violation_count(&self) -> u64 {
        self.violation_count
    }

    pub fn forget(&mut self, entity: Handle) {
        self.bindings.remove(&entity);
    }
}
