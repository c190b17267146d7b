//! Generation-tagged slot arenas and the packed handle format.
//!
//! Every externally visible entity (region, task, obligation, timer,
//! channel) is referred to by an opaque [`Handle`]: a 64-bit value packing
//! a type tag, an admission-hint state mask, a generation, and a slot
//! index. Handles are values, never owning references; validity is
//! decided entirely by comparing the handle's generation against the
//! generation currently stored in the arena slot.
//!
//! Arenas are intentionally dependency-free (no `slab`, no hashing) so
//! that allocation order and reclaim order stay a pure function of calls
//! made, which is what the deterministic replay guarantee rests on.

use crate::error::{Error, ErrorKind};
use std::collections::BTreeSet;

/// Slot index within an arena. 16 bits, per the packed handle format.
pub type SlotIndex = u16;
/// Generation counter for a slot. 16 bits, saturates rather than wraps.
pub type Generation = u16;
/// Entity kind discriminant packed into the high bits of a handle.
pub type TypeTag = u16;
/// Admission-hint bitmask packed into a handle (fast-path only, never
/// authoritative — see [`Arena::admit`]).
pub type StateMask = u16;

/// An opaque 64-bit handle: `[type_tag:16 | state_mask:16 | generation:16 | slot:16]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// The null handle: all fields zero. No arena's type tag is zero, so
    /// this never collides with a live handle.
    pub const NULL: Self = Self(0);

    #[must_use]
    pub const fn pack(
        type_tag: TypeTag,
        state_mask: StateMask,
        generation: Generation,
        slot: SlotIndex,
    ) -> Self {
        let bits = ((type_tag as u64) << 48)
            | ((state_mask as u64) << 32)
            | ((generation as u64) << 16)
            | (slot as u64);
        Self(bits)
    }

    #[must_use]
    pub const fn type_tag(self) -> TypeTag {
        (self.0 >> 48) as u16
    }

    #[must_use]
    pub const fn state_mask(self) -> StateMask {
        (self.0 >> 32) as u16
    }

    #[must_use]
    pub const fn generation(self) -> Generation {
        (self.0 >> 16) as u16
    }

    #[must_use]
    pub const fn slot(self) -> SlotIndex {
        self.0 as u16
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns a copy of this handle with a different admission-hint mask.
    /// The mask is advisory only; see [`Arena::admit`].
    #[must_use]
    pub const fn with_state_mask(self, mask: StateMask) -> Self {
        Self::pack(self.type_tag(), mask, self.generation(), self.slot())
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Handle(tag={} slot={} gen={})",
            self.type_tag(),
            self.slot(),
            self.generation()
        )
    }
}

enum Entry<T> {
    Free {
        generation: Generation,
    },
    Live {
        generation: Generation,
        state: StateMask,
        value: T,
    },
}

/// A fixed-capacity, generation-safe slot pool for one entity kind.
pub struct Arena<T> {
    type_tag: TypeTag,
    capacity: usize,
    entries: Vec<Entry<T>>,
    free_slots: BTreeSet<SlotIndex>,
    live_count: usize,
}

impl<T> Arena<T> {
    /// Creates an empty arena bound to `type_tag` with a fixed `capacity`.
    ///
    /// `capacity` must fit in a [`SlotIndex`] (65536 slots); this is a
    /// compile-time-style bound in the spirit of `MAX_REGIONS` etc.
    #[must_use]
    pub fn with_capacity(type_tag: TypeTag, capacity: usize) -> Self {
        assert!(
            capacity <= usize::from(SlotIndex::MAX) + 1,
            "arena capacity exceeds 16-bit slot index range"
        );
        Self {
            type_tag,
            capacity,
            entries: Vec::with_capacity(capacity),
            free_slots: BTreeSet::new(),
            live_count: 0,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.live_count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_slots.is_empty() && self.entries.len() >= self.capacity
    }

    /// Allocates a new slot holding `value`, returning its handle. Reuses
    /// the lowest-indexed free slot, if any, before growing the arena —
    /// reuse order is a pure function of which slots are free, never of
    /// reclaim order.
    ///
    /// Failure-atomic: on `ResourceExhausted`, no entry is mutated.
    pub fn allocate(&mut self, initial_state: StateMask, value: T) -> Result<Handle, Error> {
        if let Some(slot) = self.free_slots.pop_first() {
            let idx = slot as usize;
            let generation = match self.entries[idx] {
                Entry::Free { generation } => generation,
                Entry::Live { .. } => unreachable!("free set pointed at live slot"),
            };
            self.entries[idx] = Entry::Live {
                generation,
                state: initial_state,
                value,
            };
            self.live_count += 1;
            return Ok(Handle::pack(self.type_tag, initial_state, generation, slot));
        }

        if self.entries.len() >= self.capacity {
            return Err(Error::new(ErrorKind::ResourceExhausted));
        }

        let slot = self.entries.len() as SlotIndex;
        self.entries.push(Entry::Live {
            generation: 0,
            state: initial_state,
            value,
        });
        self.live_count += 1;
        Ok(Handle::pack(self.type_tag, initial_state, 0, slot))
    }

    /// Validates a handle against this arena: type tag, bounds, and
    /// generation. Does not consult the admission-hint mask, matching
    /// the spec's rule that the mask is never authoritative.
    fn validate(&self, handle: Handle) -> Result<usize, Error> {
        if handle.is_null() || handle.type_tag() != self.type_tag {
            return Err(Error::new(ErrorKind::NotFound));
        }
        let idx = handle.slot() as usize;
        let Some(entry) = self.entries.get(idx) else {
            return Err(Error::new(ErrorKind::NotFound));
        };
        match entry {
            Entry::Free { .. } => Err(Error::new(ErrorKind::NotFound)),
            Entry::Live { generation, .. } => {
                if *generation == handle.generation() {
                    Ok(idx)
                } else {
                    Err(Error::new(ErrorKind::StaleHandle))
                }
            }
        }
    }

    pub fn get(&self, handle: Handle) -> Result<&T, Error> {
        let idx = self.validate(handle)?;
        match &self.entries[idx] {
            Entry::Live { value, .. } => Ok(value),
            Entry::Free { .. } => unreachable!("validated slot became free"),
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T, Error> {
        let idx = self.validate(handle)?;
        match &mut self.entries[idx] {
            Entry::Live { value, .. } => Ok(value),
            Entry::Free { .. } => unreachable!("validated slot became free"),
        }
    }

    /// Reads the current state mask of a slot, ignoring the mask carried
    /// by the handle.
    pub fn current_state(&self, handle: Handle) -> Result<StateMask, Error> {
        let idx = self.validate(handle)?;
        match &self.entries[idx] {
            Entry::Live { state, .. } => Ok(*state),
            Entry::Free { .. } => unreachable!(),
        }
    }

    pub fn set_state(&mut self, handle: Handle, new_state: StateMask) -> Result<(), Error> {
        let idx = self.validate(handle)?;
        match &mut self.entries[idx] {
            Entry::Live { state, .. } => {
                *state = new_state;
                Ok(())
            }
            Entry::Free { .. } => unreachable!(),
        }
    }

    /// Admission check: handle must validate, and the slot's *current*
    /// state must intersect `allowed_mask`. The handle's own embedded
    /// mask is a fast-path hint only and is never trusted for mutation.
    pub fn admit(&self, handle: Handle, allowed_mask: StateMask) -> Result<(), Error> {
        let idx = self.validate(handle)?;
        match &self.entries[idx] {
            Entry::Live { state, .. } if state & allowed_mask != 0 => Ok(()),
            Entry::Live { .. } => Err(Error::new(ErrorKind::InvalidState)),
            Entry::Free { .. } => unreachable!(),
        }
    }

    /// Frees a slot and returns its value, incrementing (saturating) the
    /// slot's generation so every prior handle to it becomes stale.
    pub fn reclaim(&mut self, handle: Handle) -> Result<T, Error> {
        let idx = self.validate(handle)?;
        let old_generation = match &self.entries[idx] {
            Entry::Live { generation, .. } => *generation,
            Entry::Free { .. } => unreachable!(),
        };
        let bumped = old_generation.saturating_add(1);
        let old = std::mem::replace(&mut self.entries[idx], Entry::Free { generation: bumped });
        let value = match old {
            Entry::Live { value, .. } => value,
            Entry::Free { .. } => unreachable!(),
        };
        self.free_slots.insert(idx as SlotIndex);
        self.live_count -= 1;
        Ok(value)
    }

    /// Iterates over all currently live handles, in ascending slot order.
    pub fn live_handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries.iter().enumerate().filter_map(|(idx, entry)| match entry {
            Entry::Live { generation, state, .. } => {
                Some(Handle::pack(self.type_tag, *state, *generation, idx as SlotIndex))
            }
            Entry::Free { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: TypeTag = 7;

    #[test]
    fn allocate_and_get_roundtrip() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 4);
        let h = arena.allocate(0b1, 42).unwrap();
        assert_eq!(*arena.get(h).unwrap(), 42);
        assert_eq!(h.type_tag(), TAG);
        assert_eq!(h.generation(), 0);
    }

    #[test]
    fn reclaim_invalidates_prior_handle() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 4);
        let h = arena.allocate(0b1, 1).unwrap();
        arena.reclaim(h).unwrap();
        assert!(matches!(
            arena.get(h).unwrap_err().kind(),
            ErrorKind::StaleHandle
        ));
    }

    #[test]
    fn reclaimed_slot_is_reused_with_bumped_generation() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 1);
        let h0 = arena.allocate(0b1, 1).unwrap();
        arena.reclaim(h0).unwrap();
        let h1 = arena.allocate(0b1, 2).unwrap();
        assert_eq!(h0.slot(), h1.slot());
        assert_eq!(h1.generation(), h0.generation() + 1);
        assert!(arena.get(h0).is_err());
        assert_eq!(*arena.get(h1).unwrap(), 2);
    }

    #[test]
    fn allocate_reuses_lowest_free_slot_not_most_recently_reclaimed() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 4);
        let h0 = arena.allocate(0, 0).unwrap();
        let h1 = arena.allocate(0, 1).unwrap();
        let _h2 = arena.allocate(0, 2).unwrap();
        arena.reclaim(h0).unwrap();
        arena.reclaim(h1).unwrap();
        let reused = arena.allocate(0, 9).unwrap();
        assert_eq!(reused.slot(), h0.slot());
    }

    #[test]
    fn exhaustion_is_failure_atomic() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 2);
        arena.allocate(0, 1).unwrap();
        arena.allocate(0, 2).unwrap();
        let before = arena.len();
        let err = arena.allocate(0, 3).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ResourceExhausted));
        assert_eq!(arena.len(), before);
    }

    #[test]
    fn wrong_type_tag_is_not_found() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 2);
        let h = arena.allocate(0, 1).unwrap();
        let forged = Handle::pack(TAG + 1, h.state_mask(), h.generation(), h.slot());
        assert!(matches!(
            arena.get(forged).unwrap_err().kind(),
            ErrorKind::NotFound
        ));
    }

    #[test]
    fn out_of_bounds_slot_is_not_found() {
        let arena: Arena<u32> = Arena::with_capacity(TAG, 2);
        let forged = Handle::pack(TAG, 0, 0, 99);
        assert!(matches!(
            arena.get(forged).unwrap_err().kind(),
            ErrorKind::NotFound
        ));
    }

    #[test]
    fn null_handle_is_not_found() {
        let arena: Arena<u32> = Arena::with_capacity(TAG, 2);
        assert!(matches!(
            arena.get(Handle::NULL).unwrap_err().kind(),
            ErrorKind::NotFound
        ));
    }

    #[test]
    fn admit_checks_current_state_not_embedded_mask() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 2);
        let h = arena.allocate(0b01, 1).unwrap();
        // Forge a handle whose embedded mask claims a state the slot no
        // longer has; admission must still consult the live slot.
        let stale_claim = h.with_state_mask(0b10);
        arena.set_state(h, 0b10).unwrap();
        assert!(arena.admit(stale_claim, 0b10).is_ok());

        arena.set_state(h, 0b01).unwrap();
        assert!(arena.admit(stale_claim, 0b10).is_err());
    }

    #[test]
    fn capacity_minus_one_then_exactly_one_more() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 3);
        arena.allocate(0, 1).unwrap();
        arena.allocate(0, 2).unwrap();
        assert!(!arena.is_full());
        arena.allocate(0, 3).unwrap();
        assert!(arena.is_full());
    }

    #[test]
    fn live_handles_ascending_slot_order() {
        let mut arena: Arena<u32> = Arena::with_capacity(TAG, 4);
        let handles: Vec<Handle> = (0..3).map(|i| arena.allocate(0, i).unwrap()).collect();
        let observed: Vec<Handle> = arena.live_handles().collect();
        assert_eq!(observed, handles);
    }
}
