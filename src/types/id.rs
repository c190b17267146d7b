//! Identifier types for runtime entities.
//!
//! Each id wraps a packed [`Handle`](crate::util::Handle) tagged with the
//! entity kind, so a handle built for the wrong arena is rejected by type
//! tag before generation is even consulted.

use crate::util::{Generation, Handle, SlotIndex, StateMask, TypeTag};
use core::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Add;
use std::time::Duration;

/// Type tag for region handles.
pub const REGION_TAG: TypeTag = 1;
/// Type tag for task handles.
pub const TASK_TAG: TypeTag = 2;
/// Type tag for obligation handles.
pub const OBLIGATION_TAG: TypeTag = 3;
/// Type tag for timer handles.
pub const TIMER_TAG: TypeTag = 4;
/// Type tag for channel handles.
pub const CHANNEL_TAG: TypeTag = 5;

macro_rules! handle_id {
    ($name:ident, $tag:expr, $prefix:literal) => {
        /// Opaque arena-backed identifier.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) Handle);

        impl $name {
            /// Wraps a raw handle already known to carry this entity's tag.
            #[must_use]
            pub(crate) const fn from_handle(handle: Handle) -> Self {
                Self(handle)
            }

            /// Returns the underlying handle.
            #[must_use]
            pub const fn handle(self) -> Handle {
                self.0
            }

            /// Builds an id directly from slot/generation, for tests and
            /// fixture replay where handles are reconstructed rather than
            /// freshly allocated.
            #[must_use]
            pub const fn new_for_test(slot: u16, generation: u16) -> Self {
                Self(Handle::pack($tag, 0, generation, slot))
            }

            #[must_use]
            pub const fn slot(self) -> SlotIndex {
                self.0.slot()
            }

            #[must_use]
            pub const fn generation(self) -> Generation {
                self.0.generation()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}:{})", stringify!($name), self.0.slot(), self.0.generation())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0.slot())
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                SerdeHandle::from(self.0).serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = SerdeHandle::deserialize(deserializer)?;
                Ok(Self(raw.to_handle()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SerdeHandle {
    type_tag: TypeTag,
    state_mask: StateMask,
    generation: Generation,
    slot: SlotIndex,
}

impl SerdeHandle {
    const fn to_handle(self) -> Handle {
        Handle::pack(self.type_tag, self.state_mask, self.generation, self.slot)
    }
}

impl From<Handle> for SerdeHandle {
    fn from(h: Handle) -> Self {
        Self {
            type_tag: h.type_tag(),
            state_mask: h.state_mask(),
            generation: h.generation(),
            slot: h.slot(),
        }
    }
}

handle_id!(RegionId, REGION_TAG, "R");
handle_id!(TaskId, TASK_TAG, "T");
handle_id!(ObligationId, OBLIGATION_TAG, "O");
handle_id!(TimerId, TIMER_TAG, "Tm");
handle_id!(ChannelId, CHANNEL_TAG, "C");

/// A logical timestamp.
///
/// In a production clock hook this tracks wall-clock nanoseconds; under a
/// deterministic logical-clock hook it is advanced explicitly by the
/// scheduler and never drifts with wall time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Time(u64);

impl Time {
    /// The zero instant.
    pub const ZERO: Self = Self(0);
    /// The maximum representable instant.
    pub const MAX: Self = Self(u64::MAX);

    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    #[inline]
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }

    #[inline]
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1_000_000_000
    }

    #[inline]
    #[must_use]
    pub const fn saturating_add_nanos(self, nanos: u64) -> Self {
        Self(self.0.saturating_add(nanos))
    }

    #[inline]
    #[must_use]
    pub const fn saturating_sub_nanos(self, nanos: u64) -> Self {
        Self(self.0.saturating_sub(nanos))
    }

    /// Duration between two times in nanoseconds, clamped to zero if
    /// `self` is earlier than `earlier` (the clock going backward under
    /// fault injection must not underflow).
    #[inline]
    #[must_use]
    pub const fn duration_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        let nanos: u64 = rhs.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.saturating_add_nanos(nanos)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({}ns)", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000_000 {
            write!(f, "{}.{:03}s", self.0 / 1_000_000_000, (self.0 / 1_000_000) % 1000)
        } else if self.0 >= 1_000_000 {
            write!(f, "{}ms", self.0 / 1_000_000)
        } else if self.0 >= 1_000 {
            write!(f, "{}us", self.0 / 1_000)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_conversions() {
        assert_eq!(Time::from_secs(1).as_nanos(), 1_000_000_000);
        assert_eq!(Time::from_millis(1).as_nanos(), 1_000_000);
    }

    #[test]
    fn time_saturates_instead_of_overflowing() {
        assert_eq!(Time::MAX.saturating_add_nanos(1), Time::MAX);
        assert_eq!(Time::ZERO.saturating_sub_nanos(1), Time::ZERO);
    }

    #[test]
    fn duration_since_clamps_backward_clock_to_zero() {
        let earlier = Time::from_secs(5);
        let later = Time::from_secs(3);
        assert_eq!(later.duration_since(earlier), 0);
    }

    #[test]
    fn region_id_display_and_debug() {
        let id = RegionId::new_for_test(3, 2);
        assert_eq!(format!("{id}"), "R3");
        let dbg = format!("{id:?}");
        assert!(dbg.contains("RegionId"));
        assert!(dbg.contains('3'));
        assert!(dbg.contains('2'));
    }

    #[test]
    fn task_id_serde_roundtrip() {
        let id = TaskId::new_for_test(42, 5);
        let json = serde_json::to_string(&id).unwrap();
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn different_entity_tags_are_distinct() {
        let region = RegionId::new_for_test(0, 0);
        let task = TaskId::new_for_test(0, 0);
        assert_ne!(region.handle().type_tag(), task.handle().type_tag());
    }

    #[test]
    fn ids_ordered_by_slot_then_generation() {
        let a = TaskId::new_for_test(1, 0);
        let b = TaskId::new_for_test(2, 0);
        assert!(a < b);
    }
}
