//! Bounded, multi-producer, single-consumer channel with reservations.
//!
//! Sending is two-phase: [`BoundedChannel::try_reserve`] claims capacity
//! up front, returning a [`Permit`]; the permit is then resolved exactly
//! once by [`Permit::send`] or [`Permit::abort`]. This keeps the
//! `queue_len + reserved <= capacity` invariant true at every observable
//! point, including while a reservation is outstanding but not yet
//! filled.

use crate::error::{Error, ErrorKind};
use crate::types::ChannelId;
use std::collections::VecDeque;

/// An outstanding reservation of one slot in a [`BoundedChannel`]. Must be
/// resolved by [`Permit::send`] or [`Permit::abort`]; a permit dropped
/// without resolution leaves its slot permanently reserved, since the
/// channel has no drop glue back to its permits.
#[derive(Debug)]
#[must_use = "a permit must be resolved with send() or abort()"]
pub struct Permit {
    channel: ChannelId,
}

impl Permit {
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Transfers `value` onto the channel's queue and releases the
    /// reservation. If the receiver closed while the reservation was
    /// outstanding, the value is discarded, the reservation is still
    /// released, and `Disconnected` is returned.
    pub fn send<T>(self, channel: &mut BoundedChannel<T>, value: T) -> Result<(), Error> {
        debug_assert_eq!(channel.id, self.channel, "permit used against the wrong channel");
        channel.reserved = channel.reserved.saturating_sub(1);
        if channel.receiver_closed {
            return Err(ErrorKind::Disconnected.into());
        }
        channel.queue.push_back(value);
        channel.check_invariant();
        Ok(())
    }

    /// Releases the reservation without sending a value. Infallible: a
    /// reservation can always be given back.
    pub fn abort<T>(self, channel: &mut BoundedChannel<T>) {
        debug_assert_eq!(channel.id, self.channel, "permit used against the wrong channel");
        channel.reserved = channel.reserved.saturating_sub(1);
    }
}

/// A bounded FIFO channel. `capacity` bounds `queue_len + reserved` at
/// all times.
#[derive(Debug)]
pub struct BoundedChannel<T> {
    id: ChannelId,
    capacity: usize,
    queue: VecDeque<T>,
    reserved: usize,
    sender_count: usize,
    receiver_closed: bool,
}

impl<T> BoundedChannel<T> {
    #[must_use]
    pub fn new(id: ChannelId, capacity: usize) -> Self {
        Self {
            id,
            capacity: capacity.max(1),
            queue: VecDeque::with_capacity(capacity.max(1)),
            reserved: 0,
            sender_count: 1,
            receiver_closed: false,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub const fn reserved(&self) -> usize {
        self.reserved
    }

    fn check_invariant(&self) {
        debug_assert!(self.queue.len() + self.reserved <= self.capacity);
    }

    /// Registers an additional sender handle (multi-producer support).
    pub fn clone_sender(&mut self) {
        self.sender_count += 1;
    }

    /// Drops a sender handle. Once the last sender closes, `try_recv`
    /// drains the remaining queue and then reports `Disconnected`.
    /// Idempotent past zero.
    pub fn close_sender(&mut self) {
        self.sender_count = self.sender_count.saturating_sub(1);
    }

    #[must_use]
    pub const fn is_sender_closed(&self) -> bool {
        self.sender_count == 0
    }

    /// Drops the single receiver handle. Further reservations fail with
    /// `Disconnected`, and any send through a permit already outstanding
    /// also fails with `Disconnected`. Idempotent.
    pub fn close_receiver(&mut self) {
        self.receiver_closed = true;
    }

    #[must_use]
    pub const fn is_receiver_closed(&self) -> bool {
        self.receiver_closed
    }

    /// Attempts to reserve one slot. `ChannelFull` when `queue_len +
    /// reserved` is already at capacity; `Disconnected` when the
    /// receiver is closed; `InvalidState` when this channel's own
    /// sender side has already been closed.
    pub fn try_reserve(&mut self) -> Result<Permit, Error> {
        if self.is_sender_closed() {
            return Err(ErrorKind::InvalidState.into());
        }
        if self.receiver_closed {
            return Err(ErrorKind::Disconnected.into());
        }
        if self.queue.len() + self.reserved >= self.capacity {
            return Err(ErrorKind::ChannelFull.into());
        }
        self.reserved += 1;
        self.check_invariant();
        Ok(Permit { channel: self.id })
    }

    /// Attempts to receive the oldest queued value. `WouldBlock` if the
    /// queue is empty but senders remain open; `Disconnected` once the
    /// queue is empty and every sender has closed.
    pub fn try_recv(&mut self) -> Result<T, Error> {
        if let Some(value) = self.queue.pop_front() {
            return Ok(value);
        }
        if self.is_sender_closed() {
            Err(ErrorKind::Disconnected.into())
        } else {
            Err(ErrorKind::WouldBlock.into())
        }
    }

    /// Whether the channel is fully drained and every sender is closed,
    /// i.e. no further values will ever arrive.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty() && self.is_sender_closed() && self.reserved == 0
    }
}
