//! Fixed-capacity single-producer single-consumer ring buffer.
//!
//! [`SpscRing::split`] hands out one [`Producer`] and one [`Consumer`]. The
//! producer is the only writer of `head`, the consumer the only writer of
//! `tail`. Slot contents are published with a `Release` store of the index
//! and observed with an `Acquire` load, so the two halves can live in
//! different tasks or interrupt contexts without a lock.
//!
//! Both indices run over `0..2N`, which tells "full" apart from "empty"
//! without wasting a slot and works for any capacity.

use core::cell::UnsafeCell;
use portable_atomic::{AtomicUsize, Ordering};

/// Lock-free SPSC ring of `N` slots.
pub struct SpscRing<T, const N: usize> {
    slots: UnsafeCell<[T; N]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// Slots are only written through the unique Producer and only read through
// the unique Consumer, and never the same slot concurrently.
unsafe impl<T: Send, const N: usize> Sync for SpscRing<T, N> {}

impl<T: Copy, const N: usize> SpscRing<T, N> {
    /// Create an empty ring. `fill` initialises slots that have never been written.
    pub const fn new(fill: T) -> Self {
        assert!(N > 0, "ring capacity must be non-zero");
        Self {
            slots: UnsafeCell::new([fill; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Split into the producer and consumer halves.
    ///
    /// The mutable borrow guarantees at most one of each exists at a time.
    ///
    /// ```
    /// use procon_core::ring::SpscRing;
    ///
    /// let mut ring: SpscRing<u8, 4> = SpscRing::new(0);
    /// let (mut tx, mut rx) = ring.split();
    /// tx.enqueue(1).unwrap();
    /// tx.enqueue(2).unwrap();
    /// assert_eq!(rx.dequeue(), Some(1));
    /// assert_eq!(rx.dequeue(), Some(2));
    /// assert_eq!(rx.dequeue(), None);
    /// ```
    pub fn split(&mut self) -> (Producer<'_, T, N>, Consumer<'_, T, N>) {
        let ring: &Self = self;
        (Producer { ring }, Consumer { ring })
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        (head + 2 * N - tail) % (2 * N)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn slot_ptr(&self, position: usize) -> *mut T {
        // position < 2N, so the index is always in bounds
        (self.slots.get() as *mut T).wrapping_add(position % N)
    }

    #[inline]
    const fn next(position: usize) -> usize {
        (position + 1) % (2 * N)
    }

    #[inline]
    const fn advance(position: usize, count: usize) -> usize {
        (position + count) % (2 * N)
    }
}

/// Writing half of an [`SpscRing`].
pub struct Producer<'a, T, const N: usize> {
    ring: &'a SpscRing<T, N>,
}

impl<T: Copy, const N: usize> Producer<'_, T, N> {
    /// Append one item, or hand it back if the ring is full.
    pub fn enqueue(&mut self, item: T) -> Result<(), T> {
        let head = self.ring.head.load(Ordering::Relaxed);
        if self.used(head) >= N {
            return Err(item);
        }
        // SAFETY: the slot at `head` is outside the consumer's readable range
        // until the store below publishes it.
        unsafe { self.ring.slot_ptr(head).write(item) };
        self.ring
            .head
            .store(SpscRing::<T, N>::next(head), Ordering::Release);
        Ok(())
    }

    /// Append all items or none of them.
    ///
    /// The consumer observes the whole run at once, never a prefix.
    pub fn enqueue_all(&mut self, items: &[T]) -> Result<(), ()> {
        let head = self.ring.head.load(Ordering::Relaxed);
        if N - self.used(head) < items.len() {
            return Err(());
        }
        let mut position = head;
        for &item in items {
            // SAFETY: every written slot is free (checked above) and unpublished.
            unsafe { self.ring.slot_ptr(position).write(item) };
            position = SpscRing::<T, N>::next(position);
        }
        self.ring.head.store(
            SpscRing::<T, N>::advance(head, items.len()),
            Ordering::Release,
        );
        Ok(())
    }

    /// Slots available right now. May only grow until the next enqueue.
    pub fn free_space(&self) -> usize {
        N - self.used(self.ring.head.load(Ordering::Relaxed))
    }

    /// Current write position, in `0..2N`.
    pub fn position(&self) -> usize {
        self.ring.head.load(Ordering::Relaxed)
    }

    #[inline]
    fn used(&self, head: usize) -> usize {
        let tail = self.ring.tail.load(Ordering::Acquire);
        (head + 2 * N - tail) % (2 * N)
    }
}

/// Reading half of an [`SpscRing`].
pub struct Consumer<'a, T, const N: usize> {
    ring: &'a SpscRing<T, N>,
}

impl<T: Copy, const N: usize> Consumer<'_, T, N> {
    /// Take the oldest item.
    pub fn dequeue(&mut self) -> Option<T> {
        let tail = self.ring.tail.load(Ordering::Relaxed);
        let head = self.ring.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        // SAFETY: the Acquire load above makes the producer's write visible,
        // and the producer will not reuse the slot until tail moves past it.
        let item = unsafe { self.ring.slot_ptr(tail).read() };
        self.ring
            .tail
            .store(SpscRing::<T, N>::next(tail), Ordering::Release);
        Some(item)
    }

    /// Items available to read.
    pub fn len(&self) -> usize {
        let tail = self.ring.tail.load(Ordering::Relaxed);
        let head = self.ring.head.load(Ordering::Acquire);
        (head + 2 * N - tail) % (2 * N)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current read position, in `0..2N`.
    pub fn position(&self) -> usize {
        self.ring.tail.load(Ordering::Relaxed)
    }
}
