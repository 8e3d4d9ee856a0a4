//! Bounded pool of call tickets
//!
//! Every in-flight call task holds exactly one [`Ticket`]. Taking a ticket
//! suspends while the pool is exhausted, which is what throttles fan-out
//! when the callee is slow.

use crate::error::{GenError, GenResult};

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Fixed-capacity pool of interchangeable tickets
#[derive(Debug, Clone)]
pub struct TicketPool {
    semaphore: Arc<Semaphore>,
    capacity: u32,
}

impl TicketPool {
    /// Create a pool holding `capacity` tickets
    ///
    /// # Errors
    /// Returns [`GenError::Tickets`] if `capacity` is zero or exceeds what the
    /// platform semaphore can hold.
    pub fn new(capacity: u32) -> GenResult<Self> {
        if capacity == 0 || capacity as usize > Semaphore::MAX_PERMITS {
            return Err(GenError::Tickets(capacity));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
        })
    }

    /// Wait for a ticket and take it
    ///
    /// # Errors
    /// Returns [`GenError::PoolClosed`] if the pool was closed.
    pub async fn take(&self) -> GenResult<Ticket> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GenError::PoolClosed)?;
        Ok(Ticket { _permit: permit })
    }

    /// Tickets currently available
    ///
    /// Advisory only: concurrent takers may change it immediately.
    pub fn remainder(&self) -> u32 {
        self.semaphore.available_permits() as u32
    }

    /// Tickets currently taken
    pub fn in_use(&self) -> u32 {
        self.capacity.saturating_sub(self.remainder())
    }

    /// Total number of tickets
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether tickets can still be taken
    pub fn is_active(&self) -> bool {
        !self.semaphore.is_closed()
    }

    /// Close the pool, failing current and future [`take`](Self::take) calls
    ///
    /// Tickets already taken stay valid and are still returned on drop.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// One unit of allowed concurrency
///
/// The ticket goes back to its pool when dropped, so it can be returned at
/// most once and is still returned if the holder unwinds.
#[derive(Debug)]
#[must_use = "dropping a ticket returns it to the pool immediately"]
pub struct Ticket {
    _permit: OwnedSemaphorePermit,
}

impl Ticket {
    /// Return the ticket to its pool
    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(TicketPool::new(0), Err(GenError::Tickets(0))));
    }

    #[test]
    fn test_new_pool_is_full() {
        let pool = TicketPool::new(3).unwrap();
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.remainder(), 3);
        assert_eq!(pool.in_use(), 0);
        assert!(pool.is_active());
    }

    #[tokio::test]
    async fn test_take_and_return() {
        let pool = TicketPool::new(2).unwrap();

        let a = pool.take().await.unwrap();
        let b = pool.take().await.unwrap();
        assert_eq!(pool.remainder(), 0);
        assert_eq!(pool.in_use(), 2);

        a.release();
        assert_eq!(pool.remainder(), 1);
        drop(b);
        assert_eq!(pool.remainder(), 2);
    }

    #[tokio::test]
    async fn test_remainder_never_exceeds_capacity() {
        let pool = TicketPool::new(2).unwrap();
        for _ in 0..10 {
            let ticket = pool.take().await.unwrap();
            ticket.release();
        }
        assert_eq!(pool.remainder(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_waits_for_return() {
        let pool = TicketPool::new(1).unwrap();
        let held = pool.take().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.take().await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        held.release();
        waiter.await.unwrap().unwrap();
        assert_eq!(pool.remainder(), 1);
    }

    #[tokio::test]
    async fn test_close_fails_waiters() {
        let pool = TicketPool::new(1).unwrap();
        let held = pool.take().await.unwrap();

        pool.close();
        assert!(!pool.is_active());
        assert!(matches!(pool.take().await, Err(GenError::PoolClosed)));

        // Outstanding tickets are still returned
        drop(held);
        assert_eq!(pool.remainder(), 1);
    }

    #[tokio::test]
    async fn test_ticket_returned_when_holder_panics() {
        let pool = TicketPool::new(1).unwrap();
        let ticket = pool.take().await.unwrap();

        let handle = tokio::spawn(async move {
            let _ticket = ticket;
            panic!("task fault");
        });
        assert!(handle.await.is_err());
        assert_eq!(pool.remainder(), 1);
    }
}
