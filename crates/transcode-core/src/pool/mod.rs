//! Bounded pool of perceptual codec sessions
//!
//! A [`SessionPool`] owns a fixed number of sessions of one direction and one
//! [`SessionConfig`], all created up front. Callers borrow a session through a
//! [`SessionLease`], which hands it back when dropped. When every session is
//! on loan, [`SessionPool::acquire`] blocks; waiters are served in arrival
//! order.
//!
//! ## Lifecycle
//!
//! - creation: eager; if any session fails to create, the ones already
//!   created are destroyed and the error is returned
//! - [`SessionPool::close`]: destroys idle sessions, fails pending and future
//!   acquires with [`TranscodeError::PoolClosed`], and destroys sessions on
//!   loan when their lease is dropped
//! - dropping the last pool handle and lease destroys whatever is left
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "sim")]
//! # fn main() -> transcode_core::Result<()> {
//! use transcode_core::engine::sim::SimCodec;
//! use std::sync::Arc;
//! use transcode_core::{SessionConfig, SessionPool};
//!
//! let pool = SessionPool::encoders(Arc::new(SimCodec::new()), SessionConfig::new(8000, 1), 2)?;
//! let lease = pool.acquire()?;
//! assert_eq!(pool.stats().on_loan, 1);
//! drop(lease);
//! assert_eq!(pool.stats().idle, 2);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sim"))]
//! # fn main() {}
//! ```

mod cancel;

pub use cancel::CancelToken;

use crate::engine::PerceptualCodec;
use crate::error::{Result, TranscodeError};
use crate::types::{Direction, SessionConfig, SessionId};
use crate::utils::validation;
use cancel::WakeWaiters;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// A session together with its pool-unique identifier
struct PooledSession<S> {
    id: SessionId,
    session: S,
}

struct PoolState<S> {
    idle: VecDeque<PooledSession<S>>,
    on_loan: HashSet<SessionId>,
    /// Tickets of blocked acquires, oldest first
    waiters: VecDeque<u64>,
    next_ticket: u64,
    closed: bool,
    destroyed: usize,
    acquired_total: u64,
}

impl<S> PoolState<S> {
    fn leave_queue(&mut self, ticket: u64) {
        self.waiters.retain(|&t| t != ticket);
    }
}

struct Shared<C: PerceptualCodec> {
    codec: Arc<C>,
    config: SessionConfig,
    direction: Direction,
    capacity: usize,
    state: Mutex<PoolState<C::Session>>,
    available: Condvar,
}

impl<C: PerceptualCodec> Shared<C> {
    fn check_in(&self, pooled: PooledSession<C::Session>) {
        let mut state = self.state.lock();

        let was_on_loan = state.on_loan.remove(&pooled.id);
        if !was_on_loan {
            drop(state);
            debug_assert!(was_on_loan, "{} returned but not on loan", pooled.id);
            warn!(
                "{} {} returned to a pool that did not lend it, destroying it",
                self.direction, pooled.id
            );
            self.codec.destroy_session(pooled.session);
            return;
        }

        if state.closed {
            state.destroyed += 1;
            let outstanding = state.on_loan.len();
            drop(state);
            self.codec.destroy_session(pooled.session);
            debug!(
                "Destroyed late-returned {} {} ({} still on loan)",
                self.direction, pooled.id, outstanding
            );
            return;
        }

        trace!("Released {} {}", self.direction, pooled.id);
        state.idle.push_back(pooled);
        self.available.notify_all();
    }
}

impl<C: PerceptualCodec> WakeWaiters for Shared<C> {
    fn wake_all(&self) {
        let _state = self.state.lock();
        self.available.notify_all();
    }
}

impl<C: PerceptualCodec> Drop for Shared<C> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let remaining = state.idle.len();
        for pooled in state.idle.drain(..) {
            self.codec.destroy_session(pooled.session);
        }
        if remaining > 0 {
            debug!(
                "Destroyed {} idle {} session(s) on pool drop",
                remaining, self.direction
            );
        }
    }
}

/// Deadline `timeout` from now, or `None` if it overflows `Instant`
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Snapshot of pool accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Sessions created at startup
    pub capacity: usize,
    /// Sessions ready to be borrowed
    pub idle: usize,
    /// Sessions currently lent out
    pub on_loan: usize,
    /// Acquires currently blocked
    pub waiting: usize,
    /// Sessions destroyed by close or late return
    pub destroyed: usize,
    /// Whether `close` has been called
    pub closed: bool,
    /// Successful acquires since creation
    pub acquired_total: u64,
}

/// Result of [`SessionPool::close`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseSummary {
    /// Idle sessions destroyed by this call
    pub destroyed: usize,
    /// Leases still outstanding; their sessions are destroyed on return
    pub outstanding: usize,
}

/// Bounded, thread-safe pool of codec sessions of one direction
///
/// Cloning yields another handle to the same pool.
pub struct SessionPool<C: PerceptualCodec> {
    shared: Arc<Shared<C>>,
}

impl<C: PerceptualCodec> Clone for SessionPool<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: PerceptualCodec> SessionPool<C> {
    /// Create a pool of `capacity` sessions
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero capacity or if the engine
    /// fails to create any session. Sessions created before the failure are
    /// destroyed first.
    pub fn new(
        codec: Arc<C>,
        config: SessionConfig,
        direction: Direction,
        capacity: usize,
    ) -> Result<Self> {
        validation::validate_capacity(capacity)?;

        let mut idle = VecDeque::with_capacity(capacity);
        for index in 0..capacity {
            match codec.create_session(direction, &config) {
                Ok(session) => idle.push_back(PooledSession {
                    id: SessionId(index as u64),
                    session,
                }),
                Err(e) => {
                    warn!(
                        "Failed to create {} {} of {}: {}; rolling back",
                        direction,
                        index + 1,
                        capacity,
                        e
                    );
                    for pooled in idle.drain(..) {
                        codec.destroy_session(pooled.session);
                    }
                    return Err(e);
                }
            }
        }

        info!(
            "Created {} pool: {} {} session(s), {}Hz, {} channel(s)",
            codec.name(),
            capacity,
            direction,
            config.sample_rate,
            config.channels
        );

        Ok(Self {
            shared: Arc::new(Shared {
                codec,
                config,
                direction,
                capacity,
                state: Mutex::new(PoolState {
                    idle,
                    on_loan: HashSet::with_capacity(capacity),
                    waiters: VecDeque::new(),
                    next_ticket: 0,
                    closed: false,
                    destroyed: 0,
                    acquired_total: 0,
                }),
                available: Condvar::new(),
            }),
        })
    }

    /// Create a pool of encoder sessions
    pub fn encoders(codec: Arc<C>, config: SessionConfig, capacity: usize) -> Result<Self> {
        Self::new(codec, config, Direction::Encode, capacity)
    }

    /// Create a pool of decoder sessions
    pub fn decoders(codec: Arc<C>, config: SessionConfig, capacity: usize) -> Result<Self> {
        Self::new(codec, config, Direction::Decode, capacity)
    }

    /// Direction of every session in the pool
    pub fn direction(&self) -> Direction {
        self.shared.direction
    }

    /// Configuration every session was created with
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Number of sessions the pool was created with
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// The engine shared by every session
    pub fn codec(&self) -> &Arc<C> {
        &self.shared.codec
    }

    /// Borrow a session, blocking until one is available
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError::PoolClosed`] if the pool is or becomes closed.
    pub fn acquire(&self) -> Result<SessionLease<C>> {
        self.acquire_inner(None, None)
    }

    /// Borrow a session, giving up after `timeout`
    ///
    /// A timeout too large to express as a deadline waits without one.
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError::AcquireTimedOut`] if no session became
    /// available in time, or [`TranscodeError::PoolClosed`].
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<SessionLease<C>> {
        self.acquire_inner(deadline_after(timeout), None)
    }

    /// Borrow a session, giving up when `token` is cancelled
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError::AcquireCancelled`] or
    /// [`TranscodeError::PoolClosed`].
    pub fn acquire_cancellable(&self, token: &CancelToken) -> Result<SessionLease<C>> {
        self.acquire_inner(None, Some(token))
    }

    /// Borrow a session with an optional timeout and cancellation token
    pub fn acquire_with(
        &self,
        timeout: Option<Duration>,
        token: Option<&CancelToken>,
    ) -> Result<SessionLease<C>> {
        self.acquire_inner(timeout.and_then(deadline_after), token)
    }

    /// Borrow a session only if one is available right now
    ///
    /// Never overtakes blocked waiters.
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError::PoolClosed`] if the pool is closed.
    pub fn try_acquire(&self) -> Result<Option<SessionLease<C>>> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(TranscodeError::PoolClosed);
        }
        if !state.waiters.is_empty() {
            return Ok(None);
        }
        Ok(self.grant(&mut state))
    }

    fn acquire_inner(
        &self,
        deadline: Option<Instant>,
        token: Option<&CancelToken>,
    ) -> Result<SessionLease<C>> {
        if let Some(token) = token {
            let shared: Weak<Shared<C>> = Arc::downgrade(&self.shared);
            token.register(shared as Weak<dyn WakeWaiters>);
        }

        let started = Instant::now();
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(TranscodeError::PoolClosed);
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiters.push_back(ticket);

        loop {
            if state.closed {
                state.leave_queue(ticket);
                return Err(TranscodeError::PoolClosed);
            }

            if token.is_some_and(CancelToken::is_cancelled) {
                state.leave_queue(ticket);
                self.shared.available.notify_all();
                debug!("{} acquire cancelled", self.shared.direction);
                return Err(TranscodeError::AcquireCancelled);
            }

            if state.waiters.front() == Some(&ticket) {
                if let Some(lease) = self.grant(&mut state) {
                    state.waiters.pop_front();
                    if !state.idle.is_empty() && !state.waiters.is_empty() {
                        self.shared.available.notify_all();
                    }
                    return Ok(lease);
                }
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        state.leave_queue(ticket);
                        self.shared.available.notify_all();
                        let waited = started.elapsed();
                        debug!("{} acquire timed out after {:?}", self.shared.direction, waited);
                        return Err(TranscodeError::AcquireTimedOut { waited });
                    }
                    self.shared.available.wait_until(&mut state, deadline);
                }
                None => self.shared.available.wait(&mut state),
            }
        }
    }

    fn grant(&self, state: &mut MutexGuard<'_, PoolState<C::Session>>) -> Option<SessionLease<C>> {
        let pooled = state.idle.pop_front()?;
        state.on_loan.insert(pooled.id);
        state.acquired_total += 1;
        trace!("Lent {} {}", self.shared.direction, pooled.id);

        Some(SessionLease {
            shared: Arc::clone(&self.shared),
            pooled: Some(pooled),
        })
    }

    /// Close the pool
    ///
    /// Destroys every idle session and wakes blocked acquires with
    /// [`TranscodeError::PoolClosed`]. Sessions still on loan are destroyed
    /// when their lease is dropped. Closing twice is a no-op.
    pub fn close(&self) -> CloseSummary {
        let (sessions, outstanding) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return CloseSummary {
                    destroyed: 0,
                    outstanding: state.on_loan.len(),
                };
            }
            state.closed = true;
            let sessions: Vec<_> = state.idle.drain(..).collect();
            state.destroyed += sessions.len();
            self.shared.available.notify_all();
            (sessions, state.on_loan.len())
        };

        let destroyed = sessions.len();
        for pooled in sessions {
            self.shared.codec.destroy_session(pooled.session);
        }

        if outstanding > 0 {
            warn!(
                "Closed {} pool with {} lease(s) outstanding; they will be destroyed on return",
                self.shared.direction, outstanding
            );
        }
        info!(
            "Closed {} pool: destroyed {} idle session(s)",
            self.shared.direction, destroyed
        );

        CloseSummary {
            destroyed,
            outstanding,
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Snapshot of the pool accounting
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            capacity: self.shared.capacity,
            idle: state.idle.len(),
            on_loan: state.on_loan.len(),
            waiting: state.waiters.len(),
            destroyed: state.destroyed,
            closed: state.closed,
            acquired_total: state.acquired_total,
        }
    }
}

impl<C: PerceptualCodec> fmt::Debug for SessionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("engine", &self.shared.codec.name())
            .field("direction", &self.shared.direction)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Exclusive use of one pooled session
///
/// The session goes back to the pool when the lease is dropped or
/// [`released`](SessionLease::release); a lease cannot be released twice.
pub struct SessionLease<C: PerceptualCodec> {
    shared: Arc<Shared<C>>,
    pooled: Option<PooledSession<C::Session>>,
}

impl<C: PerceptualCodec> SessionLease<C> {
    fn pooled(&self) -> &PooledSession<C::Session> {
        match &self.pooled {
            Some(pooled) => pooled,
            None => unreachable!("session lease used after release"),
        }
    }

    /// Identifier of the borrowed session
    pub fn id(&self) -> SessionId {
        self.pooled().id
    }

    /// Direction of the borrowed session
    pub fn direction(&self) -> Direction {
        self.shared.direction
    }

    /// Configuration the session was created with
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// The engine that owns the session
    pub fn codec(&self) -> &C {
        &self.shared.codec
    }

    /// The engine and the borrowed session, for calling into the engine
    pub fn parts_mut(&mut self) -> (&C, &mut C::Session) {
        match &mut self.pooled {
            Some(pooled) => (&*self.shared.codec, &mut pooled.session),
            None => unreachable!("session lease used after release"),
        }
    }

    /// Whether this lease was handed out by `pool`
    pub fn belongs_to(&self, pool: &SessionPool<C>) -> bool {
        Arc::ptr_eq(&self.shared, &pool.shared)
    }

    /// Return the session to its pool
    pub fn release(self) {
        drop(self);
    }
}

impl<C: PerceptualCodec> Drop for SessionLease<C> {
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            self.shared.check_in(pooled);
        }
    }
}

impl<C: PerceptualCodec> fmt::Debug for SessionLease<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLease")
            .field("id", &self.id())
            .field("direction", &self.shared.direction)
            .finish()
    }
}
