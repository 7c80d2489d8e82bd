//! Typed publish/subscribe bus with deferred mutation and queued nesting.
//!
//! The bus is owned by its host (normally the `World`) and handlers receive
//! `&mut` access to that host, so they can read state, apply effects and
//! publish further signals.
//!
//! # Reentrancy
//!
//! - A signal published while any dispatch is running is appended to a FIFO
//!   queue. The outermost [`publish`] drains the queue, so delivery is
//!   breadth-first and no handler ever runs inside another handler's frame.
//! - Dispatch iterates a scratch copy of the subscription list. Unsubscribe
//!   and clear requests made during dispatch are recorded and applied once
//!   the current signal has been delivered to every handler in the copy.
//!   Subscriptions added during dispatch see the next signal, not this one.
//!
//! # Duplicates
//!
//! Subscribing the same handler twice yields two subscriptions and two
//! invocations per signal. Nothing is deduplicated.
//!
//! A handler that panics unwinds out of the outermost `publish`. Signals
//! still queued at that point are dropped, deferred unsubscribes are applied
//! and the bus accepts new signals again.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{trace, warn};

use crate::bus::signal::{Signal, SignalKind};
use crate::core::config::BusConfig;

/// Callback invoked for every delivered signal of its kind.
pub type SignalHandler<C> = Rc<dyn Fn(&Signal, &mut C)>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Anything that owns an [`EventBus`] over itself.
pub trait SignalHost: Sized + 'static {
    fn bus(&self) -> &EventBus<Self>;
    fn bus_mut(&mut self) -> &mut EventBus<Self>;
}

struct Subscription<C> {
    id: SubscriptionId,
    handler: SignalHandler<C>,
}

impl<C> Clone for Subscription<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Rc::clone(&self.handler),
        }
    }
}

/// The signal bus. One subscription list per [`SignalKind`].
pub struct EventBus<C> {
    subscriptions: AHashMap<SignalKind, Vec<Subscription<C>>>,

    /// Signals waiting for delivery while a dispatch is in progress.
    queue: VecDeque<Signal>,

    dispatching: bool,

    /// Unsubscribe requests made during dispatch.
    pending_removals: Vec<(SignalKind, SubscriptionId)>,

    /// Clear requested during dispatch; holds the first id NOT covered by it.
    pending_clear: Option<u64>,

    /// Reused between dispatches so delivery does not allocate once warm.
    scratch: Vec<Subscription<C>>,

    next_id: u64,
    published: u64,
    dispatched: u64,
    trace_signals: bool,
    queue_warn_threshold: usize,
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("kinds", &self.subscriptions.len())
            .field("queued", &self.queue.len())
            .field("dispatching", &self.dispatching)
            .field("published", &self.published)
            .field("dispatched", &self.dispatched)
            .finish_non_exhaustive()
    }
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self::new(&BusConfig::default())
    }
}

impl<C> EventBus<C> {
    pub fn new(config: &BusConfig) -> Self {
        Self {
            subscriptions: AHashMap::new(),
            queue: VecDeque::new(),
            dispatching: false,
            pending_removals: Vec::new(),
            pending_clear: None,
            scratch: Vec::new(),
            next_id: 1,
            published: 0,
            dispatched: 0,
            trace_signals: config.trace_signals,
            queue_warn_threshold: config.queue_warn_threshold.max(1),
        }
    }

    /// Register a handler for one signal kind.
    pub fn subscribe(&mut self, kind: SignalKind, handler: SignalHandler<C>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions
            .entry(kind)
            .or_default()
            .push(Subscription { id, handler });
        id
    }

    /// Remove a subscription. During dispatch the removal is deferred until
    /// the current signal has been delivered.
    ///
    /// Returns false (and logs) if no such subscription exists.
    pub fn unsubscribe(&mut self, kind: SignalKind, id: SubscriptionId) -> bool {
        let exists = self
            .subscriptions
            .get(&kind)
            .is_some_and(|list| list.iter().any(|s| s.id == id));
        if !exists {
            warn!(target: "sim_kernel::bus", ?kind, ?id, "unsubscribe of unknown subscription ignored");
            return false;
        }

        if self.dispatching {
            self.pending_removals.push((kind, id));
        } else {
            self.remove_now(kind, id);
        }
        true
    }

    /// Drop every subscription. Deferred while dispatching; subscriptions
    /// made after the request survive it.
    pub fn clear(&mut self) {
        if self.dispatching {
            self.pending_clear = Some(self.next_id);
        } else {
            self.subscriptions.clear();
        }
    }

    pub fn subscriber_count(&self, kind: SignalKind) -> usize {
        self.subscriptions.get(&kind).map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Total signals handed to `publish`
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Total signals delivered (including those with no subscribers)
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched
    }

    fn remove_now(&mut self, kind: SignalKind, id: SubscriptionId) {
        if let Some(list) = self.subscriptions.get_mut(&kind) {
            if let Some(pos) = list.iter().position(|s| s.id == id) {
                list.remove(pos);
            }
            if list.is_empty() {
                self.subscriptions.remove(&kind);
            }
        }
    }

    fn apply_deferred(&mut self) {
        if let Some(watermark) = self.pending_clear.take() {
            for list in self.subscriptions.values_mut() {
                list.retain(|s| s.id.0 >= watermark);
            }
            self.subscriptions.retain(|_, list| !list.is_empty());
        }
        let mut removals = std::mem::take(&mut self.pending_removals);
        for (kind, id) in removals.drain(..) {
            self.remove_now(kind, id);
        }
        self.pending_removals = removals;
    }
}

/// Publish a signal on the host's bus.
///
/// Outside of a dispatch this delivers the signal, then every signal that
/// handlers publish in response, before returning. Inside a dispatch it
/// only enqueues.
pub fn publish<C: SignalHost>(host: &mut C, signal: Signal) {
    {
        let bus = host.bus_mut();
        bus.published += 1;
        bus.queue.push_back(signal);
        if bus.dispatching {
            return;
        }
        bus.dispatching = true;
    }

    let drained = panic::catch_unwind(AssertUnwindSafe(|| drain(host)));

    let bus = host.bus_mut();
    bus.dispatching = false;
    if let Err(payload) = drained {
        let dropped = bus.queue.len();
        bus.queue.clear();
        bus.apply_deferred();
        warn!(target: "sim_kernel::bus", dropped, "handler panicked; undelivered signals dropped");
        panic::resume_unwind(payload);
    }
}

fn drain<C: SignalHost>(host: &mut C) {
    let mut warned = false;
    loop {
        let bus = host.bus_mut();
        let Some(signal) = bus.queue.pop_front() else {
            break;
        };
        if !warned && bus.queue.len() >= bus.queue_warn_threshold {
            warn!(
                target: "sim_kernel::bus",
                queued = bus.queue.len(),
                "signal queue is very long; content may be publishing in a cycle"
            );
            warned = true;
        }
        dispatch(host, &signal);
    }
}

fn dispatch<C: SignalHost>(host: &mut C, signal: &Signal) {
    let kind = signal.kind();
    let mut batch = {
        let bus = host.bus_mut();
        bus.dispatched += 1;
        if bus.trace_signals {
            trace!(target: "sim_kernel::bus", ?signal, "dispatch");
        }
        let mut batch = std::mem::take(&mut bus.scratch);
        if let Some(list) = bus.subscriptions.get(&kind) {
            batch.extend(list.iter().cloned());
        }
        batch
    };

    for sub in &batch {
        (sub.handler)(signal, host);
    }

    batch.clear();
    let bus = host.bus_mut();
    bus.scratch = batch;
    bus.apply_deferred();
}
