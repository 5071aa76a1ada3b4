//! Signal/slot system for Canopy.
//!
//! This module provides a small, synchronous, Qt-inspired signal/slot
//! mechanism. Signals are emitted by the selection engine when its state is
//! about to change or has changed, and connected slots (callbacks) are invoked
//! immediately, in the emitting thread, before `emit` returns.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - Notification signal; slots observe `&Args`
//! - [`InterceptSignal<Args>`] - Before-notification signal; slots receive
//!   `&mut Args` and may veto or rewrite the pending change
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//!
//! # Ordering
//!
//! Slots run in the order they were connected. The slot list is snapshotted
//! before invocation, so a slot may connect or disconnect slots on the same
//! signal; such changes take effect from the next emission.
//!
//! # Example
//!
//! ```
//! use canopy_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`]
    /// or [`InterceptSignal::disconnect`]. The ID remains valid until the
    /// connection is explicitly disconnected or the signal is dropped.
    pub struct ConnectionId;
}

/// Internal storage for a single connection.
struct Connection<F: ?Sized> {
    slot: Arc<F>,
    /// Monotonic connection sequence, used to keep invocation order stable
    /// when slotmap reuses freed slots.
    order: u64,
}

type SlotStore<F> = Mutex<SlotMap<ConnectionId, Connection<F>>>;

/// Connection table shared by both signal flavours.
struct SlotTable<F: ?Sized> {
    connections: Arc<SlotStore<F>>,
    blocked: AtomicBool,
    next_order: AtomicU64,
}

impl<F: ?Sized + Send + Sync + 'static> SlotTable<F> {
    fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(SlotMap::with_key())),
            blocked: AtomicBool::new(false),
            next_order: AtomicU64::new(0),
        }
    }

    fn insert(&self, slot: Arc<F>) -> ConnectionId {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        let id = self.connections.lock().insert(Connection { slot, order });
        tracing::trace!(target: targets::SIGNAL, ?id, order, "slot connected");
        id
    }

    fn remove(&self, id: ConnectionId) -> bool {
        let removed = self.connections.lock().remove(id).is_some();
        if removed {
            tracing::trace!(target: targets::SIGNAL, ?id, "slot disconnected");
        }
        removed
    }

    fn clear(&self) {
        self.connections.lock().clear();
    }

    fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Clone the connected slots in connection order and release the lock.
    fn snapshot(&self) -> Vec<Arc<F>> {
        let connections = self.connections.lock();
        let mut slots: Vec<(u64, Arc<F>)> = connections
            .values()
            .map(|conn| (conn.order, conn.slot.clone()))
            .collect();
        drop(connections);
        slots.sort_unstable_by_key(|(order, _)| *order);
        slots.into_iter().map(|(_, slot)| slot).collect()
    }

    fn guard(&self, id: ConnectionId) -> ConnectionGuard {
        let store: Weak<dyn Disconnect> = Arc::downgrade(&self.connections) as Weak<dyn Disconnect>;
        ConnectionGuard { id, store }
    }

    fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }
}

/// Type-erased disconnection, so a guard does not carry the slot type.
trait Disconnect: Send + Sync {
    fn disconnect(&self, id: ConnectionId) -> bool;
}

impl<F: ?Sized + Send + Sync> Disconnect for SlotStore<F> {
    fn disconnect(&self, id: ConnectionId) -> bool {
        self.lock().remove(id).is_some()
    }
}

/// A type-safe signal that can have multiple connected slots.
///
/// When a signal is emitted, all connected slots are invoked with a shared
/// reference to the arguments.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a struct/tuple for richer payloads.
pub struct Signal<Args: 'static> {
    table: SlotTable<dyn Fn(&Args) + Send + Sync>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            table: SlotTable::new(),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    ///
    /// # Example
    ///
    /// ```
    /// use canopy_core::Signal;
    ///
    /// let signal = Signal::<String>::new();
    /// let id = signal.connect(|s| println!("Got: {}", s));
    /// signal.emit("Hello".to_string());
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.table.insert(Arc::new(slot))
    }

    /// Connect a slot that is disconnected when the returned guard drops.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        self.table.guard(id)
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.table.remove(id)
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.table.clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing. This is useful during
    /// batch updates to prevent cascading notifications.
    pub fn set_blocked(&self, blocked: bool) {
        self.table.set_blocked(blocked);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.table.is_blocked()
    }

    /// Emit the signal, invoking all connected slots in connection order.
    #[tracing::instrument(skip_all, target = "canopy_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let slots = self.table.snapshot();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in slots {
            slot(&args);
        }
    }
}

/// A signal whose slots may modify the emitted arguments.
///
/// Used for "about to change" notifications: every slot receives `&mut Args`
/// in connection order, so a payload with a `cancel` flag can be vetoed, or a
/// proposed value rewritten, before the emitter acts on it. [`emit`] hands the
/// (possibly modified) arguments back to the caller.
///
/// [`emit`]: InterceptSignal::emit
///
/// # Example
///
/// ```
/// use canopy_core::InterceptSignal;
///
/// let about_to_close = InterceptSignal::<bool>::new();
/// about_to_close.connect(|allow| *allow = false);
///
/// assert!(!about_to_close.emit(true));
/// ```
pub struct InterceptSignal<Args: 'static> {
    table: SlotTable<dyn Fn(&mut Args) + Send + Sync>,
}

impl<Args: 'static> Default for InterceptSignal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> InterceptSignal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            table: SlotTable::new(),
        }
    }

    /// Connect a slot that may modify the arguments.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&mut Args) + Send + Sync + 'static,
    {
        self.table.insert(Arc::new(slot))
    }

    /// Connect a slot that is disconnected when the returned guard drops.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard
    where
        F: Fn(&mut Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        self.table.guard(id)
    }

    /// Disconnect a specific slot by its connection ID.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.table.remove(id)
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.table.clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    /// Block signal emission temporarily. A blocked signal returns its
    /// arguments untouched.
    pub fn set_blocked(&self, blocked: bool) {
        self.table.set_blocked(blocked);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.table.is_blocked()
    }

    /// Pass `args` through every connected slot and return the result.
    #[tracing::instrument(skip_all, target = "canopy_core::signal", level = "trace")]
    pub fn emit(&self, mut args: Args) -> Args {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return args;
        }

        let slots = self.table.snapshot();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting intercept signal");

        for slot in slots {
            slot(&mut args);
        }
        args
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// Created via [`Signal::connect_scoped`] or [`InterceptSignal::connect_scoped`].
/// The guard holds a weak reference to the connection table, so it may
/// outlive the signal; dropping it afterwards is a no-op.
///
/// # Example
///
/// ```
/// use canopy_core::Signal;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
///
/// let signal = Signal::<i32>::new();
/// let counter = Arc::new(AtomicI32::new(0));
///
/// {
///     let counter = counter.clone();
///     let _guard = signal.connect_scoped(move |n| {
///         counter.fetch_add(*n, Ordering::SeqCst);
///     });
///     signal.emit(5);
/// }
///
/// signal.emit(10);
/// assert_eq!(counter.load(Ordering::SeqCst), 5);
/// ```
#[must_use = "dropping the guard disconnects the slot immediately"]
pub struct ConnectionGuard {
    id: ConnectionId,
    store: Weak<dyn Disconnect>,
}

impl ConnectionGuard {
    /// The connection this guard owns.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Release the guard without disconnecting, returning the raw ID.
    pub fn detach(self) -> ConnectionId {
        let id = self.id;
        std::mem::forget(self);
        id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.disconnect(self.id);
        }
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("id", &self.id)
            .field("live", &(self.store.strong_count() > 0))
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<Vec<u64>>: Send, Sync);
static_assertions::assert_impl_all!(InterceptSignal<Vec<u64>>: Send, Sync);
static_assertions::assert_impl_all!(ConnectionGuard: Send, Sync);
