#![forbid(unsafe_code)]

//! Change-notification channels.
//!
//! # Design
//!
//! An object that can report property changes implements
//! [`NotifyPropertyChanged`]. Most do so by embedding a
//! [`PropertyChangedHub`] and delegating to it. Subscribers are stored as
//! `Weak` callbacks; the strong reference lives in the returned
//! [`Subscription`], so dropping the guard unsubscribes. Dead entries are
//! pruned lazily during notification.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. [`PropertyChangedHub::set`] with a value equal to the current one is a
//!    no-op (no notification).
//! 3. Dropping a [`Subscription`] removes its callback before the next
//!    notification cycle.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Callback invoked with the name of the property that changed.
pub type ChangeListener = Rc<dyn Fn(&str)>;

/// An object whose property changes can be observed.
pub trait NotifyPropertyChanged {
    /// Register `listener` for every property change on this object.
    ///
    /// The listener stays registered while the returned [`Subscription`]
    /// is alive.
    fn subscribe_changes(&self, listener: ChangeListener) -> Subscription;
}

/// An object a command guard may read from.
///
/// The default implementation reports no change channel, which means a
/// guard reading this object still evaluates correctly but never
/// invalidates on its own.
///
/// ```
/// use bindcmd_core::{Bindable, NotifyPropertyChanged, PropertyChangedHub};
///
/// #[derive(Default)]
/// struct Settings {
///     changes: PropertyChangedHub,
/// }
///
/// impl Bindable for Settings {
///     fn change_channel(&self) -> Option<&dyn NotifyPropertyChanged> {
///         Some(&self.changes)
///     }
/// }
/// ```
pub trait Bindable: Any {
    /// The object's change channel, if it has one.
    fn change_channel(&self) -> Option<&dyn NotifyPropertyChanged> {
        None
    }

    /// Concrete type name, for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Identity of a shared owner instance (its allocation address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(usize);

impl OwnerId {
    /// Identity of the instance behind `owner`.
    #[must_use]
    pub fn of<T: ?Sized>(owner: &Rc<T>) -> Self {
        Self(Rc::as_ptr(owner).cast::<()>() as usize)
    }

    /// Get the raw address value.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

/// RAII guard for a change-channel registration.
///
/// Dropping the guard unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    listener: Option<ChangeListener>,
}

impl Subscription {
    /// Wrap the strong half of a registration whose channel holds a
    /// `Weak` to `listener`.
    pub fn new(listener: ChangeListener) -> Self {
        Self {
            listener: Some(listener),
        }
    }

    /// A subscription attached to nothing.
    pub fn inert() -> Self {
        Self { listener: None }
    }

    /// Whether this guard still keeps a listener registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    /// Unsubscribe now. Equivalent to dropping the guard.
    pub fn cancel(mut self) {
        self.listener = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A change channel objects embed to implement [`NotifyPropertyChanged`].
#[derive(Default)]
pub struct PropertyChangedHub {
    subscribers: RefCell<Vec<Weak<dyn Fn(&str)>>>,
}

impl fmt::Debug for PropertyChangedHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChangedHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl PropertyChangedHub {
    /// Create a hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it receives the name of each changed property.
    pub fn subscribe(&self, listener: impl Fn(&str) + 'static) -> Subscription {
        self.subscribe_changes(Rc::new(listener))
    }

    /// Report that `property` changed.
    pub fn notify(&self, property: &str) {
        let live: Vec<ChangeListener> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            listener(property);
        }
    }

    /// Store `value` into `slot` and notify, unless it equals the current
    /// value. Returns whether a change was made.
    pub fn set<T: PartialEq>(&self, slot: &RefCell<T>, property: &str, value: T) -> bool {
        {
            let mut current = slot.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify(property);
        true
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl NotifyPropertyChanged for PropertyChangedHub {
    fn subscribe_changes(&self, listener: ChangeListener) -> Subscription {
        self.subscribers.borrow_mut().push(Rc::downgrade(&listener));
        Subscription::new(listener)
    }
}
