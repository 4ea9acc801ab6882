#![forbid(unsafe_code)]

//! Per-command dependency tracking.
//!
//! # Design
//!
//! A [`DependencyTracker`] is bound to one invalidation callback and owns
//! the [`Subscription`] guards that connect each observed owner's change
//! channel to it. The guards live exactly as long as the tracker (and
//! therefore the command), so discarding a command releases every owner
//! subscription. The callback is expected to hold only weak references back
//! into the command.
//!
//! Each owner gets one listener. Properties tracked on an owner that is
//! already subscribed join that listener's watched-name set instead of
//! subscribing again, so one change notification invalidates at most once.
//!
//! # Invariants
//!
//! 1. At most one subscription per owner instance.
//! 2. At most one recorded entry per [`TrackingKey`].
//! 3. A key already in the [`ObservedPropertySet`] is never extracted again
//!    through [`observe`](DependencyTracker::observe).
//! 4. Attaching never fails for a valid descriptor; owners without a change
//!    channel are recorded but not subscribed.
//!
//! # Failure Modes
//!
//! - **Owner without a change channel**: the guard still evaluates, it just
//!   never invalidates on its own. Logged at debug level.
//! - **Same property name on two owners** (default dedup policy): the second
//!   owner is not subscribed. Use [`DedupPolicy::OwnerAndProperty`] to key by
//!   owner as well.
//!
//! [`DedupPolicy::OwnerAndProperty`]: crate::DedupPolicy::OwnerAndProperty

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use bindcmd_core::{Bindable, OwnerId, Subscription};

use crate::config::{InvalidationScope, TrackingConfig};
use crate::error::ExpressionError;
use crate::expr::GuardExpr;
use crate::extract::{DependencyDescriptor, DependencyExtractor};

/// Identity of a tracked dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackingKey {
    Property(String),
    OwnerProperty(OwnerId, String),
}

impl TrackingKey {
    #[must_use]
    pub fn property_name(&self) -> &str {
        match self {
            Self::Property(name) | Self::OwnerProperty(_, name) => name,
        }
    }
}

/// Keys already tracked by one command, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ObservedPropertySet {
    index: AHashSet<TrackingKey>,
    order: Vec<TrackingKey>,
}

impl ObservedPropertySet {
    #[must_use]
    pub fn contains(&self, key: &TrackingKey) -> bool {
        self.index.contains(key)
    }

    /// Insert `key`; returns `false` if it was already present.
    pub fn insert(&mut self, key: TrackingKey) -> bool {
        if !self.index.insert(key.clone()) {
            return false;
        }
        self.order.push(key);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackingKey> {
        self.order.iter()
    }

    /// Tracked property names, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(TrackingKey::property_name)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.order.clear();
    }
}

/// What [`DependencyTracker::attach`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The owner was subscribed for the first time.
    Subscribed,
    /// The owner was already subscribed; the property joined its listener.
    SharedSubscription,
    /// The key was already tracked; nothing was done.
    AlreadyTracked,
    /// The owner has no change channel; the key was recorded only.
    NoChangeChannel,
}

type Target = Rc<dyn Fn()>;

/// One owner's subscription and the property names its listener reacts to.
struct OwnerWatch {
    watched: Rc<RefCell<AHashSet<String>>>,
    // Keeps the owner alive so its `OwnerId` cannot be reused while keyed.
    _owner: Rc<dyn Bindable>,
    _subscription: Subscription,
}

/// Subscription manager for one command.
pub struct DependencyTracker {
    config: TrackingConfig,
    extractor: DependencyExtractor,
    target: Target,
    observed: RefCell<ObservedPropertySet>,
    owners: RefCell<AHashMap<OwnerId, OwnerWatch>>,
}

impl fmt::Debug for DependencyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("config", &self.config)
            .field("observed", &self.observed.borrow().len())
            .field("subscriptions", &self.subscription_count())
            .field("extractions", &self.extractions())
            .finish()
    }
}

impl DependencyTracker {
    /// A tracker that calls `on_invalidate` when a tracked owner changes.
    pub fn new(config: TrackingConfig, on_invalidate: impl Fn() + 'static) -> Self {
        Self {
            config,
            extractor: DependencyExtractor::new(),
            target: Rc::new(on_invalidate),
            observed: RefCell::new(ObservedPropertySet::default()),
            owners: RefCell::new(AHashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> TrackingConfig {
        self.config
    }

    /// Extract a descriptor through this tracker's extractor.
    pub fn extract<P: 'static>(
        &self,
        expr: &GuardExpr,
    ) -> Result<DependencyDescriptor<P>, ExpressionError> {
        self.extractor.extract(expr)
    }

    /// Track the descriptor's property on its owner.
    pub fn attach<P>(&self, descriptor: &DependencyDescriptor<P>) -> AttachOutcome {
        let property = descriptor.property_name();
        let owner_id = descriptor.owner_id();
        let key = self.config.dedup.key(owner_id, property);
        if !self.observed.borrow_mut().insert(key) {
            tracing::debug!(message = "bindcmd.track.skipped", property);
            return AttachOutcome::AlreadyTracked;
        }

        if let Some(watch) = self.owners.borrow().get(&owner_id) {
            watch.watched.borrow_mut().insert(property.to_owned());
            tracing::debug!(message = "bindcmd.track.shared", property);
            return AttachOutcome::SharedSubscription;
        }

        let Some(channel) = descriptor.owner().change_channel() else {
            tracing::debug!(
                message = "bindcmd.track.degraded",
                property,
                owner = descriptor.owner().type_name()
            );
            return AttachOutcome::NoChangeChannel;
        };

        let watched = Rc::new(RefCell::new(AHashSet::from_iter([property.to_owned()])));
        let target = Rc::clone(&self.target);
        let listener: Rc<dyn Fn(&str)> = match self.config.scope {
            InvalidationScope::AnyChange => Rc::new(move |_: &str| target()),
            InvalidationScope::ObservedProperty => {
                let watched = Rc::clone(&watched);
                Rc::new(move |changed: &str| {
                    if watched.borrow().contains(changed) {
                        target();
                    }
                })
            }
        };

        let subscription = channel.subscribe_changes(listener);
        self.owners.borrow_mut().insert(
            owner_id,
            OwnerWatch {
                watched,
                _owner: Rc::clone(descriptor.owner()),
                _subscription: subscription,
            },
        );
        tracing::debug!(
            message = "bindcmd.track",
            property,
            scope = ?self.config.scope
        );
        AttachOutcome::Subscribed
    }

    /// Track the dependency `expr` describes.
    ///
    /// When the expression's key is already tracked, extraction is skipped
    /// and [`AttachOutcome::AlreadyTracked`] is returned.
    pub fn observe<P: 'static>(&self, expr: &GuardExpr) -> Result<AttachOutcome, ExpressionError> {
        if let Some(key) = self.peek_key(expr)
            && self.observed.borrow().contains(&key)
        {
            tracing::debug!(
                message = "bindcmd.track.skipped",
                property = key.property_name()
            );
            return Ok(AttachOutcome::AlreadyTracked);
        }
        let descriptor = self.extract::<P>(expr)?;
        Ok(self.attach(&descriptor))
    }

    /// Key of `expr` when it has the accepted shape, without extracting.
    fn peek_key(&self, expr: &GuardExpr) -> Option<TrackingKey> {
        let GuardExpr::Property {
            base: Some(base),
            property,
        } = expr
        else {
            return None;
        };
        let GuardExpr::Constant(owner) = base.as_ref() else {
            return None;
        };
        if property.is_static() {
            return None;
        }
        Some(self.config.dedup.key(OwnerId::of(owner), property.name()))
    }

    /// Release every subscription and forget every tracked key.
    /// Returns how many owner subscriptions were released.
    pub fn detach_all(&self) -> usize {
        let released = std::mem::take(&mut *self.owners.borrow_mut()).len();
        self.observed.borrow_mut().clear();
        released
    }

    /// Snapshot of the tracked keys.
    #[must_use]
    pub fn observed_properties(&self) -> ObservedPropertySet {
        self.observed.borrow().clone()
    }

    /// Number of live owner subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.owners.borrow().len()
    }

    /// Number of expression extractions performed.
    #[must_use]
    pub fn extractions(&self) -> u64 {
        self.extractor.invocations()
    }
}
