#![forbid(unsafe_code)]

//! Core: invalidation signals and change-notification channels.
//!
//! This crate provides the two leaf primitives the command runtime builds on:
//!
//! - [`InvalidationSource`]: a multicast "state may have changed" signal with
//!   zero-argument listeners, raised synchronously in registration order.
//! - [`PropertyChangedHub`]: a ready-made change channel that objects embed to
//!   implement [`NotifyPropertyChanged`]. Subscribers are held weakly and
//!   released through RAII [`Subscription`] guards.
//!
//! [`Bindable`] is the capability query: any object a command guard reads
//! from implements it, and overrides [`Bindable::change_channel`] when it can
//! report changes.
//!
//! # Architecture
//!
//! Everything is single-threaded: shared state lives in `Rc<RefCell<..>>`
//! and the types are `!Send`. Nothing here locks.

pub mod notify;
pub mod signal;

pub use notify::{Bindable, NotifyPropertyChanged, OwnerId, PropertyChangedHub, Subscription};
pub use signal::{InvalidationSource, ListenerId};
