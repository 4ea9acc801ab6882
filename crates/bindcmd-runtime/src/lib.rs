#![forbid(unsafe_code)]

//! Runtime: dependency-tracked guards and the command engine.
//!
//! - [`expr`]: declarative guard expressions ([`GuardExpr`]).
//! - [`extract`]: static analysis of a guard into a [`DependencyDescriptor`].
//! - [`tracker`]: the per-command subscription manager.
//! - [`command`]: synchronous and asynchronous commands over one generic core.
//! - [`config`]: tracking policy knobs.

pub mod command;
pub mod config;
pub mod error;
pub mod expr;
pub mod extract;
pub mod tracker;

pub use command::{
    AsyncCommand, AsyncCommandBuilder, AsyncHandler, BindableCommand, Command, CommandBuilder,
    CommandCore, CommandMetadata, SyncHandler,
};
pub use config::{DedupPolicy, InvalidationScope, TrackingConfig};
pub use error::{BoxError, CommandError, ExpressionError, Result};
pub use expr::{BinaryOp, GuardExpr, Property, PropertyValue, Value, ValueKind};
pub use extract::{DependencyDescriptor, DependencyExtractor};
pub use tracker::{AttachOutcome, DependencyTracker, ObservedPropertySet, TrackingKey};
