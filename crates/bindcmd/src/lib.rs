#![forbid(unsafe_code)]

//! bindcmd public facade crate.
//!
//! Commands for a data-binding layer whose `can_execute` answer is kept
//! fresh automatically: describe the guard as a [`GuardExpr`] reading one
//! property of an object that reports changes, and the command re-raises its
//! invalidation signal whenever that object changes.
//!
//! ```
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//! use bindcmd::prelude::*;
//!
//! #[derive(Default)]
//! struct Form {
//!     hub: PropertyChangedHub,
//!     valid: RefCell<bool>,
//! }
//!
//! impl Bindable for Form {
//!     fn change_channel(&self) -> Option<&dyn NotifyPropertyChanged> {
//!         Some(&self.hub)
//!     }
//! }
//!
//! let form = Rc::new(Form::default());
//! let submit = Command::<()>::builder("submit")
//!     .guard_expr(GuardExpr::property(&form, "valid", |f: &Form| *f.valid.borrow()))
//!     .handler(|_| {})
//!     .build()?;
//!
//! let raised = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&raised);
//! submit.invalidation().subscribe(move || seen.set(seen.get() + 1));
//!
//! assert!(!submit.can_execute(&()));
//! form.hub.set(&form.valid, "valid", true);
//! assert_eq!(raised.get(), 1);
//! assert!(submit.can_execute(&()));
//! # Ok::<(), bindcmd::CommandError>(())
//! ```

pub use bindcmd_core::{
    Bindable, InvalidationSource, ListenerId, NotifyPropertyChanged, OwnerId, PropertyChangedHub,
    Subscription,
};
pub use bindcmd_runtime::{
    AsyncCommand, AsyncCommandBuilder, AttachOutcome, BindableCommand, BoxError, Command,
    CommandBuilder, CommandCore, CommandError, CommandMetadata, DedupPolicy,
    DependencyDescriptor, DependencyExtractor, DependencyTracker, ExpressionError, GuardExpr,
    InvalidationScope, ObservedPropertySet, Property, Result, TrackingConfig, ValueKind,
};

pub mod prelude {
    pub use bindcmd_core as core;
    pub use bindcmd_runtime as runtime;

    pub use crate::{
        AsyncCommand, Bindable, BindableCommand, Command, CommandError, DependencyDescriptor,
        GuardExpr, NotifyPropertyChanged, Property, PropertyChangedHub, TrackingConfig,
    };
}
