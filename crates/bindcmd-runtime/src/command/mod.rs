#![forbid(unsafe_code)]

//! Bindable commands.
//!
//! A command pairs one or more execution callbacks with an optional guard and
//! an [`InvalidationSource`] the binding layer listens on. Every variant is a
//! thin wrapper over one generic [`CommandCore<P>`]:
//!
//! - [`Command<P>`]: synchronous callbacks, run in registration order.
//! - [`AsyncCommand<P>`]: future-returning callbacks, started together and
//!   joined.
//!
//! `P` is the parameter type; parameterless commands use `()`.
//!
//! # Guards
//!
//! | builder method | guard | invalidates on its own |
//! |---|---|---|
//! | *(none)* | always executable | no |
//! | [`guard`](CommandBuilder::guard) | closure | no, call `raise_can_execute_changed` |
//! | [`guard_expr`](CommandBuilder::guard_expr) | compiled [`GuardExpr`] | yes |
//! | [`guard_dependency`](CommandBuilder::guard_dependency) | explicit [`DependencyDescriptor`] | yes |
//!
//! # Invariants
//!
//! - A command cannot be built without at least one execution callback.
//! - `execute` does not consult the guard; `try_execute` does.
//! - Owner subscriptions are released when the command is dropped.

mod asynchronous;
mod sync;

pub use asynchronous::{AsyncCommand, AsyncCommandBuilder, AsyncHandler};
pub use sync::{Command, SyncHandler};

use std::fmt;
use std::rc::Rc;

use bindcmd_core::InvalidationSource;

use crate::config::TrackingConfig;
use crate::error::{CommandError, Result};
use crate::expr::GuardExpr;
use crate::extract::DependencyDescriptor;
use crate::tracker::DependencyTracker;

/// Descriptive data attached to every command for tracing and UI display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    /// Identifier used in logs and errors (e.g., "save").
    pub name: String,
    /// Human-readable description for UI (e.g., "Save document").
    pub description: Option<String>,
}

impl CommandMetadata {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self::new("command")
    }
}

type Guard<P> = Rc<dyn Fn(&P) -> bool>;

/// Guard, invalidation signal and dependency tracker shared by all variants.
pub struct CommandCore<P> {
    metadata: CommandMetadata,
    guard: Option<Guard<P>>,
    invalidation: Rc<InvalidationSource>,
    tracker: DependencyTracker,
}

impl<P> fmt::Debug for CommandCore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCore")
            .field("metadata", &self.metadata)
            .field("guarded", &self.guard.is_some())
            .field("invalidation", &self.invalidation)
            .field("tracker", &self.tracker)
            .finish()
    }
}

impl<P> CommandCore<P> {
    /// A core with no guard and nothing tracked.
    #[must_use]
    pub fn unguarded(metadata: CommandMetadata, config: TrackingConfig) -> Self {
        let invalidation = Rc::new(InvalidationSource::new());
        let tracker = DependencyTracker::new(config, invalidator(&invalidation));
        Self {
            metadata,
            guard: None,
            invalidation,
            tracker,
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    /// Evaluate the guard; unguarded commands are always executable.
    pub fn can_execute(&self, parameter: &P) -> bool {
        self.guard.as_ref().is_none_or(|guard| guard(parameter))
    }

    #[must_use]
    pub fn invalidation(&self) -> &InvalidationSource {
        &self.invalidation
    }

    /// Tell listeners that `can_execute` may have changed.
    pub fn raise_can_execute_changed(&self) {
        self.invalidation.raise();
    }

    #[must_use]
    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    pub(crate) fn not_executable(&self) -> CommandError {
        CommandError::NotExecutable {
            command: self.metadata.name.clone(),
        }
    }
}

/// Callback raising `source`, holding it weakly.
fn invalidator(source: &Rc<InvalidationSource>) -> impl Fn() + 'static {
    let weak = Rc::downgrade(source);
    move || {
        if let Some(source) = weak.upgrade() {
            source.raise();
        }
    }
}

/// What the binding layer needs from any command.
pub trait BindableCommand<P: 'static> {
    fn core(&self) -> &CommandCore<P>;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn can_execute(&self, parameter: &P) -> bool {
        self.core().can_execute(parameter)
    }

    /// Signal raised when `can_execute` may answer differently.
    fn invalidation(&self) -> &InvalidationSource {
        self.core().invalidation()
    }

    fn raise_can_execute_changed(&self) {
        self.core().raise_can_execute_changed();
    }
}

enum GuardSpec<P> {
    Always,
    Predicate(Guard<P>),
    Tracked(GuardExpr),
    Dependency(DependencyDescriptor<P>),
}

enum Observation<P> {
    Expr(GuardExpr),
    Dependency(DependencyDescriptor<P>),
}

/// Builder shared by every command variant; `H` is the handler type.
pub struct CommandBuilder<P, H = SyncHandler<P>> {
    metadata: CommandMetadata,
    config: TrackingConfig,
    guard: GuardSpec<P>,
    observations: Vec<Observation<P>>,
    handlers: Vec<H>,
}

impl<P: 'static, H> CommandBuilder<P, H> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: CommandMetadata::new(name),
            config: TrackingConfig::default(),
            guard: GuardSpec::Always,
            observations: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Set the UI description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Set the dependency-tracking configuration.
    #[must_use]
    pub fn config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    /// Guard with a plain closure. Nothing is tracked.
    #[must_use]
    pub fn guard(mut self, guard: impl Fn(&P) -> bool + 'static) -> Self {
        self.guard = GuardSpec::Predicate(Rc::new(guard));
        self
    }

    /// Guard with a tracked expression: the command invalidates whenever the
    /// owner the expression reads from reports a change.
    #[must_use]
    pub fn guard_expr(mut self, expr: GuardExpr) -> Self {
        self.guard = GuardSpec::Tracked(expr);
        self
    }

    /// Guard with an explicitly declared dependency.
    #[must_use]
    pub fn guard_dependency(mut self, dependency: DependencyDescriptor<P>) -> Self {
        self.guard = GuardSpec::Dependency(dependency);
        self
    }

    /// Also invalidate when the dependency `expr` describes changes.
    #[must_use]
    pub fn observe(mut self, expr: GuardExpr) -> Self {
        self.observations.push(Observation::Expr(expr));
        self
    }

    /// Also invalidate when `dependency` changes.
    #[must_use]
    pub fn observe_dependency(mut self, dependency: DependencyDescriptor<P>) -> Self {
        self.observations.push(Observation::Dependency(dependency));
        self
    }

    pub(crate) fn push_handler(&mut self, handler: H) {
        self.handlers.push(handler);
    }

    /// Validate handlers, then compile and wire the guard and observations.
    pub(crate) fn into_parts(self) -> Result<(CommandCore<P>, Vec<H>)> {
        if self.handlers.is_empty() {
            return Err(CommandError::MissingExecutionCallback {
                command: self.metadata.name,
            });
        }

        let mut core = CommandCore::unguarded(self.metadata, self.config);
        core.guard = match self.guard {
            GuardSpec::Always => None,
            GuardSpec::Predicate(guard) => Some(guard),
            GuardSpec::Tracked(expr) => {
                let descriptor = core.tracker.extract::<P>(&expr)?;
                core.tracker.attach(&descriptor);
                Some(descriptor.predicate())
            }
            GuardSpec::Dependency(descriptor) => {
                core.tracker.attach(&descriptor);
                Some(descriptor.predicate())
            }
        };

        for observation in self.observations {
            match observation {
                Observation::Expr(expr) => {
                    core.tracker.observe::<P>(&expr)?;
                }
                Observation::Dependency(descriptor) => {
                    core.tracker.attach(&descriptor);
                }
            }
        }

        Ok((core, self.handlers))
    }
}
