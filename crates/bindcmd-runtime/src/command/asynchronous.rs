use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::error::{BoxError, CommandError, Result};

use super::{BindableCommand, CommandBuilder, CommandCore};

type Outcome = std::result::Result<(), BoxError>;

/// Stored asynchronous execution callback.
pub type AsyncHandler<P> = Box<dyn Fn(P) -> LocalBoxFuture<'static, Outcome>>;

/// Builder for [`AsyncCommand`].
pub type AsyncCommandBuilder<P> = CommandBuilder<P, AsyncHandler<P>>;

/// A command whose callbacks return futures.
///
/// `execute` starts every callback immediately, in registration order, and
/// returns one future that completes when all of them have. The command
/// counts executions in flight; dropping the returned future ends one.
pub struct AsyncCommand<P> {
    core: CommandCore<P>,
    handlers: Vec<AsyncHandler<P>>,
    in_flight: Rc<Cell<usize>>,
}

impl<P> fmt::Debug for AsyncCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCommand")
            .field("core", &self.core)
            .field("handlers", &self.handlers.len())
            .field("in_flight", &self.in_flight.get())
            .finish()
    }
}

struct BusyGuard(Rc<Cell<usize>>);

impl BusyGuard {
    fn enter(counter: &Rc<Cell<usize>>) -> Self {
        counter.set(counter.get() + 1);
        Self(Rc::clone(counter))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl<P: Clone + 'static> AsyncCommand<P> {
    /// Start building a command named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> AsyncCommandBuilder<P> {
        CommandBuilder::new(name)
    }

    /// Start every callback and join them.
    ///
    /// The guard is not consulted. All callbacks run to completion; the
    /// first error in registration order is reported.
    pub fn execute(&self, parameter: P) -> LocalBoxFuture<'static, Result<()>> {
        tracing::trace!(
            message = "bindcmd.execute",
            command = self.core.name(),
            handlers = self.handlers.len()
        );
        let pending: Vec<_> = self
            .handlers
            .iter()
            .map(|handler| handler(parameter.clone()))
            .collect();
        let busy = BusyGuard::enter(&self.in_flight);

        async move {
            let _busy = busy;
            for outcome in future::join_all(pending).await {
                outcome.map_err(CommandError::Handler)?;
            }
            Ok(())
        }
        .boxed_local()
    }

    /// Execute only if the guard allows it; otherwise the returned future
    /// resolves to [`CommandError::NotExecutable`] without running anything.
    pub fn try_execute(&self, parameter: P) -> LocalBoxFuture<'static, Result<()>> {
        if !self.core.can_execute(&parameter) {
            return future::ready(Err(self.core.not_executable())).boxed_local();
        }
        self.execute(parameter)
    }

    /// Execute on `spawner` without awaiting. Failures are logged.
    pub fn execute_detached<S>(&self, parameter: P, spawner: &S) -> Result<()>
    where
        S: LocalSpawn + ?Sized,
    {
        let command = self.core.name().to_owned();
        let run = self.execute(parameter);
        spawner.spawn_local(async move {
            if let Err(err) = run.await {
                tracing::warn!(message = "bindcmd.execute.failed", command, error = %err);
            }
        })?;
        Ok(())
    }
}

impl<P> AsyncCommand<P> {
    /// Whether any execution is still in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.get() > 0
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl<P: 'static> BindableCommand<P> for AsyncCommand<P> {
    fn core(&self) -> &CommandCore<P> {
        &self.core
    }
}

impl<P: Clone + 'static> CommandBuilder<P, AsyncHandler<P>> {
    /// Add an infallible callback.
    #[must_use]
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(P) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.push_handler(Box::new(move |parameter: P| {
            handler(parameter).map(Ok::<(), BoxError>).boxed_local()
        }));
        self
    }

    /// Add a fallible callback.
    #[must_use]
    pub fn try_handler<F, Fut, E>(mut self, handler: F) -> Self
    where
        F: Fn(P) -> Fut + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + 'static,
        E: Into<BoxError> + 'static,
    {
        self.push_handler(Box::new(move |parameter: P| {
            handler(parameter)
                .map(|outcome| outcome.map_err(|err| -> BoxError { err.into() }))
                .boxed_local()
        }));
        self
    }

    /// Build the command, compiling and subscribing its guard.
    pub fn build(self) -> Result<AsyncCommand<P>> {
        let (core, handlers) = self.into_parts()?;
        Ok(AsyncCommand {
            core,
            handlers,
            in_flight: Rc::new(Cell::new(0)),
        })
    }
}
