use std::fmt;

use crate::error::{BoxError, CommandError, Result};

use super::{BindableCommand, CommandBuilder, CommandCore, CommandMetadata};
use crate::config::TrackingConfig;

/// Stored synchronous execution callback.
pub type SyncHandler<P> = Box<dyn Fn(&P) -> std::result::Result<(), BoxError>>;

/// A command whose callbacks run to completion on the caller's stack.
pub struct Command<P> {
    core: CommandCore<P>,
    handlers: Vec<SyncHandler<P>>,
}

impl<P> fmt::Debug for Command<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("core", &self.core)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<P: 'static> Command<P> {
    /// Start building a command named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> CommandBuilder<P> {
        CommandBuilder::new(name)
    }

    /// An unguarded command with a single callback.
    pub fn new(handler: impl Fn(&P) + 'static) -> Self {
        Self {
            core: CommandCore::unguarded(CommandMetadata::default(), TrackingConfig::default()),
            handlers: vec![wrap(handler)],
        }
    }
}

impl<P> Command<P> {
    /// Run every callback in registration order.
    ///
    /// The guard is not consulted. The first failing callback stops the
    /// rest; callbacks already run are not undone.
    pub fn execute(&self, parameter: &P) -> Result<()> {
        tracing::trace!(
            message = "bindcmd.execute",
            command = self.core.name(),
            handlers = self.handlers.len()
        );
        for handler in &self.handlers {
            handler(parameter).map_err(CommandError::Handler)?;
        }
        Ok(())
    }

    /// Execute only if the guard allows it.
    pub fn try_execute(&self, parameter: &P) -> Result<()> {
        if !self.core.can_execute(parameter) {
            return Err(self.core.not_executable());
        }
        self.execute(parameter)
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl<P: 'static> BindableCommand<P> for Command<P> {
    fn core(&self) -> &CommandCore<P> {
        &self.core
    }
}

fn wrap<P: 'static>(handler: impl Fn(&P) + 'static) -> SyncHandler<P> {
    Box::new(move |parameter: &P| -> std::result::Result<(), BoxError> {
        handler(parameter);
        Ok(())
    })
}

impl<P: 'static> CommandBuilder<P, SyncHandler<P>> {
    /// Add an infallible callback.
    #[must_use]
    pub fn handler(mut self, handler: impl Fn(&P) + 'static) -> Self {
        self.push_handler(wrap(handler));
        self
    }

    /// Add a fallible callback.
    #[must_use]
    pub fn try_handler<E>(
        mut self,
        handler: impl Fn(&P) -> std::result::Result<(), E> + 'static,
    ) -> Self
    where
        E: Into<BoxError>,
    {
        self.push_handler(Box::new(move |parameter: &P| {
            handler(parameter).map_err(|err| -> BoxError { err.into() })
        }));
        self
    }

    /// Build the command, compiling and subscribing its guard.
    pub fn build(self) -> Result<Command<P>> {
        let (core, handlers) = self.into_parts()?;
        Ok(Command { core, handlers })
    }
}
