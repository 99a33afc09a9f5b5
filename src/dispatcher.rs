//! Message-type keyed handler dispatch.

use crate::bspc::ControlPort;
use crate::handlers::CommandHandler;
use crate::protocol::{Message, MessageType};
use crate::state::ScratchpadState;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A recognized message type arrived with no handler installed. All
    /// supported types are registered at startup, so this is a
    /// configuration fault, not something a client can trigger.
    #[error("no handler registered for message type {0:?}")]
    MissingHandler(MessageType),
}

/// Routes decoded messages to the handler for their type.
///
/// Built once at daemon startup and shared read-only across connections.
#[derive(Debug, Default)]
pub struct Dispatcher {
    handlers: HashMap<MessageType, CommandHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            handlers: HashMap::new(),
        }
    }

    /// A dispatcher with every supported request type installed.
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(MessageType::Hello, CommandHandler::Hello);
        dispatcher.register(MessageType::CurrentWindow, CommandHandler::CurrentWindow);
        dispatcher.register(MessageType::AddCurrentWindow, CommandHandler::AddCurrentWindow);
        dispatcher.register(
            MessageType::RemoveCurrentWindow,
            CommandHandler::RemoveCurrentWindow,
        );
        dispatcher.register(MessageType::ShowNextWindow, CommandHandler::ShowNextWindow);
        dispatcher.register(
            MessageType::ShowPreviousWindow,
            CommandHandler::ShowPreviousWindow,
        );
        dispatcher.register(MessageType::ShowAllWindows, CommandHandler::ShowAllWindows);
        dispatcher.register(
            MessageType::SetWindowVisibility,
            CommandHandler::SetWindowVisibility,
        );
        dispatcher
    }

    /// Install `handler` for `ty`, replacing any previous registration.
    pub fn register(&mut self, ty: MessageType, handler: CommandHandler) {
        self.handlers.insert(ty, handler);
    }

    /// Route `msg` to its handler.
    ///
    /// Handler-level failures come back as Error-typed messages, never as
    /// an `Err`; only a missing registration is an `Err`, and it should
    /// terminate the offending connection.
    pub fn dispatch<C: ControlPort>(
        &self,
        msg: &Message,
        state: &mut ScratchpadState,
        port: &mut C,
    ) -> Result<Message, DispatchError> {
        let handler = self
            .handlers
            .get(&msg.ty)
            .ok_or(DispatchError::MissingHandler(msg.ty))?;

        debug!("dispatching {:?} (id {})", msg.ty, msg.id);
        Ok(handler.execute(msg, state, port))
    }

    /// Whether every request type in `types` has a handler installed.
    pub fn covers(&self, types: &[MessageType]) -> bool {
        types.iter().all(|ty| self.handlers.contains_key(ty))
    }
}
