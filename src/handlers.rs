//! One handler per message type.
//!
//! Handlers read and mutate the shared [`ScratchpadState`] and drive window
//! visibility through the [`ControlPort`]. They never touch framing: every
//! execution produces a response message, with handler-level failures
//! converted into Error-typed replies carrying the underlying detail.
//!
//! List mutations are deliberately not rolled back when a later port call
//! fails; a removal that already happened stands even if showing the next
//! window errors out.

use crate::bspc::ControlPort;
use crate::protocol::{CurrentWindowPayload, Message, MessageType, SetVisibilityPayload};
use crate::state::ScratchpadState;
use anyhow::{Context, Result};
use tracing::debug;

/// The closed set of command handlers, one per request type.
///
/// The message type set is fixed at compile time, so dispatch is a plain
/// match rather than trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandHandler {
    Hello,
    CurrentWindow,
    AddCurrentWindow,
    RemoveCurrentWindow,
    ShowNextWindow,
    ShowPreviousWindow,
    ShowAllWindows,
    SetWindowVisibility,
}

impl CommandHandler {
    /// Run this handler for `msg`, returning either a success response of
    /// the same type or an Error response; both echo the request id.
    pub fn execute<C: ControlPort>(
        &self,
        msg: &Message,
        state: &mut ScratchpadState,
        port: &mut C,
    ) -> Message {
        let result = match self {
            CommandHandler::Hello => Ok(Message::reply(MessageType::Hello, msg.id)),
            CommandHandler::CurrentWindow => current_window(msg, port),
            CommandHandler::AddCurrentWindow => add_current_window(msg, state, port),
            CommandHandler::RemoveCurrentWindow => remove_current_window(msg, state, port),
            CommandHandler::ShowNextWindow => cycle(msg, state, port, true),
            CommandHandler::ShowPreviousWindow => cycle(msg, state, port, false),
            CommandHandler::ShowAllWindows => show_all_windows(msg, state, port),
            CommandHandler::SetWindowVisibility => set_window_visibility(msg, port),
        };

        result.unwrap_or_else(|e| Message::error(msg.id, format!("{e:#}")))
    }
}

fn current_window<C: ControlPort>(msg: &Message, port: &mut C) -> Result<Message> {
    let id = port.focused_window_id().context("failed to get window")?;
    let window = port.window_info(id).context("failed to get window")?;

    Message::reply_with(MessageType::CurrentWindow, msg.id, &CurrentWindowPayload { window })
}

fn add_current_window<C: ControlPort>(
    msg: &Message,
    state: &mut ScratchpadState,
    port: &mut C,
) -> Result<Message> {
    let focused = port.focused_window_id().context("failed to get window")?;

    state.add(focused);
    debug!("windows: {:?}", state.windows());

    // With a single tracked window there is nothing to switch away from, so
    // it stays visible; once a second window joins, the newcomer is hidden
    // so exactly one tracked window remains shown.
    if state.len() > 1 {
        port.hide(focused).context("failed to hide window")?;
    }

    Ok(Message::reply(MessageType::AddCurrentWindow, msg.id))
}

fn remove_current_window<C: ControlPort>(
    msg: &Message,
    state: &mut ScratchpadState,
    port: &mut C,
) -> Result<Message> {
    let focused = port.focused_window_id().context("failed to get window")?;

    state.remove(focused);
    debug!("windows: {:?} (removed {focused})", state.windows());

    // The last tracked window is gone, nothing left to show.
    if state.is_empty() {
        return Ok(Message::reply(MessageType::RemoveCurrentWindow, msg.id));
    }

    // Down to a single tracked window: make sure it is visible.
    if state.len() == 1 {
        let survivor = state.windows()[0];
        let info = port.window_info(survivor).context("failed to get window")?;
        port.show(info.id).context("failed to show window")?;
        return Ok(Message::reply(MessageType::RemoveCurrentWindow, msg.id));
    }

    // Advance the pre-removal cursor with wraparound against the shortened
    // list. When the removed window was not at the cursor this can skip or
    // repeat a neighbour; that quirk is part of the contract. The removed
    // window is not hidden here, it is presumed already gone.
    let next = state.next_index();
    let next_id = state.windows()[next];
    let info = port.window_info(next_id).context("failed to get window")?;
    port.show(info.id).context("failed to show next window")?;
    state.set_cursor(next);

    Ok(Message::reply(MessageType::RemoveCurrentWindow, msg.id))
}

/// Shared body of ShowNextWindow and ShowPreviousWindow.
fn cycle<C: ControlPort>(
    msg: &Message,
    state: &mut ScratchpadState,
    port: &mut C,
    forward: bool,
) -> Result<Message> {
    let reply_ty = if forward {
        MessageType::ShowNextWindow
    } else {
        MessageType::ShowPreviousWindow
    };

    // No tracked windows, noop.
    let Some(current_id) = state.current() else {
        return Ok(Message::reply(reply_ty, msg.id));
    };

    let current = port.window_info(current_id).context("failed to get window")?;

    // Single tracked window, always show it. Never hide it.
    if state.len() == 1 {
        port.show(current.id).context("failed to show window")?;
        return Ok(Message::reply(reply_ty, msg.id));
    }

    let target_idx = if forward {
        state.next_index()
    } else {
        state.prev_index()
    };
    let target_id = state.windows()[target_idx];
    let target = port.window_info(target_id).context("failed to get window")?;

    // Hide before show; if the hide fails the cursor must not move and the
    // show is not attempted.
    port.hide(current.id).context("failed to hide current window")?;
    port.show(target.id).context("failed to show window")?;
    state.set_cursor(target_idx);

    Ok(Message::reply(reply_ty, msg.id))
}

fn show_all_windows<C: ControlPort>(
    msg: &Message,
    state: &mut ScratchpadState,
    port: &mut C,
) -> Result<Message> {
    // Fail fast: an error aborts the sweep without touching the remaining
    // windows. No hides, no cursor change.
    for &id in state.windows() {
        let info = port.window_info(id).context("failed to get window")?;
        port.show(info.id).context("failed to show window")?;
    }

    Ok(Message::reply(MessageType::ShowAllWindows, msg.id))
}

fn set_window_visibility<C: ControlPort>(msg: &Message, port: &mut C) -> Result<Message> {
    let payload: SetVisibilityPayload = msg.payload().context("failed to decode payload")?;

    // An unconditional override: no membership check against the tracked
    // set, no cursor movement.
    let info = port.window_info(payload.id).context("failed to get window")?;
    port.set_hidden(info.id, !payload.visible)
        .context("failed to set window visibility")?;

    Ok(Message::reply(MessageType::SetWindowVisibility, msg.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bspc::ControlPortError;
    use crate::protocol::{ErrorPayload, WindowId, WindowInfo};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        FocusedId,
        Info(WindowId),
        SetHidden(WindowId, bool),
    }

    /// Recording mock for the window control port.
    #[derive(Default)]
    struct MockPort {
        /// Focused window id; None makes the focused query fail.
        focused: Option<WindowId>,
        /// Ids for which `window_info` fails.
        fail_info: Vec<WindowId>,
        /// (id, hidden) pairs for which `set_hidden` fails.
        fail_set_hidden: Vec<(WindowId, bool)>,
        calls: Vec<Call>,
    }

    impl MockPort {
        fn focused(id: WindowId) -> Self {
            MockPort {
                focused: Some(id),
                ..Default::default()
            }
        }

        fn shows_and_hides(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::SetHidden(..)))
                .collect()
        }
    }

    fn port_error(what: &str) -> ControlPortError {
        ControlPortError::Command {
            command: format!("bspc {what}"),
            stderr: "boom".into(),
        }
    }

    impl ControlPort for MockPort {
        fn focused_window_id(&mut self) -> Result<WindowId, ControlPortError> {
            self.calls.push(Call::FocusedId);
            self.focused.ok_or_else(|| port_error("query -N"))
        }

        fn window_info(&mut self, id: WindowId) -> Result<WindowInfo, ControlPortError> {
            self.calls.push(Call::Info(id));
            if self.fail_info.contains(&id) {
                return Err(port_error("query -T"));
            }
            Ok(WindowInfo {
                id,
                hidden: false,
                rest: serde_json::Map::new(),
            })
        }

        fn set_hidden(&mut self, id: WindowId, hidden: bool) -> Result<(), ControlPortError> {
            self.calls.push(Call::SetHidden(id, hidden));
            if self.fail_set_hidden.contains(&(id, hidden)) {
                return Err(port_error("node --flag"));
            }
            Ok(())
        }
    }

    fn state_with(windows: &[WindowId], cursor: usize) -> ScratchpadState {
        let mut state = ScratchpadState::new();
        for &id in windows {
            state.add(id);
        }
        if !windows.is_empty() {
            state.set_cursor(cursor);
        }
        state
    }

    fn run(
        handler: CommandHandler,
        ty: MessageType,
        state: &mut ScratchpadState,
        port: &mut MockPort,
    ) -> Message {
        handler.execute(&Message::request(ty, 77), state, port)
    }

    fn assert_ok(reply: &Message, ty: MessageType) {
        assert_eq!(reply.ty, ty, "unexpected reply: {reply:?}");
        assert_eq!(reply.id, 77);
    }

    fn assert_error(reply: &Message) -> String {
        assert_eq!(reply.ty, MessageType::Error);
        assert_eq!(reply.id, 77);
        let payload: ErrorPayload = reply.payload().unwrap();
        payload.details
    }

    #[test]
    fn test_hello_echoes_id() {
        let mut state = ScratchpadState::new();
        let mut port = MockPort::default();
        let reply = run(CommandHandler::Hello, MessageType::Hello, &mut state, &mut port);
        assert_ok(&reply, MessageType::Hello);
        assert!(port.calls.is_empty());
    }

    #[test]
    fn test_current_window_returns_focused_info() {
        let mut state = ScratchpadState::new();
        let mut port = MockPort::focused(42);
        let reply = run(
            CommandHandler::CurrentWindow,
            MessageType::CurrentWindow,
            &mut state,
            &mut port,
        );
        assert_ok(&reply, MessageType::CurrentWindow);
        let payload: CurrentWindowPayload = reply.payload().unwrap();
        assert_eq!(payload.window.id, 42);
        assert_eq!(port.calls, vec![Call::FocusedId, Call::Info(42)]);
    }

    #[test]
    fn test_current_window_port_failure_is_error_reply() {
        let mut state = ScratchpadState::new();
        let mut port = MockPort::default();
        let reply = run(
            CommandHandler::CurrentWindow,
            MessageType::CurrentWindow,
            &mut state,
            &mut port,
        );
        let details = assert_error(&reply);
        assert!(details.contains("failed to get window"), "{details}");
    }

    #[test]
    fn test_add_first_window_stays_visible() {
        let mut state = ScratchpadState::new();
        let mut port = MockPort::focused(10);
        let reply = run(
            CommandHandler::AddCurrentWindow,
            MessageType::AddCurrentWindow,
            &mut state,
            &mut port,
        );
        assert_ok(&reply, MessageType::AddCurrentWindow);
        assert_eq!(state.windows(), &[10]);
        assert!(port.shows_and_hides().is_empty());
    }

    #[test]
    fn test_add_second_window_is_hidden() {
        let mut state = state_with(&[1], 0);
        let mut port = MockPort::focused(2);
        let reply = run(
            CommandHandler::AddCurrentWindow,
            MessageType::AddCurrentWindow,
            &mut state,
            &mut port,
        );
        assert_ok(&reply, MessageType::AddCurrentWindow);
        assert_eq!(state.windows(), &[1, 2]);
        assert_eq!(state.cursor(), 0);
        assert_eq!(port.shows_and_hides(), vec![&Call::SetHidden(2, true)]);
    }

    #[test]
    fn test_add_is_idempotent_on_membership() {
        let mut state = state_with(&[1], 0);
        let mut port = MockPort::focused(2);
        for _ in 0..2 {
            run(
                CommandHandler::AddCurrentWindow,
                MessageType::AddCurrentWindow,
                &mut state,
                &mut port,
            );
        }
        assert_eq!(state.windows(), &[1, 2]);
        // The visibility side effect still ran both times.
        assert_eq!(
            port.shows_and_hides(),
            vec![&Call::SetHidden(2, true), &Call::SetHidden(2, true)]
        );
    }

    #[test]
    fn test_remove_last_window_is_quiet() {
        let mut state = state_with(&[5], 0);
        let mut port = MockPort::focused(5);
        let reply = run(
            CommandHandler::RemoveCurrentWindow,
            MessageType::RemoveCurrentWindow,
            &mut state,
            &mut port,
        );
        assert_ok(&reply, MessageType::RemoveCurrentWindow);
        assert!(state.is_empty());
        assert!(port.shows_and_hides().is_empty());
    }

    #[test]
    fn test_remove_down_to_one_shows_survivor() {
        let mut state = state_with(&[1, 2], 0);
        let mut port = MockPort::focused(1);
        let reply = run(
            CommandHandler::RemoveCurrentWindow,
            MessageType::RemoveCurrentWindow,
            &mut state,
            &mut port,
        );
        assert_ok(&reply, MessageType::RemoveCurrentWindow);
        assert_eq!(state.windows(), &[2]);
        // The survivor is shown; the removed window is not hidden (it is
        // presumed already gone).
        assert_eq!(port.shows_and_hides(), vec![&Call::SetHidden(2, false)]);
    }

    #[test]
    fn test_remove_advances_pre_removal_cursor() {
        let mut state = state_with(&[1, 2, 3], 0);
        let mut port = MockPort::focused(1);
        run(
            CommandHandler::RemoveCurrentWindow,
            MessageType::RemoveCurrentWindow,
            &mut state,
            &mut port,
        );
        assert_eq!(state.windows(), &[2, 3]);
        // next = (0 + 1) % 2 = 1 -> window 3 shown.
        assert_eq!(state.cursor(), 1);
        assert_eq!(port.shows_and_hides(), vec![&Call::SetHidden(3, false)]);
    }

    #[test]
    fn test_remove_wraparound_quirk_when_removed_window_not_at_cursor() {
        // Known quirk: the pre-removal cursor is wrapped against the
        // post-removal length, which can skip a neighbour when the removed
        // window was not the one at the cursor.
        let mut state = state_with(&[1, 2, 3], 2);
        let mut port = MockPort::focused(2);
        let reply = run(
            CommandHandler::RemoveCurrentWindow,
            MessageType::RemoveCurrentWindow,
            &mut state,
            &mut port,
        );
        assert_ok(&reply, MessageType::RemoveCurrentWindow);
        assert_eq!(state.windows(), &[1, 3]);
        // next = (2 + 1) % 2 = 1 -> window 3 shown, not window 1.
        assert_eq!(state.cursor(), 1);
        assert_eq!(port.shows_and_hides(), vec![&Call::SetHidden(3, false)]);
    }

    #[test]
    fn test_remove_untracked_focus_still_rotates() {
        // Removing a window that was never tracked leaves the list alone
        // but still advances the rotation.
        let mut state = state_with(&[1, 2], 0);
        let mut port = MockPort::focused(9);
        run(
            CommandHandler::RemoveCurrentWindow,
            MessageType::RemoveCurrentWindow,
            &mut state,
            &mut port,
        );
        assert_eq!(state.windows(), &[1, 2]);
        assert_eq!(state.cursor(), 1);
    }

    #[test]
    fn test_remove_show_failure_keeps_list_mutation() {
        let mut state = state_with(&[1, 2, 3], 0);
        let mut port = MockPort::focused(1);
        port.fail_set_hidden.push((3, false));
        let reply = run(
            CommandHandler::RemoveCurrentWindow,
            MessageType::RemoveCurrentWindow,
            &mut state,
            &mut port,
        );
        assert_error(&reply);
        // Best effort: the removal stands, the cursor did not move.
        assert_eq!(state.windows(), &[2, 3]);
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn test_next_walks_forward_with_wraparound() {
        let mut state = state_with(&[1, 2, 3], 0);
        let mut port = MockPort::default();

        for expected in [(1, 2, 1), (2, 3, 2), (3, 1, 0)] {
            port.calls.clear();
            let reply = run(
                CommandHandler::ShowNextWindow,
                MessageType::ShowNextWindow,
                &mut state,
                &mut port,
            );
            assert_ok(&reply, MessageType::ShowNextWindow);
            let (hidden, shown, cursor) = expected;
            assert_eq!(
                port.shows_and_hides(),
                vec![&Call::SetHidden(hidden, true), &Call::SetHidden(shown, false)]
            );
            assert_eq!(state.cursor(), cursor);
        }
    }

    #[test]
    fn test_prev_walks_backward_with_wraparound() {
        let mut state = state_with(&[1, 2, 3], 0);
        let mut port = MockPort::default();
        let reply = run(
            CommandHandler::ShowPreviousWindow,
            MessageType::ShowPreviousWindow,
            &mut state,
            &mut port,
        );
        // A ShowPreviousWindow request gets a ShowPreviousWindow reply.
        assert_ok(&reply, MessageType::ShowPreviousWindow);
        assert_eq!(
            port.shows_and_hides(),
            vec![&Call::SetHidden(1, true), &Call::SetHidden(3, false)]
        );
        assert_eq!(state.cursor(), 2);
    }

    #[test]
    fn test_cycle_on_empty_set_is_noop() {
        for handler in [CommandHandler::ShowNextWindow, CommandHandler::ShowPreviousWindow] {
            let mut state = ScratchpadState::new();
            let mut port = MockPort::default();
            let reply = run(handler, MessageType::ShowNextWindow, &mut state, &mut port);
            assert_ne!(reply.ty, MessageType::Error);
            assert!(port.calls.is_empty());
            assert!(state.is_empty());
        }
    }

    #[test]
    fn test_singleton_cycle_reshows_without_hiding() {
        for handler in [CommandHandler::ShowNextWindow, CommandHandler::ShowPreviousWindow] {
            let mut state = state_with(&[7], 0);
            let mut port = MockPort::default();
            run(handler, MessageType::ShowNextWindow, &mut state, &mut port);
            assert_eq!(state.cursor(), 0);
            assert_eq!(port.shows_and_hides(), vec![&Call::SetHidden(7, false)]);
        }
    }

    #[test]
    fn test_cycle_hide_failure_aborts_without_moving_cursor() {
        let mut state = state_with(&[1, 2], 0);
        let mut port = MockPort::default();
        port.fail_set_hidden.push((1, true));
        let reply = run(
            CommandHandler::ShowNextWindow,
            MessageType::ShowNextWindow,
            &mut state,
            &mut port,
        );
        let details = assert_error(&reply);
        assert!(details.contains("failed to hide current window"), "{details}");
        assert_eq!(state.cursor(), 0);
        // The show was never attempted.
        assert_eq!(port.shows_and_hides(), vec![&Call::SetHidden(1, true)]);
    }

    #[test]
    fn test_show_all_shows_in_list_order() {
        let mut state = state_with(&[3, 1, 2], 1);
        let mut port = MockPort::default();
        let reply = run(
            CommandHandler::ShowAllWindows,
            MessageType::ShowAllWindows,
            &mut state,
            &mut port,
        );
        assert_ok(&reply, MessageType::ShowAllWindows);
        assert_eq!(
            port.calls,
            vec![
                Call::Info(3),
                Call::SetHidden(3, false),
                Call::Info(1),
                Call::SetHidden(1, false),
                Call::Info(2),
                Call::SetHidden(2, false),
            ]
        );
        // No cursor change.
        assert_eq!(state.cursor(), 1);
    }

    #[test]
    fn test_show_all_fails_fast() {
        let mut state = state_with(&[1, 2, 3], 0);
        let mut port = MockPort::default();
        port.fail_info.push(2);
        let reply = run(
            CommandHandler::ShowAllWindows,
            MessageType::ShowAllWindows,
            &mut state,
            &mut port,
        );
        assert_error(&reply);
        // Window 3 was never attempted.
        assert!(!port.calls.contains(&Call::Info(3)));
    }

    #[test]
    fn test_show_all_on_empty_set_is_noop() {
        let mut state = ScratchpadState::new();
        let mut port = MockPort::default();
        let reply = run(
            CommandHandler::ShowAllWindows,
            MessageType::ShowAllWindows,
            &mut state,
            &mut port,
        );
        assert_ok(&reply, MessageType::ShowAllWindows);
        assert!(port.calls.is_empty());
    }

    #[test]
    fn test_set_visibility_ignores_tracking() {
        let mut state = state_with(&[1, 2], 1);
        let mut port = MockPort::default();
        let msg = Message::reply_with(
            MessageType::SetWindowVisibility,
            77,
            &SetVisibilityPayload {
                id: 99,
                visible: false,
            },
        )
        .unwrap();

        let reply = CommandHandler::SetWindowVisibility.execute(&msg, &mut state, &mut port);
        assert_ok(&reply, MessageType::SetWindowVisibility);
        assert_eq!(port.shows_and_hides(), vec![&Call::SetHidden(99, true)]);
        // Untouched list and cursor.
        assert_eq!(state.windows(), &[1, 2]);
        assert_eq!(state.cursor(), 1);
    }

    #[test]
    fn test_set_visibility_show() {
        let mut state = ScratchpadState::new();
        let mut port = MockPort::default();
        let msg = Message::reply_with(
            MessageType::SetWindowVisibility,
            77,
            &SetVisibilityPayload {
                id: 4,
                visible: true,
            },
        )
        .unwrap();

        CommandHandler::SetWindowVisibility.execute(&msg, &mut state, &mut port);
        assert_eq!(port.shows_and_hides(), vec![&Call::SetHidden(4, false)]);
    }

    #[test]
    fn test_set_visibility_rejects_malformed_payload() {
        let mut state = ScratchpadState::new();
        let mut port = MockPort::default();
        let msg = Message {
            ty: MessageType::SetWindowVisibility,
            id: 77,
            data: json!({"visible": "maybe"}),
        };

        let reply = CommandHandler::SetWindowVisibility.execute(&msg, &mut state, &mut port);
        let details = assert_error(&reply);
        assert!(details.contains("failed to decode payload"), "{details}");
        assert!(port.calls.is_empty());
    }
}
