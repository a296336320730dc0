//! Short-lived context menu state.
//!
//! At most one menu is open at a time; opening a new one implicitly
//! closes the prior one. The menu is transient UI, independent from the
//! async lifecycle of whatever action it triggers.

use tracing::debug;

use palaver_shared::constants::{CONTEXT_MENU_HEIGHT, CONTEXT_MENU_WIDTH};

use crate::dispatcher::ActionTarget;

/// The currently open context menu: its target and screen anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenMenu {
    pub target: ActionTarget,
    pub x: f32,
    pub y: f32,
}

impl OpenMenu {
    /// Whether a pointer interaction at `(x, y)` lands inside the menu.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x
            && x <= self.x + CONTEXT_MENU_WIDTH
            && y >= self.y
            && y <= self.y + CONTEXT_MENU_HEIGHT
    }
}

#[derive(Debug, Default)]
pub struct ContextMenuSession {
    open: Option<OpenMenu>,
}

impl ContextMenuSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a menu for `target`, replacing any open one.
    pub fn open(&mut self, target: ActionTarget, x: f32, y: f32) {
        if self.open.is_some() {
            debug!("Replacing open context menu");
        }
        self.open = Some(OpenMenu { target, x, y });
    }

    /// Close the menu. Idempotent.
    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn current(&self) -> Option<&OpenMenu> {
        self.open.as_ref()
    }

    /// A pointer/tap at `(x, y)`: dismisses the menu when the point falls
    /// outside its bounds. Returns whether the menu was dismissed.
    pub fn dismiss_at(&mut self, x: f32, y: f32) -> bool {
        match &self.open {
            Some(menu) if !menu.contains(x, y) => {
                self.open = None;
                true
            }
            _ => false,
        }
    }

    /// Take the open menu, closing the session.
    pub(crate) fn take(&mut self) -> Option<OpenMenu> {
        self.open.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use palaver_shared::types::{ChatId, MessageId};

    fn target(id: &str) -> ActionTarget {
        ActionTarget::Message {
            chat_id: ChatId::from("chat-1"),
            message_id: MessageId::from(id),
        }
    }

    #[test]
    fn test_opening_a_second_menu_closes_the_first() {
        let mut session = ContextMenuSession::new();
        session.open(target("m1"), 10.0, 10.0);
        session.open(target("m2"), 50.0, 50.0);

        let open = session.current().unwrap();
        assert_eq!(open.target, target("m2"));
        assert_eq!(open.x, 50.0);
    }

    #[test]
    fn test_dismiss_only_outside_bounds() {
        let mut session = ContextMenuSession::new();
        session.open(target("m1"), 100.0, 100.0);

        // Inside the menu: stays open.
        assert!(!session.dismiss_at(110.0, 120.0));
        assert!(session.is_open());

        // Outside: dismissed.
        assert!(session.dismiss_at(10.0, 10.0));
        assert!(!session.is_open());

        // Nothing left to dismiss.
        assert!(!session.dismiss_at(10.0, 10.0));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = ContextMenuSession::new();
        session.open(target("m1"), 0.0, 0.0);
        session.close();
        session.close();
        assert!(!session.is_open());
    }
}
