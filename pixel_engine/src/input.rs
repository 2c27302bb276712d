use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical buttons the interaction core listens to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Confirm,
    Up,
    Down,
}

impl Button {
    pub fn label(&self) -> &'static str {
        match self {
            Button::Confirm => "confirm",
            Button::Up => "up",
            Button::Down => "down",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who receives a press edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Listener {
    /// The scene's "talk to whatever is nearby" binding.
    Interaction,
    /// The open dialogue session.
    Dialogue,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ListenerId(u64);

pub trait InputService {
    fn subscribe(&mut self, button: Button, listener: Listener) -> ListenerId;
    /// Returns false when the subscription was already gone.
    fn unsubscribe(&mut self, id: ListenerId) -> bool;
}

#[derive(Debug, Clone)]
struct Subscription {
    id: ListenerId,
    button: Button,
    listener: Listener,
}

/// Subscription table for discrete key-down edges.
#[derive(Debug, Clone, Default)]
pub struct InputHub {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl InputHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listeners bound to `button`, in subscription order, captured at the
    /// moment of the press.
    pub fn listeners_for(&self, button: Button) -> Vec<(ListenerId, Listener)> {
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.button == button)
            .map(|subscription| (subscription.id, subscription.listener))
            .collect()
    }

    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.subscriptions
            .iter()
            .any(|subscription| subscription.id == id)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl InputService for InputHub {
    fn subscribe(&mut self, button: Button, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            button,
            listener,
        });
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|subscription| subscription.id != id);
        self.subscriptions.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_follow_subscription_order() {
        let mut hub = InputHub::new();
        let interaction = hub.subscribe(Button::Confirm, Listener::Interaction);
        hub.subscribe(Button::Up, Listener::Dialogue);
        let dialogue = hub.subscribe(Button::Confirm, Listener::Dialogue);

        assert_eq!(
            hub.listeners_for(Button::Confirm),
            vec![
                (interaction, Listener::Interaction),
                (dialogue, Listener::Dialogue)
            ]
        );
        assert_eq!(hub.listeners_for(Button::Down), Vec::new());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut hub = InputHub::new();
        let id = hub.subscribe(Button::Down, Listener::Dialogue);
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert!(!hub.is_subscribed(id));
        assert!(hub.is_empty());
    }

    #[test]
    fn buttons_parse_from_lowercase_names() {
        let button: Button = serde_json::from_str("\"confirm\"").expect("parse");
        assert_eq!(button, Button::Confirm);
        assert_eq!(Button::Down.to_string(), "down");
    }
}
