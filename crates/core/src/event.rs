//! Agent events: a diagnostic side channel for the agent loop.
//!
//! Agents publish events only when a bus is attached. Subscribers see
//! each model response, tool execution, prompt rewrite and ceiling hit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::provider::Usage;

/// Events published by the agent loop and its wrappers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// A `respond` call started
    TurnStarted {
        transcript_id: String,
        tools: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The provider returned an assistant message
    ModelResponded {
        transcript_id: String,
        model: String,
        requested_tool: Option<String>,
        usage: Option<Usage>,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The tool-call ceiling stopped the loop
    CeilingReached {
        transcript_id: String,
        max_tool_calls: u32,
        pending_tool: String,
        timestamp: DateTime<Utc>,
    },

    /// A user message was rewritten with retrieved context
    PromptAugmented {
        fragments: usize,
        prompt: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AgentEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(AgentEvent::ToolExecuted {
            tool_name: "add".into(),
            success: true,
            duration_ms: 3,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            AgentEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "add");
                assert!(success);
            }
            _ => panic!("Expected ToolExecuted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(AgentEvent::CeilingReached {
            transcript_id: "t".into(),
            max_tool_calls: 1,
            pending_tool: "add".into(),
            timestamp: Utc::now(),
        });
    }
}
