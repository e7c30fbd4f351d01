//! Sink for diagnostic events emitted alongside consensus processing.
//!
//! Maintenance routines narrate what they did (block info, activity and
//! emission tables) as [Event]s collected here. The sink lives outside the
//! consensus hash boundary: nothing in ledger state ever reads it, and a node
//! is free to drop, print, or index the events.
use cosmwasm_std::Event;

/// Helper data type, following builder pattern, for collecting diagnostic
/// [Event]s during block maintenance.
pub struct Diagnostics {
    events: Vec<Event>,
    event_type: EventType,
}

enum EventType {
    MuteEvents,
    EmitEvents {
        common_attrs: Vec<(&'static str, String)>,
    },
}

impl Diagnostics {
    /// Initialize a new builder.
    pub fn new() -> Self {
        Diagnostics {
            events: Vec::new(),
            event_type: EventType::EmitEvents {
                common_attrs: vec![("gravity_chain", "core".to_string())],
            },
        }
    }

    /// Create a sink where the event methods are no-ops.
    pub fn new_mute() -> Self {
        Diagnostics {
            events: Vec::new(),
            event_type: EventType::MuteEvents,
        }
    }

    /// Add a new diagnostic event.
    pub fn add_event(&mut self, event: impl Into<Event>) {
        match &self.event_type {
            EventType::MuteEvents => {}
            EventType::EmitEvents { common_attrs } => {
                let mut event = event.into();
                for (key, value) in common_attrs {
                    event = event.add_attribute(*key, value);
                }
                self.events.push(event);
            }
        }
    }

    /// Finalize the builder and hand the collected events to the caller.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// The events collected so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics::new()
    }
}
