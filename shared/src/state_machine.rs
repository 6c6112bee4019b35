//! Link State Machine
//!
//! Defines the connection lifecycle states and their valid transitions.
//!
//! ```text
//! Idle | Disconnected | Errored --connect--> Connecting
//! Connecting --opened--> Connected
//! Connecting --open failed--> Errored
//! Connected  --transport error--> Errored
//! Connected | Errored --closed--> Disconnected
//! any --disconnect--> Disconnected
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection has been attempted yet
    #[default]
    Idle,
    /// Transport open in progress
    Connecting,
    /// Transport open and streaming
    Connected,
    /// Transport closed (by peer or by request)
    Disconnected,
    /// Transport failed to open or failed at runtime
    Errored,
}

impl ConnectionState {
    /// Whether a transport handle exists in this state
    pub fn has_transport(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Errored => "error",
        };
        f.write_str(name)
    }
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTrigger {
    /// `connect()` requested, manually or by a scheduled retry
    ConnectRequested,
    /// Transport open succeeded
    Opened,
    /// Transport open failed
    OpenFailed,
    /// Open transport reported an error
    TransportFailed,
    /// Transport closed
    TransportClosed,
    /// `disconnect()` requested
    DisconnectRequested,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Success {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// Trigger accepted but the state stays as it is
    Unchanged(ConnectionState),
    /// Transition was invalid from current state
    Invalid {
        from: ConnectionState,
        trigger: LinkTrigger,
    },
}

/// The connection lifecycle state machine
#[derive(Debug, Default)]
pub struct LinkStateMachine {
    current_state: ConnectionState,
}

impl LinkStateMachine {
    /// Create a new state machine in Idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.current_state
    }

    /// Process a trigger and return the transition result
    pub fn process(&mut self, trigger: LinkTrigger) -> TransitionResult {
        match self.next_state(trigger) {
            Some(to) if to == self.current_state => TransitionResult::Unchanged(to),
            Some(to) => {
                let from = self.current_state;
                self.current_state = to;
                TransitionResult::Success { from, to }
            }
            None => TransitionResult::Invalid {
                from: self.current_state,
                trigger,
            },
        }
    }

    /// Get the next state for a given trigger, if the transition is valid
    fn next_state(&self, trigger: LinkTrigger) -> Option<ConnectionState> {
        use ConnectionState::*;
        use LinkTrigger::*;

        match (self.current_state, trigger) {
            // Starting an attempt
            (Idle | Disconnected | Errored, ConnectRequested) => Some(Connecting),
            (Connecting | Connected, ConnectRequested) => Some(self.current_state),

            // Open outcome
            (Connecting, Opened) => Some(Connected),
            (Connecting, OpenFailed) => Some(Errored),

            // Runtime faults
            (Connected, TransportFailed) => Some(Errored),
            (Errored, TransportFailed | OpenFailed) => Some(Errored),

            // Close, possibly following an error for the same fault
            (Connecting | Connected | Errored, TransportClosed) => Some(Disconnected),
            (Disconnected, TransportClosed) => Some(Disconnected),

            // Explicit disconnect is always honoured
            (_, DisconnectRequested) => Some(Disconnected),

            _ => None,
        }
    }
}

/// Check if a transition from one state to another is valid
pub fn is_valid_transition(from: ConnectionState, to: ConnectionState) -> bool {
    use ConnectionState::*;

    match (from, to) {
        // Same state is always valid
        (a, b) if a == b => true,

        // Disconnect can be requested from anywhere
        (_, Disconnected) => true,

        (Idle | Disconnected | Errored, Connecting) => true,
        (Connecting, Connected | Errored) => true,
        (Connected, Errored) => true,

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIGGERS: [LinkTrigger; 6] = [
        LinkTrigger::ConnectRequested,
        LinkTrigger::Opened,
        LinkTrigger::OpenFailed,
        LinkTrigger::TransportFailed,
        LinkTrigger::TransportClosed,
        LinkTrigger::DisconnectRequested,
    ];

    #[test]
    fn test_initial_state() {
        let fsm = LinkStateMachine::new();
        assert_eq!(fsm.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_connect_open_close_cycle() {
        let mut fsm = LinkStateMachine::new();

        let result = fsm.process(LinkTrigger::ConnectRequested);
        assert_eq!(
            result,
            TransitionResult::Success {
                from: ConnectionState::Idle,
                to: ConnectionState::Connecting
            }
        );

        let result = fsm.process(LinkTrigger::Opened);
        assert!(matches!(
            result,
            TransitionResult::Success { to: ConnectionState::Connected, .. }
        ));

        let result = fsm.process(LinkTrigger::TransportClosed);
        assert!(matches!(
            result,
            TransitionResult::Success { to: ConnectionState::Disconnected, .. }
        ));

        // Ready for another attempt
        let result = fsm.process(LinkTrigger::ConnectRequested);
        assert!(matches!(
            result,
            TransitionResult::Success { to: ConnectionState::Connecting, .. }
        ));
    }

    #[test]
    fn test_error_then_close() {
        let mut fsm = LinkStateMachine::new();
        fsm.process(LinkTrigger::ConnectRequested);
        fsm.process(LinkTrigger::Opened);

        fsm.process(LinkTrigger::TransportFailed);
        assert_eq!(fsm.state(), ConnectionState::Errored);

        // A second error for the same fault changes nothing
        assert_eq!(
            fsm.process(LinkTrigger::TransportFailed),
            TransitionResult::Unchanged(ConnectionState::Errored)
        );

        fsm.process(LinkTrigger::TransportClosed);
        assert_eq!(fsm.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_open_failure() {
        let mut fsm = LinkStateMachine::new();
        fsm.process(LinkTrigger::ConnectRequested);

        let result = fsm.process(LinkTrigger::OpenFailed);
        assert!(matches!(
            result,
            TransitionResult::Success { to: ConnectionState::Errored, .. }
        ));
    }

    #[test]
    fn test_connect_while_active_is_noop() {
        let mut fsm = LinkStateMachine::new();
        fsm.process(LinkTrigger::ConnectRequested);
        assert_eq!(
            fsm.process(LinkTrigger::ConnectRequested),
            TransitionResult::Unchanged(ConnectionState::Connecting)
        );

        fsm.process(LinkTrigger::Opened);
        assert_eq!(
            fsm.process(LinkTrigger::ConnectRequested),
            TransitionResult::Unchanged(ConnectionState::Connected)
        );
    }

    #[test]
    fn test_invalid_transition() {
        let mut fsm = LinkStateMachine::new();

        // Can't open without connecting first
        let result = fsm.process(LinkTrigger::Opened);
        assert!(matches!(result, TransitionResult::Invalid { .. }));
        assert_eq!(fsm.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_every_trigger_sequence_stays_on_valid_edges() {
        // All sequences of up to four triggers from Idle
        let mut frontier = vec![Vec::<LinkTrigger>::new()];
        for _ in 0..4 {
            let mut next = Vec::new();
            for prefix in &frontier {
                for trigger in TRIGGERS {
                    let mut seq = prefix.clone();
                    seq.push(trigger);
                    next.push(seq);
                }
            }

            for seq in &next {
                let mut fsm = LinkStateMachine::new();
                for trigger in seq {
                    if let TransitionResult::Success { from, to } = fsm.process(*trigger) {
                        assert!(
                            is_valid_transition(from, to),
                            "{:?} -> {:?} via {:?} in {:?}",
                            from,
                            to,
                            trigger,
                            seq
                        );
                    }
                }
            }
            frontier = next;
        }
    }

    #[test]
    fn test_transport_presence() {
        assert!(ConnectionState::Connecting.has_transport());
        assert!(ConnectionState::Connected.has_transport());
        assert!(!ConnectionState::Errored.has_transport());
        assert!(!ConnectionState::Disconnected.has_transport());
        assert!(!ConnectionState::Idle.has_transport());
    }
}
