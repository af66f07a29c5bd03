// Identifier types shared by the relay and both screens.
//
// `ConnectionId` is assigned by the relay when an endpoint completes its
// handshake. It tags every inbound event on the relay side and names the
// departed peer when a transport connection goes away. `Role` is declared by
// the endpoint in its `Hello`; the relay only uses it for logging, since none
// of the fan-out rules depend on who sent an event.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Relay-assigned connection ID (compact u32, unique for one relay run).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which screen an endpoint drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The shared display that mirrors the game.
    Host,
    /// The controller that enters a name and answers questions.
    Player,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Player => "player",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
