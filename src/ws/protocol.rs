//! WebSocket protocol message definitions

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::SessionView;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Restart the session
    Reset,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once after the upgrade
    Welcome {
        session_id: Uuid,
        server_time: u64,
    },

    /// Latest session view
    State {
        view: Arc<SessionView>,
    },

    Pong {
        t: u64,
        server_time: u64,
    },

    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_tagged() {
        let ping: ClientMsg = serde_json::from_str(r#"{"type":"ping","t":42}"#).unwrap();
        assert!(matches!(ping, ClientMsg::Ping { t: 42 }));

        let reset: ClientMsg = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert!(matches!(reset, ClientMsg::Reset));

        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"launch"}"#).is_err());
    }

    #[test]
    fn server_error_has_type_tag() {
        let msg = ServerMsg::Error {
            message: "rate limited".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "rate limited");
    }
}
