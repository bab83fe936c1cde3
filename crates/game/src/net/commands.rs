use serde::{Deserialize, Serialize};

/// JSON commands from a client. The sender identity comes from the
/// transport, never from the payload; any player field a client includes is
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Ping { id: u32 },
    MoveUnits { units: Vec<MoveUnitsEntry> },
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveUnitsEntry {
    pub id: u16,
    pub x: f64,
    pub y: f64,
}

/// JSON control messages from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    CreateInitialState {
        #[serde(rename = "layoutSize")]
        layout_size: [f64; 2],
    },
    Pong {
        id: u32,
        time: f64,
    },
    GameOver {
        #[serde(rename = "winning-player")]
        winning_player: i32,
    },
    #[serde(rename_all = "camelCase")]
    Stats {
        ticks: u64,
        units: usize,
        projectiles: usize,
        bytes_sent: u64,
        game_time: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_move_units() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"type":"move-units","units":[{"id":4,"x":1400.0,"y":1000.0}]}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            ClientMessage::MoveUnits {
                units: vec![MoveUnitsEntry {
                    id: 4,
                    x: 1_400.0,
                    y: 1_000.0
                }]
            }
        );
    }

    #[test]
    fn player_field_in_payload_is_ignored() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"type":"move-units","player":7,"units":[]}"#).unwrap();
        assert_eq!(message, ClientMessage::MoveUnits { units: vec![] });
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"warp-units"}"#).is_err());
    }

    #[test]
    fn server_messages_use_wire_names() {
        let json = serde_json::to_string(&ServerMessage::GameOver { winning_player: -1 }).unwrap();
        assert_eq!(json, r#"{"type":"game-over","winning-player":-1}"#);

        let json = serde_json::to_string(&ServerMessage::CreateInitialState {
            layout_size: [35_000.0, 13_000.0],
        })
        .unwrap();
        assert!(json.starts_with(r#"{"type":"create-initial-state","layoutSize":"#));

        let json = serde_json::to_string(&ServerMessage::Pong { id: 42, time: 1.239 }).unwrap();
        assert_eq!(json, r#"{"type":"pong","id":42,"time":1.239}"#);
    }
}
