use serde::{Deserialize, Serialize};

use super::types::RoomId;
use crate::rules::{Board, Mark};

/// Text sent with `opponentLeft`
pub const OPPONENT_LEFT_MESSAGE: &str = "Your opponent has left. You win!";

/// Messages sent from client to server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enter a room, creating it if unknown
    #[serde(rename_all = "camelCase")]
    Join {
        room_id: RoomId,
        #[serde(default)]
        player_name: String,
    },

    /// Submit a move, either as a full board snapshot or a single cell
    #[serde(rename_all = "camelCase")]
    Move {
        #[serde(default)]
        board: Option<Board>,
        #[serde(default)]
        cell: Option<usize>,
        /// Mark that just moved
        #[serde(default)]
        current_player: Option<Mark>,
    },

    /// Signal willingness to play again
    #[serde(rename_all = "camelCase")]
    RestartRequest {
        #[serde(default)]
        room_id: Option<RoomId>,
    },

    /// Reset the board once both sides are ready
    Restart,

    /// Leave the current room
    LeaveRoom,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Both seats are filled
    #[serde(rename_all = "camelCase")]
    Start {
        opponent_name: String,
        current_player: Mark,
        mark: Mark,
    },

    /// Room already has two players
    Full,

    /// Board after an accepted move; `winner` and `combination` are present
    /// only when the move completed a line
    #[serde(rename_all = "camelCase")]
    Move {
        board: Board,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<Mark>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        combination: Option<[usize; 3]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_player: Option<Mark>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        tie: bool,
    },

    /// The other player asked for a rematch
    OpponentReady,

    /// Board and turn were reset
    Restart,

    /// The other player left or disconnected
    OpponentLeft {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}
