use tokio::sync::mpsc;
use tracing::{debug, info};

use super::messages::{OPPONENT_LEFT_MESSAGE, ServerMessage};
use super::registry::Registry;
use super::room::{Participant, Room, encode};
use super::types::{ConnId, MoveRejection, OutboundMessage, RoomId, SessionError};
use crate::config::MovePolicy;
use crate::rules::{self, Board, Mark, Outcome};

/// A submitted move, as decoded from the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRequest {
    /// Full board after the move, plus the mark the client says just moved
    Snapshot { board: Board, claimed: Option<Mark> },
    /// Single cell index
    Cell(usize),
}

/// Seat assigned on a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAck {
    pub room_id: RoomId,
    pub mark: Mark,
}

/// Protocol state machine over the room registry.
///
/// Every method runs to completion without suspending; the caller is
/// responsible for serializing calls (see the coordinator actor).
#[derive(Debug, Default)]
pub struct Coordinator {
    registry: Registry,
    policy: MovePolicy,
}

impl Coordinator {
    pub fn new(policy: MovePolicy) -> Self {
        Self {
            registry: Registry::new(),
            policy,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Seat `conn` in `room_id`, creating the room if needed.
    ///
    /// On `RoomFull` the `full` reply has already been queued on `tx`.
    pub fn join(
        &mut self,
        conn: ConnId,
        room_id: RoomId,
        name: String,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<JoinAck, SessionError> {
        if let Some(current) = self.registry.room_of(conn) {
            return Err(SessionError::AlreadyJoined(current.clone()));
        }

        if self.registry.get(&room_id).is_some_and(Room::is_full) {
            let _ = tx.send(encode(&ServerMessage::Full));
            info!("Connection {} refused: room {} is full", conn, room_id);
            return Err(SessionError::RoomFull(room_id));
        }

        let room = self.registry.get_or_create(&room_id);
        let seat = room
            .add(Participant { conn, name, tx })
            .ok_or_else(|| SessionError::RoomFull(room_id.clone()))?;
        let mark = Mark::for_seat(seat)
            .ok_or_else(|| SessionError::Internal(format!("no mark for seat {}", seat)))?;
        info!("Connection {} joined room {} as {}", conn, room_id, mark);

        if room.is_full() {
            // the seated player's client still shows the previous game
            if !room.is_fresh() {
                room.reset();
                room.broadcast_except(conn, &ServerMessage::Restart);
            }
            send_start(room);
            info!("Game started in room {}", room_id);
        }

        self.registry.bind(conn, room_id.clone());
        Ok(JoinAck { room_id, mark })
    }

    /// Apply a move and broadcast the resulting board to both players
    pub fn submit_move(&mut self, conn: ConnId, request: MoveRequest) -> Result<(), SessionError> {
        let policy = self.policy;
        let room = self.registry.room_for(conn).ok_or(SessionError::NotJoined)?;
        let seat_mark = room.mark_of(conn).ok_or(SessionError::NotJoined)?;

        let (board, mover) = match policy {
            MovePolicy::Validated => validated_move(room, seat_mark, request)?,
            MovePolicy::Trusted => trusted_move(room, seat_mark, request)?,
        };
        room.set_board(board);

        let msg = match rules::evaluate(&board) {
            Some(Outcome::Win(line)) => {
                room.finish();
                info!("Room {}: {} wins on {:?}", room.id(), line.mark, line.cells);
                ServerMessage::Move {
                    board,
                    winner: Some(line.mark),
                    combination: Some(line.cells),
                    current_player: None,
                    tie: false,
                }
            }
            outcome => {
                let tie = outcome == Some(Outcome::Tie);
                room.set_turn(mover.opponent());
                if tie {
                    room.finish();
                    info!("Room {}: tie", room.id());
                }
                ServerMessage::Move {
                    board,
                    winner: None,
                    combination: None,
                    current_player: Some(room.turn()),
                    tie,
                }
            }
        };

        debug!("Room {}: {} moved", room.id(), mover);
        room.broadcast(&msg);
        Ok(())
    }

    /// Flag the sender ready for a rematch and tell the other player
    pub fn request_restart(&mut self, conn: ConnId) -> Result<(), SessionError> {
        let room = self.registry.room_for(conn).ok_or(SessionError::NotJoined)?;
        if !room.mark_ready(conn) {
            return Err(SessionError::NotJoined);
        }
        room.broadcast_except(conn, &ServerMessage::OpponentReady);
        debug!("Room {}: {} ready to restart", room.id(), conn);
        Ok(())
    }

    /// Reset the board and turn, notifying both players
    pub fn restart(&mut self, conn: ConnId) -> Result<(), SessionError> {
        let policy = self.policy;
        let room = self.registry.room_for(conn).ok_or(SessionError::NotJoined)?;
        if room.seat_of(conn).is_none() {
            return Err(SessionError::NotJoined);
        }
        if policy == MovePolicy::Validated && !room.all_ready() {
            return Err(SessionError::NotReady);
        }

        room.reset();
        room.broadcast(&ServerMessage::Restart);
        info!("Room {} restarted", room.id());
        Ok(())
    }

    /// Remove `conn` from its room. Safe to call any number of times;
    /// only the first call has an effect.
    pub fn leave(&mut self, conn: ConnId) -> Result<(), SessionError> {
        let room_id = self.registry.unbind(conn).ok_or(SessionError::NotJoined)?;
        let Some(room) = self.registry.get_mut(&room_id) else {
            return Err(SessionError::NotJoined);
        };

        if room.remove(conn) {
            info!("Connection {} left room {}", conn, room_id);
            room.broadcast(&ServerMessage::OpponentLeft {
                message: Some(OPPONENT_LEFT_MESSAGE.to_string()),
            });
        }

        if room.is_empty() {
            self.registry.remove(&room_id);
        }
        Ok(())
    }
}

fn send_start(room: &Room) {
    let players = room.participants();
    for (seat, p) in players.iter().enumerate() {
        let opponent = players.iter().find(|other| other.conn != p.conn);
        let (Some(opponent), Some(mark)) = (opponent, Mark::for_seat(seat)) else {
            continue;
        };
        p.send(encode(&ServerMessage::Start {
            opponent_name: opponent.name.clone(),
            current_player: room.turn(),
            mark,
        }));
    }
}

/// Check turn ownership and cell emptiness, and compute the new board
fn validated_move(
    room: &Room,
    seat_mark: Mark,
    request: MoveRequest,
) -> Result<(Board, Mark), MoveRejection> {
    if !room.is_full() {
        return Err(MoveRejection::WaitingForOpponent);
    }
    if room.is_finished() {
        return Err(MoveRejection::GameOver);
    }
    if seat_mark != room.turn() {
        return Err(MoveRejection::OutOfTurn(seat_mark));
    }

    let mut board = *room.board();
    let cell = match request {
        MoveRequest::Cell(cell) => cell,
        MoveRequest::Snapshot { board: submitted, .. } => match submitted.placement_from(&board) {
            Some((cell, mark)) if mark == seat_mark => cell,
            _ => return Err(MoveRejection::BadSnapshot(seat_mark)),
        },
    };
    board.place(cell, seat_mark).map_err(MoveRejection::Placement)?;
    Ok((board, seat_mark))
}

/// Accept the client's view of the board
fn trusted_move(
    room: &Room,
    seat_mark: Mark,
    request: MoveRequest,
) -> Result<(Board, Mark), MoveRejection> {
    match request {
        MoveRequest::Snapshot { board, claimed } => Ok((board, claimed.unwrap_or(seat_mark))),
        MoveRequest::Cell(cell) => {
            let mut board = *room.board();
            board.place(cell, seat_mark).map_err(MoveRejection::Placement)?;
            Ok((board, seat_mark))
        }
    }
}
