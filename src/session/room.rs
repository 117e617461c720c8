use tokio::sync::mpsc;
use tracing::debug;

use super::messages::ServerMessage;
use super::types::{ConnId, OutboundMessage, RoomId};
use crate::rules::{Board, Mark};

/// Maximum number of players in a room
pub const ROOM_CAPACITY: usize = 2;

#[derive(Debug)]
pub(crate) struct Participant {
    pub conn: ConnId,
    pub name: String,
    /// Channel for outbound messages to this player.
    pub tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Participant {
    pub fn send(&self, msg: OutboundMessage) {
        if self.tx.send(msg).is_err() {
            debug!("Outbound channel closed for {}", self.conn);
        }
    }
}

/// State of one match: seats in join order, board, turn and rematch flags.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    participants: Vec<Participant>,
    board: Board,
    turn: Mark,
    restart_ready: [bool; ROOM_CAPACITY],
    finished: bool,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            participants: Vec::with_capacity(ROOM_CAPACITY),
            board: Board::empty(),
            turn: Mark::FIRST,
            restart_ready: [false; ROOM_CAPACITY],
            finished: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Mark {
        self.turn
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= ROOM_CAPACITY
    }

    pub fn restart_ready(&self) -> [bool; ROOM_CAPACITY] {
        self.restart_ready
    }

    pub(crate) fn seat_of(&self, conn: ConnId) -> Option<usize> {
        self.participants.iter().position(|p| p.conn == conn)
    }

    /// Mark played by `conn`, derived from its seat
    pub fn mark_of(&self, conn: ConnId) -> Option<Mark> {
        self.seat_of(conn).and_then(Mark::for_seat)
    }

    /// Add a player; returns its seat, or `None` if the room is full
    pub(crate) fn add(&mut self, participant: Participant) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        self.participants.push(participant);
        Some(self.participants.len() - 1)
    }

    /// Remove a player; returns false if `conn` was not seated here
    pub(crate) fn remove(&mut self, conn: ConnId) -> bool {
        match self.seat_of(conn) {
            Some(seat) => {
                self.participants.remove(seat);
                self.restart_ready = [false; ROOM_CAPACITY];
                true
            }
            None => false,
        }
    }

    pub(crate) fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub(crate) fn set_board(&mut self, board: Board) {
        self.board = board;
    }

    pub(crate) fn set_turn(&mut self, turn: Mark) {
        self.turn = turn;
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    /// Flag `conn` as ready for a rematch; returns false if not seated
    pub(crate) fn mark_ready(&mut self, conn: ConnId) -> bool {
        match self.seat_of(conn) {
            Some(seat) => {
                self.restart_ready[seat] = true;
                true
            }
            None => false,
        }
    }

    /// Nothing has been played since creation or the last reset
    pub fn is_fresh(&self) -> bool {
        self.board.is_empty() && self.turn == Mark::FIRST && !self.finished
    }

    /// Every seat is taken and flagged ready
    pub fn all_ready(&self) -> bool {
        self.is_full() && self.restart_ready.iter().all(|&ready| ready)
    }

    /// Clear the board, turn, readiness and terminal state
    pub(crate) fn reset(&mut self) {
        self.board = Board::empty();
        self.turn = Mark::FIRST;
        self.restart_ready = [false; ROOM_CAPACITY];
        self.finished = false;
    }

    /// Send one message to every player
    pub(crate) fn broadcast(&self, msg: &ServerMessage) {
        let out = encode(msg);
        for p in &self.participants {
            p.send(out.clone());
        }
    }

    /// Send one message to every player except `conn`
    pub(crate) fn broadcast_except(&self, conn: ConnId, msg: &ServerMessage) {
        let out = encode(msg);
        for p in self.participants.iter().filter(|p| p.conn != conn) {
            p.send(out.clone());
        }
    }
}

pub(crate) fn encode(msg: &ServerMessage) -> OutboundMessage {
    let json = serde_json::to_string(msg).expect("ServerMessage serialization should never fail");
    OutboundMessage::from(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(name: &str) -> (Participant, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let p = Participant {
            conn: ConnId::next(),
            name: name.to_string(),
            tx,
        };
        (p, rx)
    }

    #[test]
    fn new_room_is_fresh() {
        let room = Room::new(RoomId::from("1"));
        assert!(room.is_empty());
        assert!(room.board().is_empty());
        assert_eq!(room.turn(), Mark::X);
        assert_eq!(room.restart_ready(), [false, false]);
        assert!(!room.is_finished());
        assert!(room.is_fresh());
    }

    #[test]
    fn played_room_is_not_fresh_until_reset() {
        let mut room = Room::new(RoomId::from("1"));
        let mut board = Board::empty();
        board.place(0, Mark::X).unwrap();
        room.set_board(board);
        room.set_turn(Mark::O);
        assert!(!room.is_fresh());
        room.reset();
        assert!(room.is_fresh());
    }

    #[test]
    fn seats_follow_join_order() {
        let mut room = Room::new(RoomId::from("1"));
        let (a, _ra) = participant("a");
        let (b, _rb) = participant("b");
        let (c, _rc) = participant("c");
        let (ca, cb, cc) = (a.conn, b.conn, c.conn);

        assert_eq!(room.add(a), Some(0));
        assert_eq!(room.add(b), Some(1));
        assert_eq!(room.add(c), None);
        assert_eq!(room.len(), 2);
        assert_eq!(room.mark_of(ca), Some(Mark::X));
        assert_eq!(room.mark_of(cb), Some(Mark::O));
        assert_eq!(room.mark_of(cc), None);
        let names: Vec<&str> = room.participants().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn remove_clears_readiness() {
        let mut room = Room::new(RoomId::from("1"));
        let (a, _ra) = participant("a");
        let (b, _rb) = participant("b");
        let (ca, cb) = (a.conn, b.conn);
        room.add(a);
        room.add(b);

        assert!(room.mark_ready(ca));
        assert!(room.mark_ready(cb));
        assert!(room.all_ready());

        assert!(room.remove(ca));
        assert!(!room.remove(ca));
        assert_eq!(room.restart_ready(), [false, false]);
        assert_eq!(room.mark_of(cb), Some(Mark::X));
    }

    #[test]
    fn broadcast_except_skips_sender() {
        let mut room = Room::new(RoomId::from("1"));
        let (a, mut ra) = participant("a");
        let (b, mut rb) = participant("b");
        let ca = a.conn;
        room.add(a);
        room.add(b);

        room.broadcast_except(ca, &ServerMessage::OpponentReady);
        assert!(ra.try_recv().is_err());
        assert_eq!(rb.try_recv().unwrap().as_str(), r#"{"type":"opponentReady"}"#);
    }

    #[test]
    fn send_to_closed_channel_is_ignored() {
        let mut room = Room::new(RoomId::from("1"));
        let (a, ra) = participant("a");
        room.add(a);
        drop(ra);
        room.broadcast(&ServerMessage::Restart);
    }
}
