use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::coordinator::{Coordinator, JoinAck, MoveRequest};
use super::types::{ConnId, OutboundMessage, RoomId, SessionError};
use crate::config::MovePolicy;

/// Commands sent to the coordinator actor
pub(crate) enum RoomCommand {
    Join {
        conn: ConnId,
        room_id: RoomId,
        name: String,
        tx: mpsc::UnboundedSender<OutboundMessage>,
        reply: oneshot::Sender<Result<JoinAck, SessionError>>,
    },
    Move {
        conn: ConnId,
        request: MoveRequest,
    },
    RestartRequest {
        conn: ConnId,
    },
    Restart {
        conn: ConnId,
    },
    Leave {
        conn: ConnId,
    },
    /// Connection closed; `done` fires once its sender has been dropped
    Disconnect {
        conn: ConnId,
        done: oneshot::Sender<()>,
    },
}

/// Owns the coordinator and applies commands one at a time
pub(crate) async fn coordinator_actor(mut rx: mpsc::Receiver<RoomCommand>, policy: MovePolicy) {
    let mut coordinator = Coordinator::new(policy);
    info!("Coordinator started ({:?} moves)", policy);

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RoomCommand::Join {
                conn,
                room_id,
                name,
                tx,
                reply,
            } => {
                let result = coordinator.join(conn, room_id, name, tx);
                if let Err(ref e) = result {
                    debug!("Join from {} failed: {}", conn, e);
                }
                let _ = reply.send(result);
            }

            RoomCommand::Move { conn, request } => {
                log_outcome(conn, "move", coordinator.submit_move(conn, request));
            }

            RoomCommand::RestartRequest { conn } => {
                log_outcome(conn, "restartRequest", coordinator.request_restart(conn));
            }

            RoomCommand::Restart { conn } => {
                log_outcome(conn, "restart", coordinator.restart(conn));
            }

            RoomCommand::Leave { conn } => {
                log_outcome(conn, "leaveRoom", coordinator.leave(conn));
            }

            RoomCommand::Disconnect { conn, done } => {
                // not having joined anything is the common case here
                let _ = coordinator.leave(conn);
                let _ = done.send(());
            }
        }
    }

    info!("Coordinator stopped");
}

fn log_outcome(conn: ConnId, what: &str, result: Result<(), SessionError>) {
    match result {
        Ok(()) => {}
        Err(SessionError::InvalidMove(reason)) => {
            warn!("Dropped {} from {}: {}", what, conn, reason);
        }
        Err(SessionError::Internal(e)) => warn!("Internal error on {} from {}: {}", what, conn, e),
        Err(e) => debug!("Ignored {} from {}: {}", what, conn, e),
    }
}

/// Handle to communicate with the coordinator actor
#[derive(Clone)]
pub struct CoordinatorHandle {
    pub(crate) tx: mpsc::Sender<RoomCommand>,
}

impl CoordinatorHandle {
    /// Spawn the coordinator actor on the current runtime
    pub fn spawn(policy: MovePolicy, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel::<RoomCommand>(buffer);
        tokio::spawn(coordinator_actor(rx, policy));
        Self { tx }
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), SessionError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Internal("actor channel closed".to_string()))
    }

    /// Join (or create) a room
    pub async fn join(
        &self,
        conn: ConnId,
        room_id: RoomId,
        name: String,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<JoinAck, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            conn,
            room_id,
            name,
            tx,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| SessionError::Internal("actor channel closed".to_string()))?
    }

    pub async fn submit_move(&self, conn: ConnId, request: MoveRequest) -> Result<(), SessionError> {
        self.send(RoomCommand::Move { conn, request }).await
    }

    pub async fn request_restart(&self, conn: ConnId) -> Result<(), SessionError> {
        self.send(RoomCommand::RestartRequest { conn }).await
    }

    pub async fn restart(&self, conn: ConnId) -> Result<(), SessionError> {
        self.send(RoomCommand::Restart { conn }).await
    }

    /// Leave the current room
    pub async fn leave_room(&self, conn: ConnId) -> Result<(), SessionError> {
        self.send(RoomCommand::Leave { conn }).await
    }

    /// Run leave cleanup for a closed connection and wait until it is applied
    pub async fn disconnect(&self, conn: ConnId) -> Result<(), SessionError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(RoomCommand::Disconnect {
            conn,
            done: done_tx,
        })
        .await?;
        done_rx
            .await
            .map_err(|_| SessionError::Internal("actor channel closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Mark;

    fn client() -> (
        ConnId,
        mpsc::UnboundedSender<OutboundMessage>,
        mpsc::UnboundedReceiver<OutboundMessage>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnId::next(), tx, rx)
    }

    #[tokio::test]
    async fn join_through_handle_assigns_marks() {
        let handle = CoordinatorHandle::spawn(MovePolicy::Validated, 16);
        let (a, a_tx, mut a_rx) = client();
        let (b, b_tx, mut b_rx) = client();

        let ack = handle.join(a, RoomId::from("r"), "a".into(), a_tx).await.unwrap();
        assert_eq!(ack.mark, Mark::X);
        let ack = handle.join(b, RoomId::from("r"), "b".into(), b_tx).await.unwrap();
        assert_eq!(ack.mark, Mark::O);

        assert!(a_rx.recv().await.unwrap().as_str().contains("\"start\""));
        assert!(b_rx.recv().await.unwrap().as_str().contains("\"start\""));
    }

    #[tokio::test]
    async fn full_room_reply_comes_back_as_error() {
        let handle = CoordinatorHandle::spawn(MovePolicy::Validated, 16);
        for name in ["a", "b"] {
            let (conn, tx, _rx) = client();
            handle.join(conn, RoomId::from("r"), name.into(), tx).await.unwrap();
        }
        let (c, c_tx, mut c_rx) = client();
        let err = handle.join(c, RoomId::from("r"), "c".into(), c_tx).await.unwrap_err();
        assert!(matches!(err, SessionError::RoomFull(_)));
        assert_eq!(c_rx.recv().await.unwrap().as_str(), r#"{"type":"full"}"#);
    }

    #[tokio::test]
    async fn disconnect_after_leave_is_a_noop() {
        let handle = CoordinatorHandle::spawn(MovePolicy::Validated, 16);
        let (a, a_tx, _a_rx) = client();
        let (b, b_tx, mut b_rx) = client();
        handle.join(a, RoomId::from("r"), "a".into(), a_tx).await.unwrap();
        handle.join(b, RoomId::from("r"), "b".into(), b_tx).await.unwrap();
        let _start = b_rx.recv().await.unwrap();

        handle.leave_room(a).await.unwrap();
        handle.disconnect(a).await.unwrap();
        handle.disconnect(a).await.unwrap();

        let left = b_rx.recv().await.unwrap();
        assert!(left.as_str().contains("opponentLeft"));
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_drops_sender_before_ack() {
        let handle = CoordinatorHandle::spawn(MovePolicy::Validated, 16);
        let (a, a_tx, mut a_rx) = client();
        handle.join(a, RoomId::from("r"), "a".into(), a_tx).await.unwrap();
        handle.disconnect(a).await.unwrap();

        // the room was the only other holder of the sender
        assert!(a_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn in_flight_move_is_applied_before_disconnect() {
        let handle = CoordinatorHandle::spawn(MovePolicy::Validated, 16);
        let (a, a_tx, _a_rx) = client();
        let (b, b_tx, mut b_rx) = client();
        handle.join(a, RoomId::from("r"), "a".into(), a_tx).await.unwrap();
        handle.join(b, RoomId::from("r"), "b".into(), b_tx).await.unwrap();
        let _start = b_rx.recv().await.unwrap();

        handle.submit_move(a, MoveRequest::Cell(4)).await.unwrap();
        handle.disconnect(a).await.unwrap();

        assert!(b_rx.recv().await.unwrap().as_str().contains("\"move\""));
        assert!(b_rx.recv().await.unwrap().as_str().contains("opponentLeft"));
        assert!(b_rx.try_recv().is_err());
    }
}
