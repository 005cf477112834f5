//! Session coordinator: runs one registered session to completion.

use std::sync::Arc;

use remote_console_core::{ClientEnvelope, Connection, IdGenerator, TransportError};

use crate::{
    console::Console,
    input::InputSource,
    multiplexer::InputMultiplexer,
    pump::{EventPump, SessionEnd},
};

/// Result of one session.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Why the session ended.
    pub end: SessionEnd,
    /// Input handed back for the next login.
    pub input: InputSource,
}

/// Drives one authenticated, registered session.
///
/// This task is the only writer on the connection. Each operator line goes
/// either to the pending interactive prompt or out as a new command, never
/// both.
pub struct SessionCoordinator {
    client_id: String,
    controller_id: String,
    ids: Arc<dyn IdGenerator>,
    console: Console,
}

impl SessionCoordinator {
    #[must_use]
    pub fn new(
        client_id: String,
        controller_id: String,
        ids: Arc<dyn IdGenerator>,
        console: Console,
    ) -> Self {
        Self {
            client_id,
            controller_id,
            ids,
            console,
        }
    }

    /// Run until the server closes the session or the connection fails.
    pub async fn run(self, connection: Connection, input: InputSource) -> SessionOutcome {
        let (mut sink, stream) = connection.split();
        let mut pump = EventPump::spawn(stream, self.console.clone());
        let mut mux = InputMultiplexer::start(input);
        let mut pending_prompt: Option<String> = None;
        let mut input_open = true;

        let end = loop {
            tokio::select! {
                biased;
                end = &mut pump.done => {
                    break end.unwrap_or(SessionEnd::Disconnected(TransportError::Closed));
                }
                // Later prompts wait in the channel until this one is answered.
                Some(command_id) = pump.prompts.recv(), if pending_prompt.is_none() => {
                    pending_prompt = Some(command_id);
                }
                line = mux.next_line(), if input_open => {
                    let Some(line) = line else {
                        tracing::info!("Local input closed; waiting for the session to end");
                        input_open = false;
                        continue;
                    };
                    let envelope = self.route(line, &mut pending_prompt);
                    if let Err(e) = sink.send(&envelope).await {
                        tracing::warn!("Failed to send: {e}");
                        break SessionEnd::Disconnected(e);
                    }
                }
            }
        };

        if let Err(e) = sink.close().await {
            tracing::debug!("Error closing connection: {e}");
        }
        pump.shutdown().await;
        let input = mux.stop().await;
        if matches!(end, SessionEnd::Disconnected(_)) {
            self.console.println("\nConnection lost").await;
        }
        tracing::info!(?end, "Session finished");

        SessionOutcome { end, input }
    }

    fn route(&self, line: String, pending_prompt: &mut Option<String>) -> ClientEnvelope {
        match pending_prompt.take() {
            Some(command_id) => {
                tracing::debug!(%command_id, "Answering interactive prompt");
                ClientEnvelope::InteractiveResponse {
                    command_id,
                    command: line,
                    id: self.controller_id.clone(),
                }
            }
            None => {
                let command_id = self.ids.next_id();
                tracing::debug!(%command_id, "Sending command");
                ClientEnvelope::Command {
                    client_id: self.client_id.clone(),
                    command_id,
                    command: line,
                    id: self.controller_id.clone(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use remote_console_core::{Connector, SequentialIds, ServerEnvelope};
    use remote_console_transport::{MemoryServer, ServerConnection, memory_pair};

    use crate::testing::{Transcript, scripted_input, typed_input, within};

    use super::*;

    async fn open(server: &mut MemoryServer, conn: Connection) -> (Connection, ServerConnection) {
        let peer = within(server.accept()).await.unwrap();
        (conn, peer)
    }

    fn coordinator(transcript: &Transcript) -> SessionCoordinator {
        SessionCoordinator::new(
            "box-1".to_string(),
            "ctl".to_string(),
            Arc::new(SequentialIds::new("cmd")),
            Console::new(transcript.clone()),
        )
    }

    #[tokio::test]
    async fn test_lines_become_commands() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, operator) = typed_input();

        let session = tokio::spawn(coordinator(&transcript).run(conn, input));

        operator.send("uptime".to_string()).unwrap();
        operator.send(String::new()).unwrap();
        assert_eq!(
            within(peer.recv()).await,
            Some(ClientEnvelope::Command {
                client_id: "box-1".to_string(),
                command_id: "cmd-1".to_string(),
                command: "uptime".to_string(),
                id: "ctl".to_string(),
            })
        );
        assert_eq!(
            within(peer.recv()).await,
            Some(ClientEnvelope::Command {
                client_id: "box-1".to_string(),
                command_id: "cmd-2".to_string(),
                command: String::new(),
                id: "ctl".to_string(),
            })
        );

        peer.send(&ServerEnvelope::SessionClosed);
        let outcome = within(session).await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Closed));
    }

    #[tokio::test]
    async fn test_prompt_answer_round_trip() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, operator) = typed_input();

        let session = tokio::spawn(coordinator(&transcript).run(conn, input));

        peer.send(&ServerEnvelope::InteractivePrompt {
            command_id: "X".to_string(),
            prompt: "Continue? ".to_string(),
        });
        transcript.wait_for("Continue? ").await;

        operator.send("abc".to_string()).unwrap();
        assert_eq!(
            within(peer.recv()).await,
            Some(ClientEnvelope::InteractiveResponse {
                command_id: "X".to_string(),
                command: "abc".to_string(),
                id: "ctl".to_string(),
            })
        );

        // The prompt is answered; the next line is a fresh command.
        operator.send("ls".to_string()).unwrap();
        match within(peer.recv()).await {
            Some(ClientEnvelope::Command {
                command_id, command, ..
            }) => {
                assert_eq!(command_id, "cmd-1");
                assert_eq!(command, "ls");
            }
            other => panic!("expected a command, got {other:?}"),
        }

        peer.send(&ServerEnvelope::SessionClosed);
        within(session).await.unwrap();
        assert!(peer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_result_needs_no_reply() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, _operator) = typed_input();

        let session = tokio::spawn(coordinator(&transcript).run(conn, input));

        peer.send(&ServerEnvelope::output("hello\n"));
        peer.send(&ServerEnvelope::SessionClosed);
        within(session).await.unwrap();

        assert!(transcript.contents().starts_with("hello\n"));
        assert_eq!(within(peer.recv()).await, None);
    }

    #[tokio::test]
    async fn test_session_closed_mid_entry() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, operator) = typed_input();

        let session = tokio::spawn(coordinator(&transcript).run(conn, input));
        peer.send(&ServerEnvelope::SessionClosed);
        let mut outcome = within(session).await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Closed));

        // Typed after the session ended: never sent, handed to the next reader.
        operator.send("rm -rf build".to_string()).unwrap();
        assert_eq!(within(peer.recv()).await, None);
        assert_eq!(
            within(outcome.input.next_line()).await.as_deref(),
            Some("rm -rf build")
        );
    }

    #[tokio::test]
    async fn test_exhausted_input_keeps_servicing_server() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();

        let session = tokio::spawn(coordinator(&transcript).run(conn, scripted_input("make\n")));

        assert!(matches!(
            within(peer.recv()).await,
            Some(ClientEnvelope::Command { command, .. }) if command == "make"
        ));

        peer.send(&ServerEnvelope::output("build ok\n"));
        transcript.wait_for("build ok\n").await;
        assert!(!session.is_finished());

        peer.send(&ServerEnvelope::SessionClosed);
        let outcome = within(session).await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Closed));
        assert!(outcome.input.is_exhausted());
    }

    #[tokio::test]
    async fn test_disconnect_ends_session() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, _operator) = typed_input();

        let session = tokio::spawn(coordinator(&transcript).run(conn, input));
        peer.disconnect();

        let outcome = within(session).await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Disconnected(_)));
        assert_eq!(transcript.contents().matches("Connection lost").count(), 1);
    }

    #[tokio::test]
    async fn test_broken_connection_reports_loss_once() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, operator) = typed_input();

        let session = tokio::spawn(coordinator(&transcript).run(conn, input));
        // Reads and writes both fail from here on.
        drop(peer);
        operator.send("ls".to_string()).unwrap();

        let outcome = within(session).await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Disconnected(_)));
        assert_eq!(transcript.contents().matches("Connection lost").count(), 1);
    }

    #[tokio::test]
    async fn test_second_prompt_waits_for_first_answer() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, operator) = typed_input();

        let session = tokio::spawn(coordinator(&transcript).run(conn, input));

        peer.send(&ServerEnvelope::InteractivePrompt {
            command_id: "P1".to_string(),
            prompt: "first? ".to_string(),
        });
        peer.send(&ServerEnvelope::InteractivePrompt {
            command_id: "P2".to_string(),
            prompt: "second? ".to_string(),
        });
        transcript.wait_for("first? second? ").await;

        operator.send("one".to_string()).unwrap();
        operator.send("two".to_string()).unwrap();
        assert_eq!(
            within(peer.recv()).await,
            Some(ClientEnvelope::InteractiveResponse {
                command_id: "P1".to_string(),
                command: "one".to_string(),
                id: "ctl".to_string(),
            })
        );
        assert_eq!(
            within(peer.recv()).await,
            Some(ClientEnvelope::InteractiveResponse {
                command_id: "P2".to_string(),
                command: "two".to_string(),
                id: "ctl".to_string(),
            })
        );

        peer.send(&ServerEnvelope::SessionClosed);
        within(session).await.unwrap();
        assert!(peer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_close_wins_over_ready_line() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, operator) = typed_input();

        // Both the close and the operator's line are waiting before the
        // session starts.
        peer.send(&ServerEnvelope::SessionClosed);
        operator.send("reboot".to_string()).unwrap();

        let outcome = within(coordinator(&transcript).run(conn, input)).await;
        assert!(matches!(outcome.end, SessionEnd::Closed));
        assert_eq!(within(peer.recv()).await, None);
    }

    #[tokio::test]
    async fn test_odd_result_does_not_end_session() {
        let (connector, mut server) = memory_pair();
        let conn = connector.connect().await.unwrap();
        let (conn, mut peer) = open(&mut server, conn).await;
        let transcript = Transcript::default();
        let (input, operator) = typed_input();

        let session = tokio::spawn(coordinator(&transcript).run(conn, input));

        peer.send_raw(r#"{"type":"result","result":{"output":5}}"#);
        operator.send("whoami".to_string()).unwrap();
        assert!(matches!(
            within(peer.recv()).await,
            Some(ClientEnvelope::Command { command, .. }) if command == "whoami"
        ));

        peer.send(&ServerEnvelope::SessionClosed);
        let outcome = within(session).await.unwrap();
        assert!(matches!(outcome.end, SessionEnd::Closed));
        assert!(!transcript.contents().contains("Connection lost"));
    }
}
