//! Session worker driving one client connection to completion

use crate::game::{Flow, GameResult, GameSession, SessionStatus};
use crate::utils::get_timestamp;
use log::{debug, error, info};
use shared::{split_messages, Command, READ_BUFFER_SIZE};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Why a session stopped
#[derive(Debug)]
pub enum SessionEnd {
    /// Client sent `DONE`
    Finished,
    /// Peer closed, reset or broke the pipe; costs a penalty
    HungUp,
    /// No data within the read timeout
    TimedOut,
    /// Any other transport failure
    Failed(io::Error),
}

impl From<io::Error> for SessionEnd {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => SessionEnd::HungUp,
            _ => SessionEnd::Failed(err),
        }
    }
}

/// Runs the request/response loop until the session ends and returns its
/// result record. Transport errors never escape, they only decide how the
/// session is finalized.
pub async fn run_session<S>(
    mut stream: S,
    mut session: GameSession,
    status: &watch::Sender<SessionStatus>,
    read_timeout: Duration,
) -> GameResult
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!("Begin {}", session);

    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    let end = loop {
        let len = match timeout(read_timeout, stream.read(&mut buffer)).await {
            Err(_) => break SessionEnd::TimedOut,
            Ok(Ok(0)) => break SessionEnd::HungUp,
            Ok(Ok(len)) => len,
            Ok(Err(e)) => break SessionEnd::from(e),
        };

        let chunk = String::from_utf8_lossy(&buffer[..len]);
        let flow = respond(&mut stream, &mut session, &chunk).await;
        status.send_replace(session.status());

        match flow {
            Ok(Flow::Continue) => {}
            Ok(Flow::Close) => break SessionEnd::Finished,
            Err(e) => break SessionEnd::from(e),
        }
    };

    match &end {
        SessionEnd::HungUp => {
            session.abandon();
        }
        SessionEnd::Failed(e) => error!("Transport failure in {}: {}", session, e),
        SessionEnd::Finished | SessionEnd::TimedOut => {}
    }
    status.send_replace(session.status());

    if let Err(e) = stream.shutdown().await {
        debug!("Shutdown of {} failed: {}", session, e);
    }

    info!("End {} ({:?}, prize {:?})", session, end, session.prize());
    session.into_result(get_timestamp())
}

// Answers every request carried by one read, in order.
async fn respond<S>(stream: &mut S, session: &mut GameSession, chunk: &str) -> io::Result<Flow>
where
    S: AsyncWrite + Unpin,
{
    for message in split_messages(chunk) {
        let (response, flow) = session.handle(Command::parse(&message));
        debug!("{}: {:?} -> {}", session, message, response);

        stream
            .write_all(format!("{}\n", response).as_bytes())
            .await?;

        if flow == Flow::Close {
            return Ok(Flow::Close);
        }
    }

    Ok(Flow::Continue)
}

/// Spawns the session on its own task. The result is pushed onto `results`
/// whichever way the session ends.
pub fn spawn_session<S>(
    stream: S,
    session: GameSession,
    status: watch::Sender<SessionStatus>,
    results: mpsc::UnboundedSender<GameResult>,
    read_timeout: Duration,
) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let result = run_session(stream, session, &status, read_timeout).await;
        if let Err(e) = results.send(result) {
            error!("Failed to queue result: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Game;
    use std::net::SocketAddr;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn session(doors: [i64; 3]) -> GameSession {
        GameSession::with_game(7, test_addr(), Game::with_doors(doors))
    }

    fn status() -> (watch::Sender<SessionStatus>, watch::Receiver<SessionStatus>) {
        watch::channel(SessionStatus::default())
    }

    #[tokio::test]
    async fn test_full_game() {
        let stream = Builder::new()
            .read(b"PLAYALAN")
            .write(b"HIHIALAN\n")
            .read(b"OPEN0")
            .write(b"PRIZ100\n")
            .read(b"DONE")
            .write(b"GOODBYE\n")
            .build();
        let (tx, rx) = status();

        let result = run_session(stream, session([100, 0, 0]), &tx, TIMEOUT).await;

        assert_eq!(result.name.as_deref(), Some("ALAN"));
        assert_eq!(result.prize, Some(100));
        assert_eq!(result.session_id, 7);
        assert_eq!(rx.borrow().prize, Some(100));
    }

    #[tokio::test]
    async fn test_lowercase_and_guess() {
        let stream = Builder::new()
            .read(b"playbob1\n")
            .write(b"HIHIBOB1\n")
            .read(b"gues1\n")
            .write(b"HINT2\n")
            .read(b"open0\n")
            .write(b"PRIZ100\n")
            .read(b"done\n")
            .write(b"GOODBYE\n")
            .build();
        let (tx, _rx) = status();

        let result = run_session(stream, session([100, 0, 0]), &tx, TIMEOUT).await;

        assert_eq!(result.name.as_deref(), Some("BOB1"));
        assert_eq!(result.prize, Some(100));
    }

    #[tokio::test]
    async fn test_multiple_requests_in_one_read() {
        let stream = Builder::new()
            .read(b"PLAYALAN\nOPEN1\nOPEN1\nDONE\n")
            .write(b"HIHIALAN\n")
            .write(b"PRIZ0\n")
            .write(b"PRIZ-100\n")
            .write(b"GOODBYE\n")
            .build();
        let (tx, _rx) = status();

        let result = run_session(stream, session([100, 0, 0]), &tx, TIMEOUT).await;

        assert_eq!(result.prize, Some(-100));
    }

    #[tokio::test]
    async fn test_garbage_gets_wtf() {
        let stream = Builder::new()
            .read(b"HELLO")
            .write(b"WTF?\n")
            .read(b"OPEN0")
            .write(b"WTF?\n")
            .read(b"DONE")
            .write(b"GOODBYE\n")
            .build();
        let (tx, _rx) = status();

        let result = run_session(stream, session([100, 0, 0]), &tx, TIMEOUT).await;

        assert_eq!(result.name, None);
        assert_eq!(result.prize, None);
    }

    #[tokio::test]
    async fn test_eof_applies_penalty() {
        let stream = Builder::new()
            .read(b"PLAYALAN")
            .write(b"HIHIALAN\n")
            .read(b"OPEN0")
            .write(b"PRIZ100\n")
            .build();
        let (tx, _rx) = status();

        let result = run_session(stream, session([100, 0, 0]), &tx, TIMEOUT).await;

        assert_eq!(result.prize, Some(-100));
    }

    #[tokio::test]
    async fn test_reset_applies_penalty_once() {
        let stream = Builder::new()
            .read(b"PLAYALAN")
            .write(b"HIHIALAN\n")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (tx, _rx) = status();

        let result = run_session(stream, session([100, 0, 0]), &tx, TIMEOUT).await;

        assert_eq!(result.name.as_deref(), Some("ALAN"));
        assert_eq!(result.prize, Some(-100));
    }

    #[tokio::test]
    async fn test_broken_pipe_on_write() {
        let stream = Builder::new()
            .read(b"PLAYALAN")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"))
            .build();
        let (tx, _rx) = status();

        let result = run_session(stream, session([100, 0, 0]), &tx, TIMEOUT).await;

        assert_eq!(result.prize, Some(-100));
    }

    #[tokio::test]
    async fn test_other_io_error_has_no_penalty() {
        let stream = Builder::new()
            .read(b"PLAYALAN")
            .write(b"HIHIALAN\n")
            .read_error(io::Error::new(io::ErrorKind::Other, "boom"))
            .build();
        let (tx, _rx) = status();

        let result = run_session(stream, session([100, 0, 0]), &tx, TIMEOUT).await;

        assert_eq!(result.prize, None);
    }

    #[tokio::test]
    async fn test_timeout_ends_without_penalty() {
        let (client, server) = duplex(1024);
        let (tx, _rx) = status();

        let worker = tokio::spawn(async move {
            run_session(server, session([0, 100, 0]), &tx, Duration::from_millis(100)).await
        });

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();
        writer.write_all(b"PLAYALAN\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("HIHIALAN"));
        writer.write_all(b"OPEN1\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("PRIZ100"));

        let result = worker.await.unwrap();
        assert_eq!(result.prize, Some(100));
        drop(writer);
    }

    #[tokio::test]
    async fn test_spawned_session_queues_result() {
        let stream = Builder::new()
            .read(b"PLAYALAN")
            .write(b"HIHIALAN\n")
            .read(b"DONE")
            .write(b"GOODBYE\n")
            .build();
        let (tx, _rx) = status();
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        spawn_session(stream, session([100, 0, 0]), tx, results_tx, TIMEOUT)
            .await
            .unwrap();

        let result = results_rx.try_recv().unwrap();
        assert_eq!(result.name.as_deref(), Some("ALAN"));
        assert_eq!(result.prize, None);
    }
}
