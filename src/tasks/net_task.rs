//! Gesture intake: TCP and stdin readers feeding a latest-gesture mailbox.
//!
//! Intake runs on plain threads, one line per token. The motion task only ever sees the most
//! recent token, through [`MailboxSource`].
use core::cell::RefCell;
use std::io::{self, BufRead, BufReader};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::{error, info, warn};

use crate::robot::commands::GestureToken;
use crate::robot::state::StopHandle;
use crate::tasks::motion_task::GestureSource;

/// Intake-level controls, handled before the gesture vocabulary.
const QUIT_TOKENS: [&str; 2] = ["quit", "q"];
const ESTOP_TOKENS: [&str; 2] = ["estop", "e"];
/// Published when a TCP client goes away, so the robot does not keep walking.
const DISCONNECT_TOKEN: &str = "none";

/// Single-slot, last-writer-wins cell shared between intake threads and the motion task.
pub struct GestureMailbox {
    latest: Mutex<CriticalSectionRawMutex, RefCell<Option<GestureToken>>>,
}

impl GestureMailbox {
    pub const fn new() -> Self {
        Self {
            latest: Mutex::new(RefCell::new(None)),
        }
    }

    /// Returns `false` and keeps the previous token when `token` does not fit.
    pub fn publish(&self, token: &str) -> bool {
        let Ok(token) = GestureToken::try_from(token.trim()) else {
            return false;
        };
        self.latest.lock(|cell| *cell.borrow_mut() = Some(token));
        true
    }

    pub fn latest(&self) -> Option<GestureToken> {
        self.latest.lock(|cell| cell.borrow().clone())
    }
}

impl Default for GestureMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// [`GestureSource`] over a shared mailbox. `poll` takes a snapshot, `read_gesture` returns it.
pub struct MailboxSource {
    mailbox: Arc<GestureMailbox>,
    current: Option<GestureToken>,
}

impl MailboxSource {
    pub fn new(mailbox: Arc<GestureMailbox>) -> Self {
        Self {
            mailbox,
            current: None,
        }
    }
}

impl GestureSource for MailboxSource {
    fn poll(&mut self) {
        self.current = self.mailbox.latest();
    }

    fn read_gesture(&self) -> Option<GestureToken> {
        self.current.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeEnd {
    /// The peer sent a quit token.
    Quit,
    /// The stream ended.
    Eof,
}

/// Reads tokens line by line until a quit token or end of stream.
pub fn read_tokens<R: BufRead>(
    reader: R,
    mailbox: &GestureMailbox,
    stop: &StopHandle,
) -> io::Result<IntakeEnd> {
    for line in reader.lines() {
        let line = line?;
        let token = line.trim();
        if QUIT_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            return Ok(IntakeEnd::Quit);
        }
        if ESTOP_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            warn!("[NET_TASK] emergency stop requested");
            stop.request_emergency_stop();
            continue;
        }
        if !mailbox.publish(token) {
            warn!("[NET_TASK] token too long, dropped: {token}");
        }
    }
    Ok(IntakeEnd::Eof)
}

/// Accepts one client at a time on `addr`.
pub fn spawn_tcp_intake(
    addr: &str,
    mailbox: Arc<GestureMailbox>,
    stop: StopHandle,
) -> io::Result<JoinHandle<()>> {
    let listener = TcpListener::bind(addr)?;
    info!("[NET_TASK] gesture server listening at {}", listener.local_addr()?);

    thread::Builder::new()
        .name("gesture-tcp".into())
        .spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!("[NET_TASK] accept failed: {e}");
                        thread::sleep(Duration::from_millis(500));
                        continue;
                    }
                };
                let peer = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "unknown peer".into());
                info!("[NET_TASK] client {peer} connected");

                match read_tokens(BufReader::new(stream), &mailbox, &stop) {
                    Ok(IntakeEnd::Quit) => info!("[NET_TASK] client {peer} closed the connection"),
                    Ok(IntakeEnd::Eof) => info!("[NET_TASK] client {peer} disconnected"),
                    Err(e) => error!("[NET_TASK] read error from {peer}: {e}"),
                }
                mailbox.publish(DISCONNECT_TOKEN);
            }
        })
}

/// Keyboard control on the terminal. A quit token shuts the controller down.
pub fn spawn_stdin_intake(
    mailbox: Arc<GestureMailbox>,
    stop: StopHandle,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("gesture-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            match read_tokens(stdin.lock(), &mailbox, &stop) {
                Ok(IntakeEnd::Quit) => {
                    info!("[NET_TASK] quit from keyboard");
                    stop.request_shutdown();
                }
                Ok(IntakeEnd::Eof) => info!("[NET_TASK] stdin closed, keyboard intake off"),
                Err(e) => error!("[NET_TASK] stdin read error: {e}"),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use std::net::TcpStream;

    #[test]
    fn last_token_wins() {
        let mailbox = GestureMailbox::new();
        let stop = StopHandle::new();
        let end = read_tokens(Cursor::new("forward\n  turn_left \njump\n"), &mailbox, &stop);
        assert_eq!(end.unwrap(), IntakeEnd::Eof);
        assert_eq!(mailbox.latest().as_deref(), Some("jump"));
    }

    #[test]
    fn quit_stops_reading() {
        let mailbox = GestureMailbox::new();
        let stop = StopHandle::new();
        let end = read_tokens(Cursor::new("w\nQUIT\nx\n"), &mailbox, &stop);
        assert_eq!(end.unwrap(), IntakeEnd::Quit);
        assert_eq!(mailbox.latest().as_deref(), Some("w"));
        assert!(!stop.shutdown_requested());
    }

    #[test]
    fn estop_is_signalled_not_published() {
        let mailbox = GestureMailbox::new();
        let stop = StopHandle::new();
        read_tokens(Cursor::new("forward\nestop\n"), &mailbox, &stop).unwrap();
        assert!(stop.take_emergency_stop());
        assert_eq!(mailbox.latest().as_deref(), Some("forward"));
    }

    #[test]
    fn oversized_tokens_are_dropped() {
        let mailbox = GestureMailbox::new();
        assert!(mailbox.publish("stop"));
        assert!(!mailbox.publish("a_gesture_name_far_too_long_for_the_slot"));
        assert_eq!(mailbox.latest().as_deref(), Some("stop"));
    }

    #[test]
    fn source_snapshots_on_poll() {
        let mailbox = Arc::new(GestureMailbox::new());
        let mut source = MailboxSource::new(mailbox.clone());
        assert_eq!(source.read_gesture(), None);

        mailbox.publish("forward");
        assert_eq!(source.read_gesture(), None);
        source.poll();
        assert_eq!(source.read_gesture().as_deref(), Some("forward"));
    }

    #[test]
    fn tcp_client_feeds_the_mailbox() {
        let mailbox = Arc::new(GestureMailbox::new());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let handle = spawn_tcp_intake(&addr, mailbox.clone(), StopHandle::new()).unwrap();
        let mut client = TcpStream::connect(&addr).unwrap();
        client.write_all(b"turn_right\nquit\n").unwrap();

        for _ in 0..200 {
            if mailbox.latest().as_deref() == Some(DISCONNECT_TOKEN) {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(mailbox.latest().as_deref(), Some(DISCONNECT_TOKEN));
        assert!(!handle.is_finished());
    }
}
