//! Playback execution units.
//!
//! A `Player` launches one clip on its own thread or process and hands back a
//! `PlaybackUnit` the controller can poll and terminate. Termination is
//! synchronous: when `terminate` returns the unit has been joined or reaped.

use std::io::{Cursor, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStreamBuilder, Sink};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::AudioClip;
use crate::error::PlaybackError;

/// How often the rodio thread checks for a stop request.
const STOP_POLL: Duration = Duration::from_millis(20);

/// A running playback.
pub trait PlaybackUnit: Send {
    /// Non-blocking: true while audio is still being produced.
    fn is_alive(&mut self) -> bool;

    /// Stop immediately and reap. Safe to call more than once and on a unit
    /// that already finished.
    fn terminate(&mut self);
}

/// Starts playback units.
#[async_trait]
pub trait Player: Send + Sync {
    async fn launch(&self, clip: AudioClip) -> Result<Box<dyn PlaybackUnit>, PlaybackError>;
}

/// In-process playback through rodio on a dedicated thread.
#[derive(Debug, Default)]
pub struct RodioPlayer;

impl RodioPlayer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Player for RodioPlayer {
    async fn launch(&self, clip: AudioClip) -> Result<Box<dyn PlaybackUnit>, PlaybackError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), PlaybackError>>();

        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("playback".into())
            .spawn(move || {
                // The output stream is opened on this thread and dropped with it.
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(PlaybackError::Output(e.to_string())));
                        return;
                    }
                };
                let sink = Sink::connect_new(stream.mixer());
                match Decoder::new(Cursor::new(clip.bytes)) {
                    Ok(source) => sink.append(source),
                    Err(e) => {
                        let _ = ready_tx.send(Err(PlaybackError::Output(format!("undecodable audio: {e}"))));
                        return;
                    }
                }
                if ready_tx.send(Ok(())).is_err() {
                    debug!("Playback abandoned before start");
                    return;
                }

                drain(|| sink.empty(), &thread_stop, STOP_POLL);
                sink.stop();
            })
            .map_err(PlaybackError::Thread)?;

        // Owned before the await: if this future is dropped the unit's Drop
        // raises the stop flag and the thread exits without playing.
        let mut unit = RodioUnit {
            stop,
            handle: Some(handle),
        };

        let started = ready_rx
            .await
            .unwrap_or_else(|_| Err(PlaybackError::Output("playback thread exited early".into())));

        if let Err(e) = started {
            unit.terminate();
            return Err(e);
        }
        Ok(Box::new(unit))
    }
}

/// Block until `is_empty` reports true or `stop` is raised, checking every
/// `tick`.
fn drain(is_empty: impl Fn() -> bool, stop: &AtomicBool, tick: Duration) {
    while !is_empty() && !stop.load(Ordering::Relaxed) {
        thread::sleep(tick);
    }
}

struct RodioUnit {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackUnit for RodioUnit {
    fn is_alive(&mut self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn terminate(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Playback thread panicked");
            }
        }
    }
}

impl Drop for RodioUnit {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Playback through an external player process fed on stdin
/// (e.g. `mpg123 -q -`). A misbehaving player cannot take the controller
/// down with it.
///
/// On unix the player runs in its own process group, so a shell wrapper or
/// pipeline is stopped as a whole.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    argv: Vec<String>,
}

impl CommandPlayer {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl Player for CommandPlayer {
    async fn launch(&self, clip: AudioClip) -> Result<Box<dyn PlaybackUnit>, PlaybackError> {
        let (program, args) = self.argv.split_first().ok_or(PlaybackError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| PlaybackError::Spawn {
            command: program.clone(),
            source,
        })?;

        // Fed from a thread so a slow reader never blocks the controller.
        // Killing the child breaks the pipe and ends the writer.
        let feeder = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(&clip.bytes) {
                    debug!("Player stdin closed early: {e}");
                }
            })
        });

        debug!("Started player {program} (pid {})", child.id());

        Ok(Box::new(ProcessUnit {
            child,
            feeder,
            reaped: false,
        }))
    }
}

struct ProcessUnit {
    child: Child,
    feeder: Option<JoinHandle<()>>,
    reaped: bool,
}

impl PlaybackUnit for ProcessUnit {
    fn is_alive(&mut self) -> bool {
        !self.reaped && matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(&mut self) {
        if !self.reaped {
            kill_tree(&mut self.child);
            match self.child.wait() {
                Ok(status) => debug!("Player exited: {status}"),
                Err(e) => warn!("Failed to reap player: {e}"),
            }
            self.reaped = true;
        }
        if let Some(feeder) = self.feeder.take() {
            let _ = feeder.join();
        }
    }
}

/// SIGKILL the player's whole process group. Runs even when the leader has
/// already exited, so background children it left behind go too.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => {
            warn!("Failed to kill player group {}: {e}", child.id());
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        if let Err(e) = child.kill() {
            warn!("Failed to kill player {}: {e}", child.id());
        }
    }
}
