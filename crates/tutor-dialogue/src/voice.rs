//! Voice loop: listen, run a turn, speak, until the session ends.
//!
//! Speech-to-text and text-to-speech are collaborators behind [`Listener`]
//! and [`Speaker`]. The console implementations stand in for them in
//! `tutor chat`.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::DialogueError;
use crate::orchestrator::{DialogueOrchestrator, REPROMPT};
use crate::session::Session;

/// Consecutive listener errors tolerated before giving up.
const MAX_LISTEN_FAILURES: u32 = 3;

/// Delivers reply text to the user.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), DialogueError>;
}

/// Captures one utterance.
///
/// `Ok(None)` means nothing intelligible was heard before `timeout`.
/// `Err(DialogueError::InputClosed)` ends the loop cleanly.
pub trait Listener: Send + Sync {
    fn listen(&self, timeout: Duration) -> Result<Option<String>, DialogueError>;
}

/// Writes replies as text lines.
pub struct ConsoleSpeaker<W: Write + Send = Stdout> {
    out: Mutex<W>,
}

impl ConsoleSpeaker<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSpeaker<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> Speaker for ConsoleSpeaker<W> {
    fn speak(&self, text: &str) -> Result<(), DialogueError> {
        let mut out = self
            .out
            .lock()
            .map_err(|e| DialogueError::Voice(format!("speaker lock poisoned: {}", e)))?;
        writeln!(out, "Tutor: {}", text)?;
        out.flush()?;
        Ok(())
    }
}

/// Reads one utterance per line. Line input cannot time out, so the
/// timeout is ignored; a blank line counts as silence.
pub struct StdinListener<R: BufRead + Send = BufReader<Stdin>> {
    input: Mutex<R>,
}

impl StdinListener<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead + Send> StdinListener<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }
}

impl<R: BufRead + Send> Listener for StdinListener<R> {
    fn listen(&self, _timeout: Duration) -> Result<Option<String>, DialogueError> {
        let mut input = self
            .input
            .lock()
            .map_err(|e| DialogueError::Voice(format!("listener lock poisoned: {}", e)))?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(DialogueError::InputClosed);
        }
        let line = line.trim();
        Ok((!line.is_empty()).then(|| line.to_string()))
    }
}

/// How a voice session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceSessionSummary {
    pub turns: u64,
    pub terminated: bool,
}

/// Run the listen/respond loop until the session terminates or input closes.
pub fn run_voice_session(
    orchestrator: &DialogueOrchestrator,
    session: &mut Session,
    speaker: &dyn Speaker,
    listener: &dyn Listener,
    timeout: Duration,
) -> Result<VoiceSessionSummary, DialogueError> {
    info!(
        session_id = %session.id(),
        pages = session.document().page_count(),
        "Voice session started"
    );
    speaker.speak(orchestrator.welcome_message())?;

    let mut failures = 0u32;
    while session.is_active() {
        match listener.listen(timeout) {
            Ok(Some(utterance)) => {
                failures = 0;
                info!(utterance = %utterance, "Heard utterance");
                let result = orchestrator.submit_utterance(session, &utterance);
                speaker.speak(&result.response_text)?;
            }
            Ok(None) => {
                failures = 0;
                speaker.speak(REPROMPT)?;
            }
            Err(DialogueError::InputClosed) => {
                info!("Input closed; leaving voice session");
                break;
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, failures, "Listening failed");
                if failures >= MAX_LISTEN_FAILURES {
                    return Err(e);
                }
                speaker.speak(REPROMPT)?;
            }
        }
    }

    Ok(VoiceSessionSummary {
        turns: session.turns(),
        terminated: !session.is_active(),
    })
}
