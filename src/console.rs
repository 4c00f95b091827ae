//! Terminal side of a transfer: renders events and turns keystrokes into
//! control calls. Everything here runs on the main thread except the stdin
//! reader.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use copyctl::{FailureDecision, GateState, TransferControl, TransferEvent};

/// Start the stdin reader.
///
/// `p` toggles the pause gate, `r` resumes and `c` cancels; any other line is handed
/// back through the returned receiver as an answer to a prompt.
pub fn spawn_input(control: TransferControl) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "p" => {
                    let state = control.toggle_pause();
                    tracing::info!(?state, "pause gate toggled");
                }
                "pause" => control.pause(),
                "r" | "resume" => control.resume(),
                "c" | "cancel" => control.request_cancel(),
                other => {
                    if tx.send(other.to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// How often a pending prompt re-checks for cancellation
const PROMPT_POLL: Duration = Duration::from_millis(100);

pub struct Console {
    bar: Option<ProgressBar>,
    name: String,
    control: TransferControl,
}

impl Console {
    pub fn new(json: bool, name: String, control: TransferControl) -> Result<Self> {
        let bar = if json {
            None
        } else {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({percent}%)",
                )?
                .progress_chars("=> "),
            );
            bar.set_message(name.clone());
            Some(bar)
        };
        Ok(Self { bar, name, control })
    }

    /// Consume events until the worker hangs up
    pub fn run(&self, events: Receiver<TransferEvent>, answers: &Receiver<String>) -> Result<()> {
        for event in events {
            if self.bar.is_none() {
                println!("{}", serde_json::to_string(&event)?);
            }
            match event {
                TransferEvent::Progress(update) => {
                    if let Some(bar) = &self.bar {
                        bar.set_length(update.source_len);
                        bar.set_position(update.bytes_copied);
                        match update.gate {
                            GateState::Open => bar.set_message(self.name.clone()),
                            GateState::Closed => bar.set_message(format!("{} (paused)", self.name)),
                        }
                    }
                }
                TransferEvent::Notice { notice, .. } => self.say(&notice.to_string()),
                TransferEvent::IoFailure { message, reply, .. } => {
                    let decision = self.ask_retry(&message, answers);
                    // Worker may already be gone if it was cancelled meanwhile
                    let _ = reply.send(decision);
                }
                TransferEvent::Finished { outcome, error, .. } => {
                    if let Some(bar) = &self.bar {
                        match error {
                            Some(error) => bar.abandon_with_message(format!("{}: {}", self.name, error)),
                            None => bar.finish_with_message(format!("{} {}", self.name, outcome)),
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn say(&self, message: &str) {
        match &self.bar {
            Some(bar) => bar.println(message),
            None => eprintln!("{}", message),
        }
    }

    fn ask_retry(&self, message: &str, answers: &Receiver<String>) -> FailureDecision {
        let prompt = || {
            eprint!("{} Retry? [y/N] ", message);
            let _ = io::stderr().flush();
        };
        match &self.bar {
            Some(bar) => bar.suspend(prompt),
            None => prompt(),
        }
        await_answer(answers, &self.control)
    }
}

/// Block until the user answers, giving up as soon as the transfer is cancelled
fn await_answer(answers: &Receiver<String>, control: &TransferControl) -> FailureDecision {
    loop {
        if control.is_cancelled() {
            return FailureDecision::Abort;
        }
        match answers.recv_timeout(PROMPT_POLL) {
            Ok(answer) => return parse_answer(&answer),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return FailureDecision::Abort,
        }
    }
}

fn parse_answer(answer: &str) -> FailureDecision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => FailureDecision::Retry,
        _ => FailureDecision::Abort,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_yes_retries() {
        assert_eq!(parse_answer("y"), FailureDecision::Retry);
        assert_eq!(parse_answer(" YES "), FailureDecision::Retry);
        assert_eq!(parse_answer(""), FailureDecision::Abort);
        assert_eq!(parse_answer("no"), FailureDecision::Abort);
    }

    #[test]
    fn pending_prompt_gives_up_on_cancel() {
        let (_tx, rx) = mpsc::channel::<String>();
        let control = TransferControl::new();

        let canceller = control.clone();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.request_cancel();
        });

        assert_eq!(await_answer(&rx, &control), FailureDecision::Abort);
        worker.join().unwrap();
    }

    #[test]
    fn prompt_takes_typed_answer() {
        let (tx, rx) = mpsc::channel();
        tx.send("y".to_string()).unwrap();
        assert_eq!(await_answer(&rx, &TransferControl::new()), FailureDecision::Retry);
    }
}
