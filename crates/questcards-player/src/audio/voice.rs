//! Local fallback voice
//!
//! With `local_voice_command` set (e.g. `espeak-ng -s 150`), the line is
//! appended as the last argument and the process is awaited. Without one
//! the line is shown as a subtitle and held for its reading time.
//! `stop` interrupts whichever is running.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Notify;

use questcards_engine::narration::LocalVoice;

pub struct SystemVoice {
    /// Program + leading arguments
    command: Option<(String, Vec<String>)>,
    interrupt: Notify,
}

impl SystemVoice {
    pub fn new(command: Option<&str>) -> Self {
        let command = command.and_then(|raw| {
            let mut parts = raw.split_whitespace().map(str::to_string);
            let program = parts.next()?;
            Some((program, parts.collect()))
        });
        if let Some((program, _)) = &command {
            tracing::info!("Local voice: {}", program);
        }
        Self {
            command,
            interrupt: Notify::new(),
        }
    }

    async fn show_subtitle(&self, text: &str) {
        println!("  » {}", text);
        tokio::time::sleep(subtitle_duration(text)).await;
    }
}

/// Reading time for a subtitle: `1000·ln(len)` ms, at least 500 ms
pub fn subtitle_duration(text: &str) -> Duration {
    let len = text.chars().count();
    if len <= 1 {
        return Duration::from_millis(500);
    }
    let ms = (1000.0 * (len as f32).ln()) as u64;
    Duration::from_millis(ms.max(500))
}

impl LocalVoice for SystemVoice {
    async fn say(&self, text: &str) {
        let interrupted = self.interrupt.notified();

        let Some((program, args)) = &self.command else {
            tokio::select! {
                _ = self.show_subtitle(text) => {}
                _ = interrupted => {}
            }
            return;
        };

        let spawned = Command::new(program)
            .args(args)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Local voice '{}' failed to start: {}", program, e);
                tokio::select! {
                    _ = self.show_subtitle(text) => {}
                    _ = interrupted => {}
                }
                return;
            }
        };

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) if !status.success() => {
                    tracing::debug!("Local voice exited with {}", status)
                }
                Err(e) => tracing::warn!("Local voice wait failed: {}", e),
                _ => {}
            },
            _ = interrupted => {
                let _ = child.kill().await;
            }
        }
    }

    fn stop(&self) {
        self.interrupt.notify_waiters();
    }
}
