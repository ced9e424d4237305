use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::overlay::Overlay;
use crate::types::FeedMessage;

/// Manages the producer process that polls the streaming service
#[derive(Clone)]
pub struct FeedManager {
    child: Arc<Mutex<Option<Child>>>,
}

impl FeedManager {
    pub fn new() -> Self {
        Self {
            child: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the producer and start reading its output.
    /// The returned handle finishes when the producer closes stdout.
    pub fn spawn<W: Write + Send + 'static>(
        &self,
        command: &[String],
        overlay: Overlay<W>,
    ) -> Result<JoinHandle<()>> {
        let (program, args) = command
            .split_first()
            .context("Producer command is empty")?;

        log::info!("Spawning producer: {} {:?}", program, args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn producer {:?}", program))?;

        log::info!("Producer spawned with PID: {}", child.id());

        let stdout = child
            .stdout
            .take()
            .context("Failed to capture producer stdout")?;

        let stderr = child
            .stderr
            .take()
            .context("Failed to capture producer stderr")?;

        *self.child.lock() = Some(child);

        let reader = thread::spawn(move || {
            let handled = Self::read_lines(BufReader::new(stdout), &overlay);
            log::warn!("Producer stdout reader stopped after {} messages", handled);
        });

        // Producer diagnostics go to our log
        thread::spawn(move || {
            Self::read_stderr(stderr);
        });

        Ok(reader)
    }

    /// Read the feed from our own stdin when no producer is configured
    pub fn read_stdin<W: Write + Send + 'static>(overlay: Overlay<W>) -> JoinHandle<()> {
        log::info!("No producer configured, reading feed from stdin");

        thread::spawn(move || {
            let stdin = std::io::stdin();
            let handled = Self::read_lines(stdin.lock(), &overlay);
            log::info!("Stdin closed after {} messages", handled);
        })
    }

    /// Dispatch every JSON line from `reader`, returning how many were handled
    pub fn read_lines<R: BufRead, W: Write + Send + 'static>(
        reader: R,
        overlay: &Overlay<W>,
    ) -> usize {
        let mut handled = 0;

        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    log::debug!("Feed line: {}", line);

                    match serde_json::from_str::<FeedMessage>(&line) {
                        Ok(message) => {
                            if let Err(e) = overlay.handle_message(message) {
                                log::error!("Error handling feed message: {:#}", e);
                            } else {
                                handled += 1;
                            }
                        }
                        Err(e) => {
                            log::error!("Failed to parse feed message: {} - {}", e, line);
                        }
                    }
                }
                Err(e) => {
                    log::error!("Error reading feed: {}", e);
                    break;
                }
            }
        }

        handled
    }

    fn read_stderr(stderr: std::process::ChildStderr) {
        let reader = BufReader::new(stderr);

        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        log::info!("[Producer] {}", line);
                    }
                }
                Err(e) => {
                    log::error!("Error reading producer stderr: {}", e);
                    break;
                }
            }
        }

        log::warn!("Producer stderr reader stopped");
    }

    pub fn is_running(&self) -> bool {
        let mut child_guard = self.child.lock();
        if let Some(child) = child_guard.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    log::warn!("Producer process has exited with {}", status);
                    false
                }
                Ok(None) => true,
                Err(e) => {
                    log::error!("Error checking producer status: {}", e);
                    false
                }
            }
        } else {
            false
        }
    }

    /// Stop the producer: SIGTERM, up to 2s grace, then kill
    pub fn stop(&self) -> Result<()> {
        let child_option = self.child.lock().take();
        if let Some(mut child) = child_option {
            log::info!("Stopping producer process with PID {}...", child.id());

            #[cfg(unix)]
            {
                let pid = child.id();
                match Command::new("kill").arg("-TERM").arg(pid.to_string()).output() {
                    Ok(output) if !output.status.success() => {
                        log::warn!(
                            "kill -TERM {} exited with {}: {}",
                            pid,
                            output.status,
                            String::from_utf8_lossy(&output.stderr).trim()
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("Failed to run kill for producer {}: {}", pid, e);
                    }
                }
            }

            #[cfg(windows)]
            {
                child.kill().ok();
            }

            let max_wait_ms = 2000;
            let check_interval_ms = 100;
            let mut waited_ms = 0;

            while waited_ms < max_wait_ms {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        log::info!("Producer exited with status: {:?}", status);
                        return Ok(());
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::error!("Error checking producer status: {}", e);
                        break;
                    }
                }

                thread::sleep(Duration::from_millis(check_interval_ms));
                waited_ms += check_interval_ms;
            }

            log::warn!("Producer didn't stop after {}ms, killing...", max_wait_ms);
            child.kill().context("Failed to kill producer process")?;
            child.wait().context("Failed to wait for producer process")?;
            log::info!("Producer process forcefully terminated");
        }

        Ok(())
    }
}

impl Drop for FeedManager {
    fn drop(&mut self) {
        // Only the last clone owns the producer
        if Arc::strong_count(&self.child) > 1 {
            return;
        }
        if let Err(e) = self.stop() {
            log::error!("Error stopping producer in Drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sink::JsonLines;
    use crate::types::OutputMessage;
    use std::io::Cursor;
    use tokio::runtime::Handle;

    fn overlay() -> (Overlay<Vec<u8>>, JsonLines<Vec<u8>>) {
        let output = JsonLines::new(Vec::new());
        let overlay = Overlay::new(output.clone(), &Config::default(), Handle::current());
        (overlay, output)
    }

    #[tokio::test(start_paused = true)]
    async fn skips_blank_and_malformed_lines() {
        let (overlay, output) = overlay();
        let feed = concat!(
            "\n",
            "{\"type\":\"hover\",\"hovered\":true}\n",
            "not json\n",
            "   \n",
            "{\"type\":\"unknown\"}\n",
            "{\"type\":\"pause\",\"paused\":true}\n",
        );

        let handled = FeedManager::read_lines(Cursor::new(feed), &overlay);
        assert_eq!(handled, 2);
        assert!(overlay.controller().is_hovered());
        assert!(overlay.controller().is_paused());

        let written = output.with_writer(|buf| String::from_utf8_lossy(buf).to_string());
        let messages: Vec<OutputMessage> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(messages, vec![OutputMessage::Visibility { visible: true }]);
    }

    #[tokio::test(start_paused = true)]
    async fn handles_full_playback_stream() {
        let (overlay, _output) = overlay();
        let feed = concat!(
            "{\"type\":\"now_playing\",\"progress_ms\":0,\"is_playing\":true,",
            "\"item\":{\"name\":\"Cybele's Reverie\",\"duration_ms\":240000,",
            "\"artists\":[{\"name\":\"Stereolab\"}],\"album\":{\"name\":\"Emperor Tomato Ketchup\",\"images\":[]}}}\n",
            "{\"type\":\"track_tick\",\"progress_ms\":1000,\"is_playing\":true}\n",
            "{\"type\":\"not_playing\"}\n",
        );

        assert_eq!(FeedManager::read_lines(Cursor::new(feed), &overlay), 3);
        assert!(overlay.controller().is_visible());
        assert!(overlay.controller().has_pending_hide());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_terminates_running_producer() {
        let (overlay, _output) = overlay();
        let feed = FeedManager::new();
        let command = vec!["sleep".to_string(), "30".to_string()];

        let reader = feed.spawn(&command, overlay).unwrap();
        assert!(feed.is_running());

        feed.stop().unwrap();
        assert!(!feed.is_running());

        // stdout closes once the producer is gone
        reader.join().unwrap();
    }

    #[test]
    fn stopping_without_producer_is_a_no_op() {
        let feed = FeedManager::new();
        assert!(!feed.is_running());
        assert!(feed.stop().is_ok());
    }
}
