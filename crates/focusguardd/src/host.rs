//! Line-oriented host adapter
//!
//! Foreground changes arrive as NDJSON on stdin, one object per line:
//! `{"resource":"app.a"}`, optionally with `"at"` epoch millis, or
//! `{"home":true}`. Side effects go out as NDJSON on stdout for a platform
//! agent to carry out.

use async_trait::async_trait;
use focusguard_host_api::{HostAdapter, HostCapabilities, HostError, HostEvent, HostResult};
use focusguard_util::{Clock, ResourceId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct InputLine {
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    home: bool,
    #[serde(default)]
    at: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum OutputLine<'a> {
    ShowOverlay { message: &'a str },
    UpdateOverlay { message: &'a str },
    HideOverlay,
    GoHome,
    Terminate { resource: &'a ResourceId },
}

/// Parse one input line. Blank lines and lines without a resource yield
/// `None`; the configured home resource is reported as a home event.
pub fn parse_input_line(
    line: &str,
    now_millis: i64,
    home_resource: Option<&ResourceId>,
) -> Result<Option<HostEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let input: InputLine = serde_json::from_str(line)?;
    let at_millis = input.at.unwrap_or(now_millis);

    if input.home {
        return Ok(Some(HostEvent::Home { at_millis }));
    }

    let Some(resource) = input.resource.map(ResourceId::from) else {
        return Ok(None);
    };
    if resource.is_blank() {
        return Ok(None);
    }
    if home_resource.is_some_and(|home| *home == resource) {
        return Ok(Some(HostEvent::Home { at_millis }));
    }

    Ok(Some(HostEvent::Foreground {
        resource,
        at_millis,
    }))
}

/// Host adapter speaking NDJSON over stdio
pub struct StdioHost {
    capabilities: HostCapabilities,
    home_resource: Option<ResourceId>,
    clock: Arc<dyn Clock>,
    overlay_showing: AtomicBool,
    stdout: tokio::sync::Mutex<tokio::io::Stdout>,
    event_tx: mpsc::UnboundedSender<HostEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>,
}

impl StdioHost {
    pub fn new(home_resource: Option<ResourceId>, clock: Arc<dyn Clock>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            capabilities: HostCapabilities::full(),
            home_resource,
            clock,
            overlay_showing: AtomicBool::new(false),
            stdout: tokio::sync::Mutex::new(tokio::io::stdout()),
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
        }
    }

    /// Start reading events from stdin. Sends [`HostEvent::Closed`] at EOF.
    pub fn start_reader(&self) -> tokio::task::JoinHandle<()> {
        let event_tx = self.event_tx.clone();
        let home = self.home_resource.clone();
        let clock = self.clock.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        match parse_input_line(&line, clock.now_millis(), home.as_ref()) {
                            Ok(Some(event)) => {
                                if event_tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!(error = %e, "Ignoring malformed input line"),
                        }
                    }
                    Ok(None) => {
                        info!("Input closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read input");
                        break;
                    }
                }
            }
            let _ = event_tx.send(HostEvent::Closed);
        })
    }

    async fn emit(&self, line: OutputLine<'_>) -> HostResult<()> {
        let mut json =
            serde_json::to_string(&line).map_err(|e| HostError::Internal(e.to_string()))?;
        json.push('\n');
        debug!(output = json.trim_end(), "Host output");

        let mut stdout = self.stdout.lock().await;
        stdout.write_all(json.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl HostAdapter for StdioHost {
    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    async fn show_overlay(&self, message: &str) -> HostResult<()> {
        self.emit(OutputLine::ShowOverlay { message }).await?;
        self.overlay_showing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn update_overlay(&self, message: &str) -> HostResult<()> {
        self.emit(OutputLine::UpdateOverlay { message }).await
    }

    async fn hide_overlay(&self) -> HostResult<()> {
        self.emit(OutputLine::HideOverlay).await?;
        self.overlay_showing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_overlay_showing(&self) -> bool {
        self.overlay_showing.load(Ordering::SeqCst)
    }

    async fn go_home(&self) -> HostResult<()> {
        self.emit(OutputLine::GoHome).await
    }

    async fn terminate(&self, resource: &ResourceId) -> HostResult<()> {
        self.emit(OutputLine::Terminate { resource }).await
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<HostEvent>> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_foreground() {
        let event = parse_input_line(r#"{"resource":"app.a","at":42}"#, 7, None).unwrap();
        assert_eq!(
            event,
            Some(HostEvent::Foreground {
                resource: ResourceId::new("app.a"),
                at_millis: 42,
            })
        );

        let event = parse_input_line(r#"{"resource":"app.a"}"#, 7, None).unwrap();
        assert_eq!(event.and_then(|e| e.at_millis()), Some(7));
    }

    #[test]
    fn test_parse_home() {
        let home = ResourceId::new("launcher");
        assert_eq!(
            parse_input_line(r#"{"resource":"launcher"}"#, 1, Some(&home)).unwrap(),
            Some(HostEvent::Home { at_millis: 1 })
        );
        assert_eq!(
            parse_input_line(r#"{"home":true}"#, 1, None).unwrap(),
            Some(HostEvent::Home { at_millis: 1 })
        );
    }

    #[test]
    fn test_parse_skips_empty() {
        assert_eq!(parse_input_line("   ", 1, None).unwrap(), None);
        assert_eq!(parse_input_line("{}", 1, None).unwrap(), None);
        assert_eq!(parse_input_line(r#"{"resource":" "}"#, 1, None).unwrap(), None);
        assert!(parse_input_line("not json", 1, None).is_err());
    }

    #[test]
    fn test_output_format() {
        let resource = ResourceId::new("app.a");
        let json = serde_json::to_string(&OutputLine::Terminate { resource: &resource }).unwrap();
        assert_eq!(json, r#"{"action":"terminate","resource":"app.a"}"#);
        let json = serde_json::to_string(&OutputLine::GoHome).unwrap();
        assert_eq!(json, r#"{"action":"go_home"}"#);
    }
}
