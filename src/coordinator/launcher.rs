//! Remote instance launcher
//!
//! Provisioning a node on a remote host is an external capability: given a
//! target host, it either returns the port of a freshly running node or
//! fails. The trait keeps the coordinator decoupled from the mechanism; the
//! production implementation renders a configurable command template (by
//! default an `ssh ... docker run` invocation) and executes it through the
//! local shell.

use async_trait::async_trait;
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;

/// Default launch command; `{host}` and `{port}` are substituted per launch
pub const DEFAULT_LAUNCH_COMMAND: &str = "ssh {host} docker run -d -p {port}:3000 chronod-node";

// ============================================================================
// Launch Errors
// ============================================================================

/// Instance launcher errors
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Could not reach the launch host or spawn the command at all
    #[error("connection to launch host failed: {0}")]
    ConnectionFailure(String),

    /// The launch command ran but exited unsuccessfully
    #[error("launch command exited with status {status}: {stderr}")]
    CommandFailure { status: i32, stderr: String },

    /// Every port in the configured range is already assigned
    #[error("no free port available in {0}..={1}")]
    NoPortAvailable(u16, u16),
}

// ============================================================================
// Instance Launcher
// ============================================================================

/// Opaque capability that starts a node process on a remote host
#[async_trait]
pub trait InstanceLauncher: Send + Sync {
    /// Launch a node on `host`, returning the port it was bound to
    async fn launch(&self, host: &str) -> Result<u16, LaunchError>;
}

// ============================================================================
// Command Launcher
// ============================================================================

/// Launcher that shells out to a rendered command template
///
/// Ports are drawn at random from the configured range; a port is marked used
/// only after the command succeeds, so a failed launch does not leak it.
pub struct CommandLauncher {
    command_template: String,
    port_min: u16,
    port_max: u16,
    used_ports: Mutex<HashSet<u16>>,
}

impl CommandLauncher {
    /// Create a launcher for the given template and inclusive port range
    pub fn new(command_template: impl Into<String>, port_min: u16, port_max: u16) -> Self {
        Self {
            command_template: command_template.into(),
            port_min,
            port_max,
            used_ports: Mutex::new(HashSet::new()),
        }
    }

    /// Substitute `{host}` and `{port}` into the template
    fn render(&self, host: &str, port: u16) -> String {
        self.command_template
            .replace("{host}", host)
            .replace("{port}", &port.to_string())
    }

    /// Pick a random port from the range that is not yet assigned
    fn pick_port(&self, used: &HashSet<u16>) -> Result<u16, LaunchError> {
        let span = (self.port_max - self.port_min) as usize + 1;
        if used.len() >= span {
            return Err(LaunchError::NoPortAvailable(self.port_min, self.port_max));
        }

        let mut rng = rand::thread_rng();
        loop {
            let port = rng.gen_range(self.port_min..=self.port_max);
            if !used.contains(&port) {
                return Ok(port);
            }
        }
    }
}

#[async_trait]
impl InstanceLauncher for CommandLauncher {
    async fn launch(&self, host: &str) -> Result<u16, LaunchError> {
        let mut used = self.used_ports.lock().await;
        let port = self.pick_port(&used)?;
        let command = self.render(host, port);

        tracing::info!(host = %host, port = %port, "Running launch command: {command}");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .await
            .map_err(|e| LaunchError::ConnectionFailure(e.to_string()))?;

        if !output.status.success() {
            return Err(LaunchError::CommandFailure {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        used.insert(port);
        Ok(port)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_host_and_port() {
        let launcher = CommandLauncher::new("ssh {host} run -p {port}:3000 img", 5000, 6000);
        assert_eq!(launcher.render("10.0.0.2", 5123), "ssh 10.0.0.2 run -p 5123:3000 img");
    }

    #[tokio::test]
    async fn test_successful_launch_assigns_port_in_range() {
        let launcher = CommandLauncher::new("exit 0 # {host} {port}", 5000, 5010);

        let port = launcher.launch("somehost").await.unwrap();
        assert!((5000..=5010).contains(&port));
    }

    #[tokio::test]
    async fn test_launched_ports_are_not_reused() {
        let launcher = CommandLauncher::new("exit 0 # {host} {port}", 5000, 5001);

        let first = launcher.launch("h").await.unwrap();
        let second = launcher.launch("h").await.unwrap();
        assert_ne!(first, second);

        let result = launcher.launch("h").await;
        assert!(matches!(result, Err(LaunchError::NoPortAvailable(5000, 5001))));
    }

    #[tokio::test]
    async fn test_failing_command_reports_status_and_keeps_port_free() {
        let launcher = CommandLauncher::new("echo boom >&2; exit 3 # {host} {port}", 5000, 5000);

        match launcher.launch("h").await {
            Err(LaunchError::CommandFailure { status, stderr }) => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected CommandFailure, got {other:?}"),
        }

        // The failed launch must not consume the only port; a retry fails on
        // the command again, not on port exhaustion
        let retry = launcher.launch("h").await;
        assert!(matches!(retry, Err(LaunchError::CommandFailure { .. })));
    }
}
