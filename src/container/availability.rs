//! Container runtime availability check.
//!
//! Distinguishes a missing runtime binary from an installed runtime whose
//! daemon is not responding, and renders remediation instructions.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Outcome of an availability check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct AvailabilityReport {
    pub installed: bool,
    pub running: bool,
    pub version: Option<String>,
    /// Installed and running
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Host operating system family, for installation instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name (`macos`/`darwin`, `linux`, `windows`/`win32`)
    pub fn from_os(os: &str) -> Self {
        match os.to_lowercase().as_str() {
            "macos" | "darwin" => Platform::MacOs,
            "linux" => Platform::Linux,
            "windows" | "win32" => Platform::Windows,
            _ => Platform::Other,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOs => write!(f, "macos"),
            Platform::Linux => write!(f, "linux"),
            Platform::Windows => write!(f, "windows"),
            Platform::Other => write!(f, "other"),
        }
    }
}

/// Remediation steps for installing the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallInstructions {
    pub title: String,
    pub steps: Vec<String>,
    pub url: String,
}

/// Installation instructions for a platform; unknown platforms get the Linux steps
pub fn get_install_instructions(platform: Platform) -> InstallInstructions {
    let (title, steps, url): (&str, &[&str], &str) = match platform {
        Platform::MacOs => (
            "Install Docker Desktop for Mac",
            &[
                "Download Docker Desktop from https://www.docker.com/products/docker-desktop",
                "Install the .dmg file",
                "Launch Docker Desktop",
                "Wait for Docker to start (whale icon in menu bar)",
                "Run this command again",
            ],
            "https://docs.docker.com/desktop/install/mac-install/",
        ),
        Platform::Windows => (
            "Install Docker Desktop for Windows",
            &[
                "Download Docker Desktop from https://www.docker.com/products/docker-desktop",
                "Run the installer",
                "Restart your computer if prompted",
                "Launch Docker Desktop",
                "Wait for Docker to start",
                "Run this command again",
            ],
            "https://docs.docker.com/desktop/install/windows-install/",
        ),
        Platform::Linux | Platform::Other => (
            "Install Docker on Linux",
            &[
                "Update package index: sudo apt-get update",
                "Install Docker: sudo apt-get install docker-ce docker-ce-cli containerd.io",
                "Start Docker: sudo systemctl start docker",
                "Enable on boot: sudo systemctl enable docker",
                "Run this command again",
            ],
            "https://docs.docker.com/engine/install/",
        ),
    };
    InstallInstructions {
        title: title.to_string(),
        steps: steps.iter().map(|s| s.to_string()).collect(),
        url: url.to_string(),
    }
}

/// Markdown block explaining why containerized testing is unavailable
pub fn format_error_message(report: &AvailabilityReport, platform: Platform) -> String {
    let mut message = String::from("## Containerized Testing Unavailable\n\n");

    if !report.installed {
        let instructions = get_install_instructions(platform);
        message.push_str("**Issue:** Docker is not installed on your system.\n\n");
        message.push_str(&format!("**{}:**\n", instructions.title));
        for (i, step) in instructions.steps.iter().enumerate() {
            message.push_str(&format!("{}. {}\n", i + 1, step));
        }
        message.push_str(&format!("\n**Documentation:** {}\n\n", instructions.url));
    } else if !report.running {
        message.push_str("**Issue:** Docker is installed but not running.\n\n");
        message.push_str("**Quick Fix:**\n");
        message.push_str("1. Launch Docker Desktop or start the Docker service\n");
        message.push_str("2. Wait for Docker to start\n");
        message.push_str("3. Run this command again\n\n");
    }

    message.push_str(
        "**Note:** Containerized testing will be skipped. Regular tests will continue.\n",
    );
    message
}

/// Checks that a container runtime CLI is installed and its daemon responds
#[derive(Debug, Clone)]
pub struct AvailabilityChecker {
    binary: String,
    timeout: Duration,
}

impl Default for AvailabilityChecker {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl AvailabilityChecker {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Bound for each check command
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run `<binary> --version`, then `<binary> ps`
    pub async fn check_availability(&self) -> AvailabilityReport {
        let version = match self.run(&["--version"]).await {
            CommandOutcome::Ok(stdout) => stdout.trim().to_string(),
            CommandOutcome::NotFound => {
                return AvailabilityReport {
                    installed: false,
                    running: false,
                    version: None,
                    ready: false,
                    error: Some("Docker is not installed".to_string()),
                }
            }
            CommandOutcome::Failed(reason) => {
                debug!(binary = %self.binary, %reason, "version query failed");
                return not_running();
            }
        };

        match self.run(&["ps"]).await {
            CommandOutcome::Ok(_) => AvailabilityReport {
                installed: true,
                running: true,
                version: Some(version),
                ready: true,
                error: None,
            },
            CommandOutcome::NotFound => not_running(),
            CommandOutcome::Failed(reason) => {
                debug!(binary = %self.binary, %reason, "daemon query failed");
                not_running()
            }
        }
    }

    /// Check availability and convert an unready runtime into an error
    /// carrying remediation text
    pub async fn require_ready(&self) -> Result<AvailabilityReport> {
        let report = self.check_availability().await;
        if report.ready {
            return Ok(report);
        }
        Err(Error::RuntimeUnavailable {
            message: report.error.clone().unwrap_or_default(),
            remediation: format_error_message(&report, Platform::current()),
        })
    }

    async fn run(&self, args: &[&str]) -> CommandOutcome {
        let child = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output();
        match tokio::time::timeout(self.timeout, child).await {
            Err(_) => CommandOutcome::Failed(format!("timed out after {:?}", self.timeout)),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => CommandOutcome::NotFound,
            Ok(Err(e)) => CommandOutcome::Failed(e.to_string()),
            Ok(Ok(output)) if output.status.code() == Some(127) => CommandOutcome::NotFound,
            Ok(Ok(output)) if !output.status.success() => {
                CommandOutcome::Failed(String::from_utf8_lossy(&output.stderr).trim().to_string())
            }
            Ok(Ok(output)) => CommandOutcome::Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        }
    }
}

enum CommandOutcome {
    Ok(String),
    NotFound,
    Failed(String),
}

fn not_running() -> AvailabilityReport {
    AvailabilityReport {
        installed: true,
        running: false,
        version: None,
        ready: false,
        error: Some("Docker daemon is not running".to_string()),
    }
}
