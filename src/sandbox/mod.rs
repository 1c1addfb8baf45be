//! Sandbox Executor: spawns a validated artifact in an isolated
//! runner, enforces the isolation contract via the invocation's argument
//! list, and returns a structured `ExecutionResult`. The
//! provision/inject/monitor/teardown lifecycle uses typed state errors
//! throughout.

mod error;
mod registry;

pub use error::{SandboxError, SandboxResult};
pub use registry::{SandboxHandle, SandboxRegistry};

use crate::model::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The isolation contract's tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub enabled: bool,
    pub image_digest: String,
    pub cpu_quota: f64,
    pub memory_bytes: u64,
    pub timeout_s: u64,
    pub pid_limit: u32,
    pub seccomp_profile_path: Option<PathBuf>,
    pub runner_path: PathBuf,
    pub scratch_root: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            image_digest: String::new(),
            cpu_quota: 0.5,
            memory_bytes: 2 * 1024 * 1024 * 1024,
            timeout_s: 600,
            pid_limit: 90,
            seccomp_profile_path: None,
            runner_path: PathBuf::from("sandbox-runner"),
            scratch_root: std::env::temp_dir().join("strataloop-sandboxes"),
        }
    }
}

/// Outcome of a single sandbox call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_success: bool,
    pub stdout: String,
    pub stderr: String,
    pub report_blob: Option<Vec<u8>>,
    pub error_kind: Option<ErrorKind>,
    pub wall_ms: u64,
    pub peak_memory_bytes: u64,
}

impl ExecutionResult {
    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            execution_success: false,
            stdout: String::new(),
            stderr: message.into(),
            report_blob: None,
            error_kind: Some(ErrorKind::SandboxUnavailable),
            wall_ms: 0,
            peak_memory_bytes: 0,
        }
    }

    fn timed_out(wall_ms: u64) -> Self {
        Self {
            execution_success: false,
            stdout: String::new(),
            stderr: "sandbox exceeded wall-clock timeout".to_string(),
            report_blob: None,
            error_kind: Some(ErrorKind::Timeout),
            wall_ms,
            peak_memory_bytes: 0,
        }
    }
}

/// The sandbox's fixed path for the structured report, written inside
/// the scratch area.
const REPORT_FILE_NAME: &str = "report.json";

/// Executes validated artifacts in isolation.
///
/// No automatic fallback to an unsandboxed path exists): when
/// `config.enabled` is false or provisioning fails, the result carries
/// `error_kind = SANDBOX_UNAVAILABLE` rather than running the artifact
/// in-process.
pub struct SandboxExecutor {
    config: SandboxConfig,
    registry: SandboxRegistry,
}

impl SandboxExecutor {
    pub fn new(config: SandboxConfig, registry: SandboxRegistry) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &SandboxRegistry {
        &self.registry
    }

    /// Remove scratch directories left behind by a previous crash; run
    /// once at startup before any iteration begins.
    pub fn cleanup_sweep(&self) -> SandboxResult<usize> {
        if !self.config.scratch_root.exists() {
            return Ok(0);
        }
        let entries = std::fs::read_dir(&self.config.scratch_root)
            .map_err(|source| SandboxError::Cleanup { path: self.config.scratch_root.clone(), source })?;

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if std::fs::remove_dir_all(&path).is_ok() {
                    removed += 1;
                } else {
                    warn!(path = %path.display(), "failed to remove orphaned sandbox scratch dir");
                }
            }
        }
        if removed > 0 {
            info!(removed, "swept orphaned sandbox scratch dirs at startup");
        }
        Ok(removed)
    }

    /// Provision, inject, run, collect, and unconditionally tear down one
    /// sandbox for `artifact_text`.
    pub fn execute(&self, artifact_text: &str) -> ExecutionResult {
        if !self.config.enabled {
            return ExecutionResult::unavailable("sandbox disabled by configuration");
        }

        let id = Uuid::new_v4().to_string();
        let scratch_dir = self.config.scratch_root.join(&id);

        if let Err(e) = std::fs::create_dir_all(&scratch_dir) {
            warn!(sandbox_id = %id, error = %e, "sandbox provisioning failed");
            return ExecutionResult::unavailable(format!("provisioning failed: {e}"));
        }

        let artifact_path = scratch_dir.join("artifact.py");
        let report_path = scratch_dir.join(REPORT_FILE_NAME);
        if let Err(e) = std::fs::write(&artifact_path, artifact_text) {
            let _ = std::fs::remove_dir_all(&scratch_dir);
            return ExecutionResult::unavailable(format!("failed to inject artifact: {e}"));
        }

        let handle = SandboxHandle { id: id.clone(), pid: None, started_at: Instant::now(), scratch_dir: scratch_dir.clone() };
        self.registry.insert(handle);

        let result = self.run_with_timeout(&id, &artifact_path, &report_path);

        // Teardown unconditionally, even on panic-free error paths.
        self.registry.remove(&id);
        if let Err(e) = std::fs::remove_dir_all(&scratch_dir) {
            debug!(sandbox_id = %id, error = %e, "scratch dir already gone at teardown");
        }

        result
    }

    fn run_with_timeout(
        &self,
        sandbox_id: &str,
        artifact_path: &std::path::Path,
        report_path: &std::path::Path,
    ) -> ExecutionResult {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_s);

        let spawned = Command::new(&self.config.runner_path)
            .arg("--cpu-quota").arg(self.config.cpu_quota.to_string())
            .arg("--memory-bytes").arg(self.config.memory_bytes.to_string())
            .arg("--pid-limit").arg(self.config.pid_limit.to_string())
            .arg("--image-digest").arg(&self.config.image_digest)
            .arg("--read-only-root")
            .arg("--network").arg("none")
            .arg("--drop-all-capabilities")
            .arg("--non-root")
            .arg("--artifact").arg(artifact_path)
            .arg("--report-out").arg(report_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => {
                warn!(sandbox_id, error = %e, "failed to spawn sandbox runner");
                return ExecutionResult::unavailable(format!("spawn failed: {e}"));
            }
        };

        let pid = child.id();
        if let Some(mut handle) = self.registry.remove(sandbox_id) {
            handle.pid = Some(pid);
            self.registry.insert(handle);
        }

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let wall_ms = start.elapsed().as_millis() as u64;
                    return self.collect(status.success(), report_path, wall_ms, &mut child);
                }
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return ExecutionResult::timed_out(start.elapsed().as_millis() as u64);
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!(sandbox_id, error = %e, "failed to poll sandbox runner");
                    return ExecutionResult::unavailable(format!("wait failed: {e}"));
                }
            }
        }
    }

    fn collect(
        &self,
        succeeded: bool,
        report_path: &std::path::Path,
        wall_ms: u64,
        child: &mut std::process::Child,
    ) -> ExecutionResult {
        let mut stdout = String::new();
        let mut stderr = String::new();
        if let Some(mut out) = child.stdout.take() {
            use std::io::Read;
            let _ = out.read_to_string(&mut stdout);
        }
        if let Some(mut err) = child.stderr.take() {
            use std::io::Read;
            let _ = err.read_to_string(&mut stderr);
        }

        let report_blob = std::fs::read(report_path).ok();

        ExecutionResult {
            execution_success: succeeded && report_blob.is_some(),
            stdout,
            stderr,
            report_blob,
            error_kind: if succeeded { None } else { Some(ErrorKind::SandboxUnavailable) },
            wall_ms,
            peak_memory_bytes: 0,
        }
    }
}
