use std::{
    fs::{self, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::{SystemTime, UNIX_EPOCH},
};

use sha2::Digest as _;

use crate::foundation::error::{SynthError, SynthResult};
use crate::plan::model::Plan;
use crate::synth::attempt::AttemptLog;

/// Destination for attempt logs and accepted plans.
///
/// Implementations must be safe to share between pipeline instances running on different
/// threads; each `append_log` call writes one whole record or nothing.
pub trait PlanSink: Send + Sync {
    /// Appends one attempt-log record.
    fn append_log(&self, log: &AttemptLog) -> SynthResult<()>;
    /// Stores an accepted plan and returns where it went.
    fn save_plan(&self, plan: &Plan, request: &str) -> SynthResult<PathBuf>;
}

impl<T: PlanSink + ?Sized> PlanSink for &T {
    fn append_log(&self, log: &AttemptLog) -> SynthResult<()> {
        (**self).append_log(log)
    }

    fn save_plan(&self, plan: &Plan, request: &str) -> SynthResult<PathBuf> {
        (**self).save_plan(plan, request)
    }
}

impl<T: PlanSink + ?Sized> PlanSink for std::sync::Arc<T> {
    fn append_log(&self, log: &AttemptLog) -> SynthResult<()> {
        (**self).append_log(log)
    }

    fn save_plan(&self, plan: &Plan, request: &str) -> SynthResult<PathBuf> {
        (**self).save_plan(plan, request)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// File name for a saved plan: `plan_<12 hex>.json`, derived from request, content and time.
pub fn plan_file_name(request: &str, plan_json: &str, nanos: u128) -> String {
    let mut material = Vec::with_capacity(request.len() + plan_json.len() + 16);
    material.extend_from_slice(request.as_bytes());
    material.push(0);
    material.extend_from_slice(plan_json.as_bytes());
    material.push(0);
    material.extend_from_slice(&nanos.to_le_bytes());
    let hex = sha256_hex(&material);
    format!("plan_{}.json", &hex[..12])
}

/// JSONL attempt log plus a directory of plan files.
///
/// Appends hold an exclusive OS lock on the log file, so independent sinks (and processes)
/// pointed at the same path never interleave records.
#[derive(Debug)]
pub struct FileSink {
    log_path: PathBuf,
    plan_dir: PathBuf,
}

impl FileSink {
    pub fn new(log_path: impl Into<PathBuf>, plan_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            plan_dir: plan_dir.into(),
        }
    }

    /// Uses `<dir>/enhancer_log.jsonl` and `<dir>/plans/`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("enhancer_log.jsonl"), dir.join("plans"))
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn plan_dir(&self) -> &Path {
        &self.plan_dir
    }
}

fn ensure_parent(path: &Path) -> SynthResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            SynthError::persist(format!("create dir '{}': {e}", parent.display()))
        })?;
    }
    Ok(())
}

impl PlanSink for FileSink {
    fn append_log(&self, log: &AttemptLog) -> SynthResult<()> {
        let mut line = serde_json::to_string(log)?;
        line.push('\n');

        ensure_parent(&self.log_path)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| {
                SynthError::persist(format!("open log '{}': {e}", self.log_path.display()))
            })?;
        f.lock().map_err(|e| {
            SynthError::persist(format!("lock log '{}': {e}", self.log_path.display()))
        })?;
        let written = f.write_all(line.as_bytes()).and_then(|()| f.flush());
        let _ = f.unlock();
        written.map_err(|e| {
            SynthError::persist(format!("append log '{}': {e}", self.log_path.display()))
        })
    }

    fn save_plan(&self, plan: &Plan, request: &str) -> SynthResult<PathBuf> {
        let body = serde_json::to_string_pretty(plan)?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        fs::create_dir_all(&self.plan_dir).map_err(|e| {
            SynthError::persist(format!("create dir '{}': {e}", self.plan_dir.display()))
        })?;
        let path = self.plan_dir.join(plan_file_name(request, &body, nanos));
        fs::write(&path, body)
            .map_err(|e| SynthError::persist(format!("write '{}': {e}", path.display())))?;
        tracing::info!(path = %path.display(), "saved plan");
        Ok(path)
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    logs: Mutex<Vec<AttemptLog>>,
    plans: Mutex<Vec<(String, Plan)>>,
}

fn relock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured attempt logs, oldest first.
    pub fn logs(&self) -> Vec<AttemptLog> {
        relock(&self.logs).clone()
    }

    /// Snapshot of the saved plans with the request that produced each.
    pub fn plans(&self) -> Vec<(String, Plan)> {
        relock(&self.plans).clone()
    }
}

impl PlanSink for InMemorySink {
    fn append_log(&self, log: &AttemptLog) -> SynthResult<()> {
        relock(&self.logs).push(log.clone());
        Ok(())
    }

    fn save_plan(&self, plan: &Plan, request: &str) -> SynthResult<PathBuf> {
        let mut plans = relock(&self.plans);
        plans.push((request.to_owned(), plan.clone()));
        Ok(PathBuf::from(format!("memory://plans/{}", plans.len() - 1)))
    }
}
