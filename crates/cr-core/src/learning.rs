//! Durable Beta-Bernoulli learning state.
//!
//! The store holds the only mutable shared state of the engine: one
//! `(alpha, beta)` pair. Every feedback event is a conjugate update followed
//! by a durable commit. The on-disk record is exactly
//! `{"alpha": <f64>, "beta": <f64>}`.
//!
//! Commit protocol:
//! 1. in-process `Mutex` around the whole read-modify-write
//! 2. exclusive `flock` on `<state>.lock` for cross-process exclusion
//! 3. re-read the record from disk, falling back to the prior if absent
//! 4. serialize to `<state>.tmp`, flush, `sync_all`
//! 5. `rename` over the state file
//!
//! The advisory lock dies with its holder, so a killed writer never leaves
//! the store locked. The lock file itself is left in place.
//!
//! Memory is updated only after the rename succeeds, so a failed write
//! leaves both the file and the in-memory parameters at their previous value.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use cr_common::{Error, Result};
use cr_math::BetaParams;
use serde::Serialize;
use tracing::{debug, info, warn};

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Parameters together with the version they were read at.
///
/// The version starts at 0 when the store is opened and increases by one on
/// every committed update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamsSnapshot {
    pub version: u64,
    pub alpha: f64,
    pub beta: f64,
}

impl ParamsSnapshot {
    pub fn params(&self) -> BetaParams {
        BetaParams {
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}

#[derive(Debug)]
struct StoreState {
    params: BetaParams,
    version: u64,
}

/// File-backed learning store.
#[derive(Debug)]
pub struct LearningStore {
    path: PathBuf,
    lock_path: PathBuf,
    tmp_path: PathBuf,
    prior: BetaParams,
    state: Mutex<StoreState>,
}

impl LearningStore {
    /// Open the store at `path`, starting from `prior` if no record exists.
    ///
    /// An existing record that cannot be parsed, or whose parameters are
    /// not finite and positive, is an error rather than a silent reset.
    pub fn open(path: impl Into<PathBuf>, prior: BetaParams) -> Result<Self> {
        let path = path.into();
        if !prior.is_valid() {
            return Err(Error::InvalidModel(format!(
                "learning prior must be positive, got ({}, {})",
                prior.alpha, prior.beta
            )));
        }

        let params = read_record(&path, prior)?;

        debug!(
            path = %path.display(),
            alpha = params.alpha,
            beta = params.beta,
            "learning store opened"
        );

        Ok(Self {
            lock_path: sibling(&path, ".lock"),
            tmp_path: sibling(&path, ".tmp"),
            path,
            prior,
            state: Mutex::new(StoreState { params, version: 0 }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current parameters. No side effects.
    pub fn params(&self) -> Result<BetaParams> {
        Ok(self.lock_state()?.params)
    }

    /// Parameters and version from a single read.
    pub fn snapshot(&self) -> Result<ParamsSnapshot> {
        let state = self.lock_state()?;
        Ok(ParamsSnapshot {
            version: state.version,
            alpha: state.params.alpha,
            beta: state.params.beta,
        })
    }

    /// Apply one feedback event and commit it durably.
    ///
    /// `true` adds one to alpha, `false` adds one to beta. Not idempotent.
    /// The observation is applied to the record on disk, which may have
    /// moved since this store was opened if another process committed.
    /// Returns the new parameters only once they are on disk.
    pub fn update(&self, is_correct: bool) -> Result<BetaParams> {
        let mut state = self.lock_state()?;
        let _guard = FileLock::acquire(&self.lock_path)?;

        let current = read_record(&self.path, self.prior)?;
        if current != state.params {
            debug!(
                path = %self.path.display(),
                alpha = current.alpha,
                beta = current.beta,
                "learning record changed on disk"
            );
        }
        let next = current.observe(is_correct);

        if let Err(err) = self.write_record(&next) {
            warn!(path = %self.path.display(), error = %err, "learning update not committed");
            let _ = fs::remove_file(&self.tmp_path);
            return Err(Error::Persistence(format!(
                "failed to write {}: {}",
                self.path.display(),
                err
            )));
        }

        state.params = next;
        state.version += 1;
        info!(
            correct = is_correct,
            alpha = next.alpha,
            beta = next.beta,
            version = state.version,
            "learning update committed"
        );
        Ok(next)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| Error::Persistence("learning state mutex poisoned".to_string()))
    }

    fn write_record(&self, params: &BetaParams) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(params)?;
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.tmp_path)?;
            file.write_all(&json)?;
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&self.tmp_path, &self.path)
    }
}

fn read_record(path: &Path, prior: BetaParams) -> Result<BetaParams> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_record(path, &contents),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no learning record, using prior");
            Ok(prior)
        }
        Err(err) => Err(Error::Persistence(format!(
            "failed to read {}: {}",
            path.display(),
            err
        ))),
    }
}

fn parse_record(path: &Path, contents: &str) -> Result<BetaParams> {
    let params: BetaParams = serde_json::from_str(contents).map_err(|err| {
        Error::StateCorrupted(format!("{} is not a learning record: {}", path.display(), err))
    })?;
    if !params.is_valid() {
        return Err(Error::StateCorrupted(format!(
            "{} holds non-positive parameters ({}, {})",
            path.display(),
            params.alpha,
            params.beta
        )));
    }
    Ok(params)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Exclusive advisory lock on a lock file, released on drop.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| {
                Error::Persistence(format!("failed to open lock {}: {}", path.display(), err))
            })?;

        for _ in 0..LOCK_ATTEMPTS {
            match try_lock_exclusive(&file) {
                Ok(()) => {
                    // Holder PID, for humans inspecting the lock file.
                    let _ = file.set_len(0);
                    let mut writer = &file;
                    let _ = write!(writer, "{}", std::process::id());
                    return Ok(Self { file });
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(err) => {
                    return Err(Error::Persistence(format!(
                        "failed to lock {}: {}",
                        path.display(),
                        err
                    )))
                }
            }
        }
        Err(Error::Persistence(format!(
            "learning store is locked by another process ({})",
            path.display()
        )))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        unlock(&self.file);
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;
    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

// Elsewhere only the in-process mutex applies.
#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}
