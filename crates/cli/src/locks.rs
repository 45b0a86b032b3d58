//! Lock file management for daemon exclusivity
//!
//! One daemon per watched directory: the lock lives at `<dir>/.lull.lock`
//! and records the owner's PID so `lull stop` and `lull status` can find it.

use anyhow::{Context, Result};
use lull_core::LOCK_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Daemon lock file structure
pub struct DaemonLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockContent {
    pub pid: u32,
    pub started_at: u64,
}

impl DaemonLock {
    /// Acquire exclusive daemon lock for `dir`
    ///
    /// Returns error if:
    /// - Lock is already held by a running process
    /// - Permission denied
    pub fn acquire(dir: &Path) -> Result<Self> {
        let lock_path = dir.join(LOCK_FILE_NAME);

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        // Try to acquire exclusive lock (non-blocking)
        if !try_flock_exclusive(&file)? {
            if Self::is_stale_lock(&mut file)? {
                tracing::warn!("Removing stale daemon lock");
                drop(file);
                std::fs::remove_file(&lock_path)?;
                return Self::acquire(dir);
            } else {
                anyhow::bail!(
                    "Daemon already running for {} (lock file held by active process)",
                    dir.display()
                );
            }
        }

        Self::write_lock_content(&mut file)?;

        Ok(Self {
            path: lock_path,
            file,
        })
    }

    /// Read the lock owner for `dir`, if a live daemon holds it
    pub fn owner(dir: &Path) -> Result<Option<LockContent>> {
        let lock_path = dir.join(LOCK_FILE_NAME);
        let mut file = match File::open(&lock_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", lock_path.display()))
            }
        };

        match Self::read_lock_content(&mut file) {
            Ok(content) if is_process_alive(content.pid) => Ok(Some(content)),
            _ => Ok(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the daemon lock
    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }

    /// Check if lock file represents a stale lock
    fn is_stale_lock(file: &mut File) -> Result<bool> {
        match Self::read_lock_content(file) {
            Ok(content) => Ok(!is_process_alive(content.pid)),
            Err(_) => Ok(true),
        }
    }

    /// Write lock content (PID + timestamp)
    fn write_lock_content(file: &mut File) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            started_at: current_timestamp_ms(),
        };

        let serialized =
            serde_json::to_string(&content).context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let content: LockContent =
            serde_json::from_str(&contents).context("Failed to deserialize lock content")?;
        Ok(content)
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to acquire exclusive file lock (non-blocking)
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Check if process is alive
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal: existence check only
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_acquisition() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        // First lock should succeed
        let lock1 = DaemonLock::acquire(dir);
        assert!(lock1.is_ok());

        // Second lock should fail (same process, but lock is held)
        let lock2 = DaemonLock::acquire(dir);
        assert!(lock2.is_err());

        drop(lock1);

        let lock3 = DaemonLock::acquire(dir);
        assert!(lock3.is_ok());
    }

    #[test]
    fn test_lock_release() {
        let temp_dir = TempDir::new().unwrap();

        let lock = DaemonLock::acquire(temp_dir.path()).unwrap();
        let lock_path = lock.path().to_path_buf();
        assert!(lock_path.ends_with(LOCK_FILE_NAME));
        assert!(lock_path.exists());

        lock.release().unwrap();
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_owner_reports_live_daemon() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(DaemonLock::owner(temp_dir.path()).unwrap(), None);

        let lock = DaemonLock::acquire(temp_dir.path()).unwrap();
        let owner = DaemonLock::owner(temp_dir.path()).unwrap().unwrap();
        assert_eq!(owner.pid, std::process::id());
        assert!(owner.started_at > 0);

        drop(lock);
        assert_eq!(DaemonLock::owner(temp_dir.path()).unwrap(), None);
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let stale = LockContent {
            pid: 999_999,
            started_at: 1,
        };
        std::fs::write(
            temp_dir.path().join(LOCK_FILE_NAME),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        // Nobody holds the flock, so it is simply taken over
        assert_eq!(DaemonLock::owner(temp_dir.path()).unwrap(), None);
        let lock = DaemonLock::acquire(temp_dir.path()).unwrap();
        let owner = DaemonLock::owner(temp_dir.path()).unwrap().unwrap();
        assert_eq!(owner.pid, std::process::id());
        drop(lock);
    }

    #[test]
    fn test_process_alive() {
        assert!(is_process_alive(std::process::id()));
        assert!(!is_process_alive(999_999));
    }
}
