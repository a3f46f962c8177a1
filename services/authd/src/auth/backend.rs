//! 身份记录持久化介质：抽象接口与 JSON 文件实现。

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::auth::{error::CredentialError, record::IdentityRecord};

/// 存储文件结构版本。
const STORE_FILE_VERSION: u8 = 1;

/// 记录持久化介质。`persist` 必须整体替换快照，不能留下写了一半的文件。
pub(crate) trait RecordBackend: Send + Sync {
    /// 加载全部身份记录。
    fn load(&self) -> Result<Vec<IdentityRecord>, CredentialError>;

    /// 以完整快照覆盖持久化内容。
    fn persist(&self, records: &[IdentityRecord]) -> Result<(), CredentialError>;

    /// 介质描述，用于日志。
    fn describe(&self) -> String;
}

/// 存储文件结构。
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default = "default_store_version")]
    version: u8,
    #[serde(default)]
    users: Vec<IdentityRecord>,
}

fn default_store_version() -> u8 {
    STORE_FILE_VERSION
}

/// JSON 文件介质：写临时文件并 fsync，rename 覆盖后再 fsync 所在目录。
#[derive(Debug, Clone)]
pub(crate) struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// 临时文件路径（与目标同目录，保证 rename 原子）。
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|value| value.to_os_string())
            .unwrap_or_else(|| "users.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RecordBackend for JsonFileBackend {
    fn load(&self) -> Result<Vec<IdentityRecord>, CredentialError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read(&self.path).map_err(|err| {
            CredentialError::StoreUnavailable(format!("read credential store failed: {err}"))
        })?;
        let parsed: StoreFile = serde_json::from_slice(&raw).map_err(|err| {
            CredentialError::StoreUnavailable(format!("decode credential store failed: {err}"))
        })?;
        if parsed.version > STORE_FILE_VERSION {
            return Err(CredentialError::StoreUnavailable(format!(
                "unsupported credential store version: {}",
                parsed.version
            )));
        }
        Ok(parsed.users)
    }

    fn persist(&self, records: &[IdentityRecord]) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                CredentialError::StoreUnavailable(format!(
                    "create credential store dir failed: {err}"
                ))
            })?;
        }
        let encoded = serde_json::to_vec_pretty(&StoreFile {
            version: STORE_FILE_VERSION,
            users: records.to_vec(),
        })
        .map_err(|err| {
            CredentialError::StoreUnavailable(format!("encode credential store failed: {err}"))
        })?;

        let staging = self.staging_path();
        if let Err(err) = write_synced(&staging, &encoded) {
            let _ = fs::remove_file(&staging);
            return Err(CredentialError::StoreUnavailable(format!(
                "write credential store failed: {err}"
            )));
        }
        fs::rename(&staging, &self.path).map_err(|err| {
            let _ = fs::remove_file(&staging);
            CredentialError::StoreUnavailable(format!("replace credential store failed: {err}"))
        })?;
        sync_parent_dir(&self.path).map_err(|err| {
            CredentialError::StoreUnavailable(format!("sync credential store dir failed: {err}"))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// 写入文件并在返回前落到磁盘，保证 rename 之后看到的是完整内容。
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// rename 只有在目录项落盘后才持久；非 unix 平台无法打开目录，跳过。
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// 内存介质：测试用，可切换为写失败模式。
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryBackend {
    records: std::sync::Mutex<Vec<IdentityRecord>>,
    fail_writes: std::sync::atomic::AtomicBool,
    writes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryBackend {
    pub(crate) fn with_records(records: Vec<IdentityRecord>) -> Self {
        Self {
            records: std::sync::Mutex::new(records),
            ..Self::default()
        }
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> Vec<IdentityRecord> {
        self.records.lock().expect("memory backend lock").clone()
    }
}

#[cfg(test)]
impl RecordBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<IdentityRecord>, CredentialError> {
        Ok(self.snapshot())
    }

    fn persist(&self, records: &[IdentityRecord]) -> Result<(), CredentialError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CredentialError::StoreUnavailable(
                "memory backend write disabled".to_string(),
            ));
        }
        *self.records.lock().expect("memory backend lock") = records.to_vec();
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
