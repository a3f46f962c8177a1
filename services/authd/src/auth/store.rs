//! 凭证存储：身份键唯一、注册原子、密码只存哈希。

use std::{collections::HashMap, sync::Arc};

use tg_shared_protocol::{normalize_identity_key, now_rfc3339_nanos};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::auth::{
    backend::RecordBackend,
    error::CredentialError,
    password::{hash_secret, verify_secret},
    record::{IdentityRecord, new_identity_id},
};

/// 未命中身份时用于对齐耗时的占位密码。
const TIMING_DUMMY_SECRET: &str = "tokengate-timing-dummy";

/// 凭证存储。内存索引按归一化身份键组织，写锁覆盖“检查-落盘-插入”全过程。
pub(crate) struct CredentialStore {
    records: RwLock<HashMap<String, IdentityRecord>>,
    backend: Arc<dyn RecordBackend>,
    hash_cost: u32,
    /// 与真实记录同成本的占位哈希。
    dummy_hash: String,
}

impl CredentialStore {
    /// 从持久化介质加载记录并构建索引。
    pub(crate) async fn open(
        backend: Arc<dyn RecordBackend>,
        hash_cost: u32,
    ) -> Result<Self, CredentialError> {
        let loaded = backend.load()?;
        let mut records = HashMap::with_capacity(loaded.len());
        for record in loaded {
            let key = normalize_identity_key(&record.email);
            if records.contains_key(&key) {
                warn!(
                    "skip duplicate identity record {} in {}",
                    record.id,
                    backend.describe()
                );
                continue;
            }
            records.insert(key, record);
        }
        let dummy_hash = hash_secret(TIMING_DUMMY_SECRET, hash_cost).await?;
        Ok(Self {
            records: RwLock::new(records),
            backend,
            hash_cost,
            dummy_hash,
        })
    }

    /// 注册新身份；身份键已存在时返回 `DuplicateIdentity`。
    ///
    /// bcrypt 在锁外计算，写锁内重新检查唯一性后再落盘，落盘成功才写入内存索引。
    /// 落盘在阻塞线程池执行，期间写锁保持持有。
    pub(crate) async fn register(
        &self,
        identity_key: &str,
        display_name: &str,
        secret: &str,
    ) -> Result<IdentityRecord, CredentialError> {
        let key = normalize_identity_key(identity_key);
        if self.records.read().await.contains_key(&key) {
            return Err(CredentialError::DuplicateIdentity);
        }

        let password_hash = hash_secret(secret, self.hash_cost).await?;
        let record = IdentityRecord {
            id: new_identity_id(),
            name: display_name.trim().to_string(),
            email: key.clone(),
            password_hash,
            created_at: Some(now_rfc3339_nanos()),
        };

        let mut guard = self.records.write().await;
        if guard.contains_key(&key) {
            return Err(CredentialError::DuplicateIdentity);
        }
        let mut snapshot = guard.values().cloned().collect::<Vec<_>>();
        snapshot.push(record.clone());
        snapshot.sort_by(|a, b| a.email.cmp(&b.email));
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.persist(&snapshot))
            .await
            .map_err(|err| {
                CredentialError::StoreUnavailable(format!("persist task failed: {err}"))
            })??;
        guard.insert(key, record.clone());
        debug!("identity {} persisted to {}", record.id, self.backend.describe());
        Ok(record)
    }

    /// 校验身份键与密码。未命中时仍执行一次等成本校验，避免耗时差异暴露身份是否存在。
    pub(crate) async fn authenticate(
        &self,
        identity_key: &str,
        secret: &str,
    ) -> Result<IdentityRecord, CredentialError> {
        let key = normalize_identity_key(identity_key);
        let record = self.records.read().await.get(&key).cloned();
        let Some(record) = record else {
            let _ = verify_secret(secret, &self.dummy_hash).await;
            return Err(CredentialError::NotFound);
        };

        if verify_secret(secret, &record.password_hash).await? {
            Ok(record)
        } else {
            Err(CredentialError::InvalidCredential)
        }
    }

    /// 当前身份记录数量。
    pub(crate) async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::CredentialStore;
    use crate::auth::{
        backend::MemoryBackend,
        error::CredentialError,
        password::{MAX_SECRET_BYTES, MIN_BCRYPT_COST},
        record::IdentityRecord,
    };

    async fn open_store(backend: Arc<MemoryBackend>) -> CredentialStore {
        CredentialStore::open(backend, MIN_BCRYPT_COST)
            .await
            .expect("open store")
    }

    #[tokio::test]
    async fn register_then_authenticate_with_same_secret() {
        let backend = Arc::new(MemoryBackend::default());
        let store = open_store(backend.clone()).await;

        let created = store
            .register("a@x.com", "Alice", "pw1")
            .await
            .expect("register");
        assert!(created.id.starts_with("usr_"));
        assert_eq!(created.name, "Alice");
        assert_ne!(created.password_hash, "pw1");
        assert!(created.password_hash.starts_with("$2"));

        let found = store.authenticate("a@x.com", "pw1").await.expect("login");
        assert_eq!(found.id, created.id);
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_identity_key_is_rejected() {
        let backend = Arc::new(MemoryBackend::default());
        let store = open_store(backend.clone()).await;
        store
            .register("a@x.com", "Alice", "pw1")
            .await
            .expect("register");

        let err = store
            .register("A@X.com ", "Other", "pw2")
            .await
            .expect_err("duplicate");
        assert!(matches!(err, CredentialError::DuplicateIdentity));
        assert_eq!(backend.write_count(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn wrong_secret_and_unknown_key_are_distinguished_internally() {
        let store = open_store(Arc::new(MemoryBackend::default())).await;
        store
            .register("a@x.com", "Alice", "pw1")
            .await
            .expect("register");

        let wrong = store
            .authenticate("a@x.com", "wrong")
            .await
            .expect_err("wrong secret");
        assert!(matches!(wrong, CredentialError::InvalidCredential));

        let missing = store
            .authenticate("nobody@x.com", "pw1")
            .await
            .expect_err("unknown key");
        assert!(matches!(missing, CredentialError::NotFound));
    }

    #[tokio::test]
    async fn authenticate_never_writes() {
        let backend = Arc::new(MemoryBackend::default());
        let store = open_store(backend.clone()).await;
        store
            .register("a@x.com", "Alice", "pw1")
            .await
            .expect("register");
        let _ = store.authenticate("a@x.com", "pw1").await;
        let _ = store.authenticate("a@x.com", "nope").await;
        let _ = store.authenticate("b@x.com", "pw1").await;
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn secrets_differing_past_the_bcrypt_limit_do_not_authenticate() {
        let backend = Arc::new(MemoryBackend::default());
        let store = open_store(backend.clone()).await;
        let prefix = "A".repeat(MAX_SECRET_BYTES);
        let err = store
            .register("p@x.com", "P", &format!("{prefix}xx"))
            .await
            .expect_err("two bytes over");
        assert!(matches!(err, CredentialError::SecretTooLong(_)));

        let err = store
            .register("p@x.com", "P", &format!("{prefix}x"))
            .await
            .expect_err("over-long secret");
        assert!(matches!(err, CredentialError::SecretTooLong(_)));
        assert_eq!(backend.write_count(), 0);
        assert_eq!(store.len().await, 0);

        store
            .register("p@x.com", "P", &prefix)
            .await
            .expect("longest allowed secret");
        for attempt in [format!("{prefix}x"), format!("{prefix}y")] {
            let err = store
                .authenticate("p@x.com", &attempt)
                .await
                .expect_err("longer secret");
            assert!(matches!(err, CredentialError::InvalidCredential));
        }
        store.authenticate("p@x.com", &prefix).await.expect("login");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_admit_exactly_one() {
        let backend = Arc::new(MemoryBackend::default());
        let store = Arc::new(open_store(backend.clone()).await);

        let mut tasks = Vec::new();
        for idx in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .register("race@x.com", &format!("racer {idx}"), "pw")
                    .await
            }));
        }

        let mut succeeded = 0;
        for task in tasks {
            match task.await.expect("join") {
                Ok(_) => succeeded += 1,
                Err(CredentialError::DuplicateIdentity) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(succeeded, 1);
        assert_eq!(backend.write_count(), 1);
        assert_eq!(backend.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn failed_persist_surfaces_unavailable_and_keeps_store_unchanged() {
        let backend = Arc::new(MemoryBackend::default());
        let store = open_store(backend.clone()).await;
        backend.set_fail_writes(true);

        let err = store
            .register("a@x.com", "Alice", "pw1")
            .await
            .expect_err("store down");
        assert!(matches!(err, CredentialError::StoreUnavailable(_)));
        assert_eq!(store.len().await, 0);

        backend.set_fail_writes(false);
        store
            .register("a@x.com", "Alice", "pw1")
            .await
            .expect("retry after recovery");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn open_loads_existing_records_and_skips_duplicates() {
        let hash = crate::auth::password::hash_secret("pw1", MIN_BCRYPT_COST)
            .await
            .expect("hash");
        let existing = |id: &str, email: &str| IdentityRecord {
            id: id.to_string(),
            name: "Existing".to_string(),
            email: email.to_string(),
            password_hash: hash.clone(),
            created_at: None,
        };
        let backend = Arc::new(MemoryBackend::with_records(vec![
            existing("usr_1", "a@x.com"),
            existing("usr_2", "A@x.com"),
        ]));
        let store = open_store(backend).await;

        assert_eq!(store.len().await, 1);
        let found = store.authenticate("a@x.com", "pw1").await.expect("login");
        assert_eq!(found.id, "usr_1");
    }
}
