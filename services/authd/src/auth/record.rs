//! 身份记录结构。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 持久化身份记录；创建后不再修改。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IdentityRecord {
    pub(crate) id: String,
    pub(crate) name: String,
    /// 已归一化的身份键。
    pub(crate) email: String,
    /// bcrypt 哈希（内含随机盐）。
    pub(crate) password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) created_at: Option<String>,
}

impl fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// 生成身份 ID（随机，与时钟无关）。
pub(crate) fn new_identity_id() -> String {
    format!("usr_{}", Uuid::new_v4().simple())
}
