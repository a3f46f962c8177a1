//! 鉴权模块：凭证存储、token 服务与接口处理。

pub(crate) mod backend;
pub(crate) mod error;
pub(crate) mod handlers;
pub(crate) mod middleware;
pub(crate) mod password;
pub(crate) mod record;
pub(crate) mod store;
pub(crate) mod token;
pub(crate) mod token_crypto;
