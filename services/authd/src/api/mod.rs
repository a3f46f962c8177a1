//! HTTP 边界：错误映射与响应构造。

pub(crate) mod error;
pub(crate) mod response;
