//! HTTP 接口层
//!
//! - `services`: 路由和处理函数
//! - `middleware`: 请求 ID 与请求耗时

pub mod middleware;
pub mod services;
