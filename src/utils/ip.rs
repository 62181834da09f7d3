//! IP 地址处理工具
//!
//! 从代理转发头中提取原始客户端 IP：
//! - `X-Forwarded-For` 取第一个逗号分隔项
//! - 没有 `X-Forwarded-For` 时使用 `X-Real-IP`
//!
//! 不回退到连接的 peer 地址：部署在反向代理之后时 peer 总是代理本身。

use std::net::{IpAddr, SocketAddr};

use actix_web::http::header::HeaderMap;

use crate::errors::{GeoDetectError, Result};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7 (ULA)
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10 (link-local)
        }
    }
}

/// 从请求头提取转发的 IP 字符串（未校验）
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    // 优先 X-Forwarded-For（取第一个，即原始客户端 IP）
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get(X_REAL_IP)
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// 解析 IP，兼容带端口的写法（`1.2.3.4:5678`、`[2001:db8::1]:443`）
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    if let Ok(socket_addr) = raw.parse::<SocketAddr>() {
        return Some(socket_addr.ip());
    }
    raw.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
}

/// 提取客户端 IP，缺失或无法解析时返回 MissingClientAddress
pub fn extract_client_ip(headers: &HeaderMap) -> Result<IpAddr> {
    let raw = extract_forwarded_ip_from_headers(headers).ok_or_else(|| {
        GeoDetectError::missing_client_address("no X-Forwarded-For or X-Real-IP header")
    })?;

    parse_ip(&raw).ok_or_else(|| {
        GeoDetectError::missing_client_address(format!("unparseable client address: {:?}", raw))
    })
}
