//! 定位解析器
//!
//! 每个请求独立走一遍状态机，服务端不保存任何跨请求状态：
//!
//! ```text
//! START ─ cookie 完整 ──────────────────────────────▶ CACHED_HIT
//!   └──── cookie 不完整 ─▶ RESOLVE_IP ─ 无 IP ──────▶ FAIL
//!                              └─ 有 IP ─▶ CALL_PROVIDER ─ 失败 ─▶ FAIL
//!                                              └─ 成功 ─▶ PROJECT_AND_CACHE
//! ```

use std::net::IpAddr;

use actix_web::HttpRequest;
use actix_web::cookie::Cookie;
use actix_web::http::header::HeaderMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::geoip::GeoIpProvider;
use super::location::LocationRecord;
use crate::config::CookieConfig;
use crate::errors::Result;
use crate::utils::ip::{extract_client_ip, is_private_or_local};

/// 定位结果的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Cookie,
    Provider,
}

/// 一次解析的结果：定位记录 + 需要写回的 cookie
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: LocationRecord,
    pub source: ResolutionSource,
    /// 命中 cookie 时为空
    pub cookies: Vec<Cookie<'static>>,
    /// 实际用于查询的客户端 IP（命中 cookie 时为 None）
    pub client_ip: Option<IpAddr>,
}

/// 定位解析器
///
/// provider 和 cookie 策略都在构造时注入，测试可以替换成桩实现。
#[derive(Clone)]
pub struct GeoResolver {
    provider: GeoIpProvider,
    cookie_config: CookieConfig,
}

impl GeoResolver {
    pub fn new(provider: GeoIpProvider, cookie_config: CookieConfig) -> Self {
        Self {
            provider,
            cookie_config,
        }
    }

    pub fn provider(&self) -> &GeoIpProvider {
        &self.provider
    }

    /// 解析一个入站请求
    pub async fn resolve(&self, req: &HttpRequest) -> Result<Resolution> {
        let cached = LocationRecord::from_request_cookies(req);
        self.resolve_parts(cached, req.headers()).await
    }

    /// 基于已读取的 cookie 和请求头进行解析
    pub async fn resolve_parts(
        &self,
        cached: LocationRecord,
        headers: &HeaderMap,
    ) -> Result<Resolution> {
        if cached.is_complete() {
            debug!("Location cookies complete, skipping provider lookup");
            return Ok(Resolution {
                record: cached,
                source: ResolutionSource::Cookie,
                cookies: Vec::new(),
                client_ip: None,
            });
        }

        let ip = extract_client_ip(headers).inspect_err(|e| {
            warn!("Cannot resolve location: {}", e.detail());
        })?;

        if is_private_or_local(&ip) {
            debug!("Client IP {} is private, provider may not locate it", ip);
        }

        let response = self.provider.lookup(ip).await.inspect_err(|e| {
            warn!(
                "Location lookup for {} via {} failed: {}",
                ip,
                self.provider.provider_name(),
                e.detail()
            );
        })?;

        let record = LocationRecord::from_provider(&response);
        let cookies = record.to_cookies(&self.cookie_config);

        info!(
            "Resolved {} to country={:?} state={:?} city={:?}",
            ip, record.country_code, record.state_code, record.city
        );

        Ok(Resolution {
            record,
            source: ResolutionSource::Provider,
            cookies,
            client_ip: Some(ip),
        })
    }
}
