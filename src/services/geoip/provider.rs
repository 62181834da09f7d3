//! GeoIP Provider 抽象层
//!
//! 统一的 GeoIP 查询接口。生产环境使用 [`IpGeolocationProvider`]，
//! 测试通过 [`GeoIpProvider::from_lookup`] 注入任意实现。

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::external_api::IpGeolocationProvider;
use crate::config::ProviderConfig;
use crate::errors::Result;

/// ipgeolocation.io `/ipgeo` 的响应
///
/// 只有 `country_code2`、`state_code`、`city`、`zipcode` 会进入 LocationRecord，
/// 其余字段仅用于日志。未知字段直接忽略。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub continent_code: Option<String>,
    #[serde(default)]
    pub continent_name: Option<String>,
    #[serde(default)]
    pub country_code2: Option<String>,
    #[serde(default)]
    pub country_code3: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub country_name_official: Option<String>,
    #[serde(default)]
    pub is_eu: Option<bool>,
    #[serde(default)]
    pub state_prov: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
}

/// GeoIP 查询 trait
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// 查询 IP 地址的地理位置，单次尝试，不重试
    async fn lookup(&self, ip: IpAddr) -> Result<ProviderResponse>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;

    /// 是否具备发起查询所需的凭证
    fn is_configured(&self) -> bool {
        true
    }
}

/// 统一 GeoIP Provider
#[derive(Clone)]
pub struct GeoIpProvider {
    inner: Arc<dyn GeoLookup>,
}

impl GeoIpProvider {
    /// 根据 ProviderConfig 初始化 ipgeolocation.io provider
    ///
    /// 缺少 api_key 不会导致启动失败，每个需要查询的请求都会得到 MissingCredential
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let provider = IpGeolocationProvider::new(config)?;
        if !provider.is_configured() {
            warn!("GeoIP: provider api_key is not configured, lookups will fail until it is set");
        }

        info!("GeoIP: Initialized with {} provider", provider.name());
        Ok(Self::from_lookup(Arc::new(provider)))
    }

    /// 使用任意 GeoLookup 实现
    pub fn from_lookup(inner: Arc<dyn GeoLookup>) -> Self {
        Self { inner }
    }

    /// 查询 IP 地址的地理位置
    pub async fn lookup(&self, ip: IpAddr) -> Result<ProviderResponse> {
        self.inner.lookup(ip).await
    }

    /// 获取当前使用的 provider 名称
    pub fn provider_name(&self) -> &'static str {
        self.inner.name()
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }
}
