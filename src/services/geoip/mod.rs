//! GeoIP 服务模块
//!
//! 提供 IP 地址地理位置查询功能：
//! - `GeoLookup` 能力接口（测试中可替换为桩实现）
//! - ipgeolocation.io 外部 API 实现

mod external_api;
mod provider;

pub use external_api::{IpGeolocationProvider, redact_url};
pub use provider::{GeoIpProvider, GeoLookup, ProviderResponse};
