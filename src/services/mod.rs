//! Service layer
//!
//! - `geoip`: provider 能力接口和 ipgeolocation.io 实现
//! - `location`: LocationRecord 与 cookie 映射
//! - `resolver`: 请求级别的定位状态机

pub mod geoip;
pub mod location;
pub mod resolver;

pub use geoip::{GeoIpProvider, GeoLookup, IpGeolocationProvider, ProviderResponse};
pub use location::{LocationRecord, normalize_state_code};
pub use resolver::{GeoResolver, Resolution, ResolutionSource};
