//! LocationRecord 以及它和 cookie 之间的映射
//!
//! cookie 名称是对外契约，页面脚本也会直接读取它们（因此不设置 HttpOnly）。

use actix_web::HttpRequest;
use actix_web::cookie::Cookie;
use actix_web::cookie::time::Duration;
use serde::{Deserialize, Serialize};

use super::geoip::ProviderResponse;
use crate::config::CookieConfig;

pub const COUNTRY_CODE_COOKIE: &str = "country_code";
pub const STATE_COOKIE: &str = "state";
pub const CITY_COOKIE: &str = "city";
pub const ZIPCODE_COOKIE: &str = "zipcode";

/// Max-Age 上限（天），与浏览器的 400 天上限一致
pub const MAX_COOKIE_AGE_DAYS: u64 = 400;

/// 归一化后的四字段定位结果
///
/// 字段为 `None` 表示缺失；空字符串在构造时即视为缺失。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub country_code: Option<String>,
    pub state_code: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
}

impl LocationRecord {
    pub fn new(
        country_code: Option<String>,
        state_code: Option<String>,
        city: Option<String>,
        zipcode: Option<String>,
    ) -> Self {
        Self {
            country_code: non_empty(country_code),
            state_code: non_empty(state_code),
            city: non_empty(city),
            zipcode: non_empty(zipcode),
        }
    }

    /// 从 provider 响应投影，其余字段丢弃
    pub fn from_provider(resp: &ProviderResponse) -> Self {
        Self::new(
            resp.country_code2.clone(),
            resp.state_code.as_deref().map(normalize_state_code),
            resp.city.clone(),
            resp.zipcode.clone(),
        )
    }

    /// 从请求 cookie 读取（可能不完整）
    pub fn from_request_cookies(req: &HttpRequest) -> Self {
        let read = |name: &str| req.cookie(name).map(|c| c.value().to_string());
        Self::new(
            read(COUNTRY_CODE_COOKIE),
            read(STATE_COOKIE),
            read(CITY_COOKIE),
            read(ZIPCODE_COOKIE),
        )
    }

    /// 四个字段都存在（且非空）才算完整
    pub fn is_complete(&self) -> bool {
        self.country_code.is_some()
            && self.state_code.is_some()
            && self.city.is_some()
            && self.zipcode.is_some()
    }

    /// (cookie 名称, 值) 列表，缺失的字段不出现
    pub fn cookie_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            (COUNTRY_CODE_COOKIE, &self.country_code),
            (STATE_COOKIE, &self.state_code),
            (CITY_COOKIE, &self.city),
            (ZIPCODE_COOKIE, &self.zipcode),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    /// 生成要写回客户端的 cookie
    pub fn to_cookies(&self, config: &CookieConfig) -> Vec<Cookie<'static>> {
        self.cookie_pairs()
            .into_iter()
            .map(|(name, value)| build_cookie(config, name, value))
            .collect()
    }
}

/// `"US-NY"` → `"NY"`；不含分隔符时原样返回
pub fn normalize_state_code(code: &str) -> String {
    code.split_once('-')
        .map(|(_, region)| region)
        .unwrap_or(code)
        .trim()
        .to_string()
}

fn build_cookie(config: &CookieConfig, name: &'static str, value: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value.to_string());
    cookie.set_path(config.path.clone());
    cookie.set_http_only(false);
    // 上限之内的天数一定能放进 i64，Duration::days 不会溢出
    let days = config.max_age_days.min(MAX_COOKIE_AGE_DAYS) as i64;
    cookie.set_max_age(Duration::days(days));
    cookie
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
