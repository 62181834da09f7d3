//! ipgeolocation.io GeoIP 实现
//!
//! `GET {base_url}/ipgeo?apiKey=<key>&ip=<ip>&fields=geo,zipcode`
//! 每个请求最多一次 HTTP 调用，不缓存、不重试。api_key 不会出现在日志和错误信息中。

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace, warn};
use ureq::Agent;
use url::Url;

use super::provider::{GeoLookup, ProviderResponse};
use crate::config::ProviderConfig;
use crate::errors::{GeoDetectError, Result};

const API_KEY_PARAM: &str = "apiKey";
const REDACTED: &str = "***";

/// ipgeolocation.io Provider
pub struct IpGeolocationProvider {
    endpoint: Url,
    api_key: Option<String>,
    fields: String,
    agent: Agent,
}

impl IpGeolocationProvider {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let mut endpoint = Url::parse(&config.base_url)?;
        endpoint
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("provider base_url cannot be a base: {}", config.base_url))?
            .pop_if_empty()
            .push("ipgeo");

        // 非 2xx 状态码由调用方自行判断，这样可以区分传输错误和上游错误
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs.max(1))))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            endpoint,
            api_key: config.api_key().map(String::from),
            fields: config.fields.clone(),
            agent,
        })
    }

    /// 拼接查询 URL，参数做 URL 编码
    fn build_url(&self, api_key: &str, ip: IpAddr) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(API_KEY_PARAM, api_key)
            .append_pair("ip", &ip.to_string())
            .append_pair("fields", &self.fields);
        url
    }

    /// 同步请求（在 spawn_blocking 中调用）
    fn fetch_sync(agent: &Agent, url: &Url, api_key: &str) -> Result<ProviderResponse> {
        let redacted = redact_url(url);

        let mut resp = agent
            .get(url.as_str())
            .header("Accept", "application/json")
            .call()
            .map_err(|e| {
                let reason = scrub_api_key(&e.to_string(), api_key);
                warn!("GeoIP API request to \"{}\" failed: {}", redacted, reason);
                GeoDetectError::provider_unavailable(format!("request failed: {}", reason))
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!("GeoIP API \"{}\" responded with {}", redacted, status);
            return Err(GeoDetectError::provider_unavailable(format!(
                "upstream responded with {}",
                status
            )));
        }

        let body = resp.body_mut().read_to_string().map_err(|e| {
            let reason = scrub_api_key(&e.to_string(), api_key);
            warn!("GeoIP API body from \"{}\" unreadable: {}", redacted, reason);
            GeoDetectError::provider_unavailable(format!("body read failed: {}", reason))
        })?;

        let parsed: ProviderResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("GeoIP API response from \"{}\" parse failed: {}", redacted, e);
            GeoDetectError::from(e)
        })?;

        trace!(
            "GeoIP API lookup: country={:?}, state={:?}, city={:?}",
            parsed.country_code2, parsed.state_code, parsed.city
        );

        Ok(parsed)
    }
}

#[async_trait]
impl GeoLookup for IpGeolocationProvider {
    async fn lookup(&self, ip: IpAddr) -> Result<ProviderResponse> {
        let Some(api_key) = self.api_key.clone() else {
            warn!("GeoIP lookup for {} skipped: api_key is not configured", ip);
            return Err(GeoDetectError::missing_credential(
                "provider api_key is not configured",
            ));
        };

        let url = self.build_url(&api_key, ip);
        debug!("GeoIP lookup for {} via {}", ip, redact_url(&url));

        let agent = self.agent.clone();
        // ureq 是同步客户端，放到阻塞线程池中执行
        tokio::task::spawn_blocking(move || Self::fetch_sync(&agent, &url, &api_key))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                Err(GeoDetectError::provider_unavailable(format!(
                    "lookup task failed: {}",
                    e
                )))
            })
    }

    fn name(&self) -> &'static str {
        "ipgeolocation.io"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// 从错误文本中抹掉 api_key，原文和 URL 查询串中的编码形式都要处理
fn scrub_api_key(text: &str, api_key: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(api_key.as_bytes()).collect();
    let scrubbed = text.replace(api_key, REDACTED);
    if encoded == api_key {
        scrubbed
    } else {
        scrubbed.replace(&encoded, REDACTED)
    }
}

/// 把 URL 中的 apiKey 参数替换为 `***`，用于日志输出
pub fn redact_url(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == API_KEY_PARAM) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == API_KEY_PARAM {
                (k.into_owned(), REDACTED.to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
