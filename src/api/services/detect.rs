use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use tracing::trace;

use crate::errors::GeoDetectError;
use crate::services::{GeoResolver, LocationRecord, ResolutionSource};

/// `GET /api/detect` 的响应体
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub country_code: Option<String>,
    pub state_code: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub source: ResolutionSource,
}

impl DetectResponse {
    fn new(record: LocationRecord, source: ResolutionSource) -> Self {
        Self {
            country_code: record.country_code,
            state_code: record.state_code,
            city: record.city,
            zipcode: record.zipcode,
            source,
        }
    }
}

pub struct DetectService;

impl DetectService {
    pub async fn detect(
        req: HttpRequest,
        resolver: web::Data<GeoResolver>,
    ) -> Result<HttpResponse, GeoDetectError> {
        trace!("Received detect request");

        let resolution = resolver.resolve(&req).await?;

        let mut builder = HttpResponse::Ok();
        builder.append_header(("Content-Type", "application/json; charset=utf-8"));
        // 值按百分号编码写出，读取端（HttpRequest::cookie）按 parse_encoded 解码
        for cookie in resolution.cookies {
            builder.append_header((header::SET_COOKIE, cookie.encoded().to_string()));
        }

        Ok(builder.json(DetectResponse::new(resolution.record, resolution.source)))
    }
}

/// Detect 路由配置
pub fn detect_routes(path: &str) -> actix_web::Resource {
    web::resource(path).route(web::get().to(DetectService::detect))
}
