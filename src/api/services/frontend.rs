use actix_web::{HttpResponse, Result, web};
use rust_embed::Embed;
use tracing::{trace, warn};

use crate::config::RoutesConfig;

// 使用 RustEmbed 嵌入展示页
#[derive(Embed)]
#[folder = "assets/"]
struct FrontendAssets;

pub struct FrontendService;

impl FrontendService {
    /// 展示页：一个按钮调用 detect 接口，原样打印返回的 JSON
    pub async fn handle_index(routes: web::Data<RoutesConfig>) -> Result<HttpResponse> {
        trace!("Serving index page");

        match FrontendAssets::get("index.html") {
            Some(content) => {
                let html_content = String::from_utf8_lossy(&content.data);
                let processed_html = html_content
                    .replace("%DETECT_PATH%", &routes.detect_path)
                    .replace("%GEODETECT_VERSION%", env!("CARGO_PKG_VERSION"));

                Ok(HttpResponse::Ok()
                    .content_type("text/html; charset=utf-8")
                    .body(processed_html))
            }
            None => {
                warn!("Embedded index.html is missing");
                Ok(HttpResponse::NotFound().body("Not Found"))
            }
        }
    }
}

/// 前端路由配置
pub fn frontend_routes() -> actix_web::Resource {
    web::resource("/").route(web::get().to(FrontendService::handle_index))
}
