//! 作品集静态站点（`server.static_dir`，挂载在 `/`）

use actix_web::{HttpRequest, HttpResponse, web};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};

/// 静态站点根目录
#[derive(Clone, Debug)]
pub struct StaticSite {
    root: PathBuf,
}

impl StaticSite {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 把请求路径映射到根目录下的文件
    ///
    /// 含 `..`、绝对路径或盘符的请求一律拒绝。空路径和以 `/` 结尾的路径补 `index.html`。
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let trimmed = request_path.trim_start_matches('/');
        let mut relative = PathBuf::new();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if trimmed.is_empty() || trimmed.ends_with('/') {
            relative.push("index.html");
        }
        Some(self.root.join(relative))
    }
}

/// 根据文件扩展名确定 Content-Type
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        _ => "application/octet-stream",
    }
}

async fn read_file(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => tokio::fs::read(path).await.ok(),
        _ => None,
    }
}

pub async fn serve_static(req: HttpRequest, site: web::Data<StaticSite>) -> HttpResponse {
    let request_path = req.match_info().query("path");
    trace!("Serving static file: {}", request_path);

    let Some(path) = site.resolve(request_path) else {
        warn!("Rejected static path: {}", request_path);
        return HttpResponse::NotFound().body("File not found");
    };

    // `/projects` -> `projects.html`，`/blog` -> `blog/index.html`
    let candidates = if path.extension().is_some() {
        vec![path]
    } else {
        vec![
            path.with_extension("html"),
            path.join("index.html"),
            path,
        ]
    };

    for candidate in candidates {
        if let Some(body) = read_file(&candidate).await {
            return HttpResponse::Ok()
                .content_type(content_type_for(&candidate))
                .body(body);
        }
    }

    debug!("Static file not found: {}", request_path);
    HttpResponse::NotFound().body("File not found")
}

/// 静态站点路由（放在最后注册，兜底匹配）
pub fn static_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{path:.*}", web::get().to(serve_static))
        .route("/{path:.*}", web::head().to(serve_static));
}
