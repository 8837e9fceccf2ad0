//! HTTP server for previewing reports
//!
//! `execsummary serve ./executivesummary` → starts server, opens browser,
//! serves the report pages and their images

use crate::report::html::escape;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    /// Only list reports whose file name contains this text
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// Path relative to the served directory, with `/` separators
    pub path: String,
    pub modified: Option<String>,
}

/// Start server, open browser, serve the report directory
pub fn start(port: u16, root: PathBuf) -> std::io::Result<()> {
    let root = root.canonicalize()?;
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let url = format!("http://localhost:{}", port);
    eprintln!("\n\x1b[1;32mexecsummary\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Serving: {}\n", root.display());

    // Open browser
    if let Err(e) = open::that(&url) {
        warn!("could not open a browser: {}", e);
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &root) {
            warn!("request failed: {}", e);
        }
    }

    Ok(())
}

fn handle_request(request: Request, root: &Path) -> std::io::Result<()> {
    let url = request.url().to_string();
    let mut parts = url.splitn(2, '?');
    let path = parts.next().unwrap_or("/");
    let query = parts.next().unwrap_or("");
    let method = request.method().clone();
    debug!("{} {}", method, path);

    match (&method, path) {
        (&Method::Get, "/") => {
            let reports = list_reports(root, None);
            let response = Response::from_string(index_page(&reports))
                .with_header(content_type("text/html; charset=utf-8"));
            request.respond(response)
        }

        // API: List reports
        (&Method::Get, "/api/reports") => {
            let params: ListParams = serde_urlencoded::from_str(query).unwrap_or_default();
            let reports = list_reports(root, params.filter.as_deref());
            let json = serde_json::to_string(&ApiResponse::success(reports))?;
            let response = Response::from_string(json).with_header(content_type("application/json"));
            request.respond(response)
        }

        (&Method::Get, _) => match resolve(root, path) {
            Some(file) if file.is_file() => {
                let body = fs::read(&file)?;
                let response = Response::from_data(body).with_header(content_type(mime_for(&file)));
                request.respond(response)
            }
            Some(_) => request.respond(Response::from_string("Not found").with_status_code(404)),
            None => {
                warn!("rejected path {}", path);
                request.respond(Response::from_string("Forbidden").with_status_code(403))
            }
        },

        _ => {
            let response = Response::from_string("Method not allowed").with_status_code(405);
            request.respond(response)
        }
    }
}

fn content_type(value: &str) -> Header {
    match Header::from_bytes(&b"Content-Type"[..], value.as_bytes()) {
        Ok(header) => header,
        Err(()) => unreachable!("content types are ASCII"),
    }
}

/// Map a URL path onto a file under `root`. Returns `None` for anything
/// that would leave `root` (`..`, absolute components, encoded separators).
pub fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(url_path).decode_utf8().ok()?;
    if decoded.contains(['\\', '\0']) {
        return None;
    }
    let relative = decoded.trim_start_matches('/');
    let mut path = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

pub fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Every HTML report below `root`, sorted by path.
pub fn list_reports(root: &Path, filter: Option<&str>) -> Vec<ReportEntry> {
    let mut reports: Vec<ReportEntry> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("html"))
                .unwrap_or(false)
        })
        .filter(|e| match filter {
            Some(f) => e.file_name().to_string_lossy().contains(f),
            None => true,
        })
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/");
            let modified = e
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(|t| chrono::DateTime::<chrono::Local>::from(t).to_rfc3339());
            Some(ReportEntry { path, modified })
        })
        .collect();
    reports.sort_by(|a, b| a.path.cmp(&b.path));
    info!("{} report(s) under {}", reports.len(), root.display());
    reports
}

fn index_page(reports: &[ReportEntry]) -> String {
    let items: String = if reports.is_empty() {
        "<li>No reports found.</li>".to_string()
    } else {
        reports
            .iter()
            .map(|r| format!(r#"<li><a href="/{0}">{0}</a></li>"#, escape(&r.path)))
            .collect()
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Executive summaries</title></head>
<body style="font-family: Verdana, Helvetica, Arial, sans-serif">
<h2>Executive summaries</h2>
<ul>{items}</ul>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // ==========================================================================
    // PATH RESOLUTION TESTS
    // ==========================================================================

    #[test]
    fn test_resolve_inside_root() {
        let root = Path::new("/srv/report");
        assert_eq!(
            resolve(root, "/img/T1_mosaic.jpg"),
            Some(PathBuf::from("/srv/report/img/T1_mosaic.jpg"))
        );
        assert_eq!(
            resolve(root, "/./executive_summary_sub-01.html"),
            Some(PathBuf::from("/srv/report/executive_summary_sub-01.html"))
        );
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = Path::new("/srv/report");
        assert_eq!(resolve(root, "/../etc/passwd"), None);
        assert_eq!(resolve(root, "/img/../../etc/passwd"), None);
        assert_eq!(resolve(root, "/%2e%2e/etc/passwd"), None);
        assert_eq!(resolve(root, "/img%5c..%5csecret"), None);
    }

    #[test]
    fn test_resolve_decodes_spaces() {
        let root = Path::new("/srv/report");
        assert_eq!(
            resolve(root, "/img/a%20b.png"),
            Some(PathBuf::from("/srv/report/img/a b.png"))
        );
        assert_eq!(
            resolve(root, "/img/bad%zz.png"),
            Some(PathBuf::from("/srv/report/img/bad%zz.png"))
        );
    }

    #[test]
    fn test_resolve_rejects_backslash_and_nul() {
        let root = Path::new("/srv/report");
        assert_eq!(resolve(root, "/img/a%00.png"), None);
        assert_eq!(resolve(root, "/img/a%5Cb.png"), None);
        assert_eq!(resolve(root, "/img/a\\b.png"), None);
        assert_eq!(resolve(root, "/img/%ff.png"), None);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_for(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(mime_for(Path::new("a")), "application/octet-stream");
    }

    // ==========================================================================
    // REPORT LISTING TESTS
    // ==========================================================================

    #[test]
    fn test_list_reports() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("sub-02").join("executivesummary");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("executive_summary_sub-01.html"), "x").unwrap();
        fs::write(nested.join("executive_summary_sub-02.html"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let reports = list_reports(dir.path(), None);
        let paths: Vec<&str> = reports.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "executive_summary_sub-01.html",
                "sub-02/executivesummary/executive_summary_sub-02.html"
            ]
        );

        let filtered = list_reports(dir.path(), Some("sub-02"));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_index_page_links_reports() {
        let page = index_page(&[ReportEntry {
            path: "executive_summary_sub-01.html".into(),
            modified: None,
        }]);
        assert!(page.contains(r#"<a href="/executive_summary_sub-01.html">"#));
        assert!(index_page(&[]).contains("No reports found."));
    }

    #[test]
    fn test_list_params_from_query() {
        let params: ListParams = serde_urlencoded::from_str("filter=ses-A").unwrap();
        assert_eq!(params.filter.as_deref(), Some("ses-A"));
        let empty: ListParams = serde_urlencoded::from_str("").unwrap();
        assert_eq!(empty.filter, None);
    }
}
