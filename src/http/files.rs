//! Listing, uploading and downloading files, and the event log.

use crate::http::error::HttpError;
use crate::http::{AppState, notice, pages, timestamp};
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderValue;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use ffsgate_workflow::error::ErrorKind;
use ffsgate_workflow::{Download, Packaging, Received, Upload, receive_file};
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use tokio_util::io::ReaderStream;

#[derive(Serialize)]
struct FilesPage {
    title: &'static str,
    notices: Vec<String>,
    has_files: bool,
    files: Vec<FileRow>,
}

#[derive(Serialize)]
struct FileRow {
    name: String,
    size: u64,
    uploaded_at: String,
    cid: String,
    ffs: String,
}

#[derive(Serialize)]
struct LogsPage {
    title: &'static str,
    notices: Vec<String>,
    has_logs: bool,
    logs: Vec<LogRow>,
}

#[derive(Serialize)]
struct LogRow {
    timestamp: String,
    event: String,
}

async fn files_page(state: &AppState, notices: Vec<String>) -> Result<Html<String>, HttpError> {
    let store = state.ctx.store();
    let profiles: HashMap<i64, String> = store.list_ffs().await?.into_iter().map(|f| (f.id, f.ffs_id)).collect();
    let files: Vec<FileRow> = store
        .list_files()
        .await?
        .into_iter()
        .map(|file| FileRow {
            ffs: profiles.get(&file.ffs).cloned().unwrap_or_default(),
            name: file.file_name,
            size: file.size,
            uploaded_at: timestamp(file.uploaded_at),
            cid: file.cid,
        })
        .collect();
    let page = FilesPage { title: "Files", notices, has_files: !files.is_empty(), files };
    Ok(state.pages.render(pages::FILES, &page)?)
}

pub(crate) async fn list(State(state): State<AppState>, jar: SignedCookieJar) -> Result<impl IntoResponse, HttpError> {
    let (jar, notices) = notice::take(jar);
    Ok((jar, files_page(&state, notices).await?))
}

/// Stage every file of the upload form, then send them to Filecoin.
pub(crate) async fn upload(State(state): State<AppState>, mut form: Multipart) -> Result<Html<String>, HttpError> {
    let mut staged = Vec::new();
    let mut notices = Vec::new();
    let mut make_package = false;
    let mut package_name = String::new();
    while let Some(field) = form.next_field().await.map_err(HttpError::bad_request)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("uploadfile") => {
                let original = field.file_name().unwrap_or_default().to_string();
                match receive_file(&state.ctx, &original, field).await {
                    Ok(Received::Staged(file)) => staged.push(file),
                    Ok(Received::Failed { notice, .. }) => notices.push(notice),
                    // Browsers send one nameless, empty part when nothing was chosen.
                    Err(e) if matches!(&*e, ErrorKind::NoFileProvided) => {},
                    Err(e) => return Err(e.into()),
                }
            },
            Some("make_package") => make_package = true,
            Some("package_name") => package_name = field.text().await.map_err(HttpError::bad_request)?,
            _ => {},
        }
    }
    let packaging = match make_package {
        true => Packaging::Bundle { name: package_name },
        false => Packaging::Individual,
    };
    // Files were chosen, but none of them could be staged.
    if staged.is_empty() && !notices.is_empty() {
        return files_page(&state, notices).await;
    }
    match ffsgate_workflow::upload_batch(&state.ctx, staged, packaging).await {
        Ok(uploads) => notices.extend(uploads.into_iter().filter_map(|upload| match upload {
            Upload::Stored(_) => None,
            Upload::Failed { notice, .. } => Some(notice),
        })),
        Err(e) if e.is_user_error() => notices.push((*e).to_string()),
        Err(e) => return Err(e.into()),
    }
    files_page(&state, notices).await
}

/// Retrieve a file from Filecoin and hand it to the browser as an attachment.
///
/// The local copy lives until the response body is finished or dropped.
pub(crate) async fn download(State(state): State<AppState>, Path(cid): Path<String>) -> Result<Response, HttpError> {
    match ffsgate_workflow::download(&state.ctx, &cid).await? {
        Download::Ready(fetched) => {
            let path = fetched.path();
            let file = tokio::fs::File::open(&path).await.map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "downloaded file vanished");
                HttpError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong on our side.")
            })?;
            let length = file.metadata().await.map(|m| m.len()).ok();
            let disposition = format!("attachment; filename=\"{}\"", fetched.name());
            let body = ReaderStream::new(file).map(move |chunk| {
                let _held = &fetched;
                chunk
            });
            let mut response = (
                [(CONTENT_TYPE, "application/octet-stream".to_string()), (CONTENT_DISPOSITION, disposition)],
                Body::from_stream(body),
            )
                .into_response();
            if let Some(length) = length {
                response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(length));
            }
            Ok(response)
        },
        Download::Failed(notice) => Ok(files_page(&state, vec![notice]).await?.into_response()),
    }
}

pub(crate) async fn logs(State(state): State<AppState>, jar: SignedCookieJar) -> Result<impl IntoResponse, HttpError> {
    let (jar, notices) = notice::take(jar);
    let logs: Vec<LogRow> = state
        .ctx
        .store()
        .list_logs()
        .await?
        .into_iter()
        .map(|log| LogRow { timestamp: timestamp(log.timestamp), event: log.event })
        .collect();
    let page = LogsPage { title: "Logs", notices, has_logs: !logs.is_empty(), logs };
    Ok((jar, state.pages.render(pages::LOGS, &page)?))
}

#[cfg(test)]
mod tests {
    use crate::http::testing::{TestApp, body_text};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    const BOUNDARY: &str = "ffsgate-test-boundary";

    enum Part<'a> {
        File(&'a str, &'a str),
        Text(&'a str, &'a str),
    }

    fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match part {
                Part::File(name, content) => {
                    body.push_str(&format!(
                        "Content-Disposition: form-data; name=\"uploadfile\"; filename=\"{name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
                    ));
                },
                Part::Text(field, value) => {
                    body.push_str(&format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"));
                },
            }
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::post("/files")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let app = TestApp::new().await;
        let response = app.send(upload_request(&[Part::File("notes.txt", "remember the milk")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("notes.txt"));

        let files = app.ctx().store().list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        let response = app.get(&format!("/download/{}", files[0].cid)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-disposition"], "attachment; filename=\"notes.txt\"");
        assert_eq!(body_text(response).await, "remember the milk");
    }

    #[tokio::test]
    async fn test_upload_without_file() {
        let app = TestApp::new().await;
        let response = app.send(upload_request(&[Part::File("", "")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Please choose a file to upload to Filecoin"));
        assert_eq!(app.mock.stage_calls(), 0);
    }

    #[tokio::test]
    async fn test_package_without_name() {
        let app = TestApp::new().await;
        let request = upload_request(&[
            Part::File("a.txt", "a"),
            Part::Text("make_package", "y"),
            Part::Text("package_name", "Package name"),
        ]);
        let html = body_text(app.send(request).await).await;
        assert!(html.contains("Please enter a name for the package"));
        assert_eq!(app.mock.stage_calls(), 0);
    }

    #[tokio::test]
    async fn test_package_is_uploaded_once() {
        let app = TestApp::new().await;
        let request = upload_request(&[
            Part::File("a.txt", "a"),
            Part::File("b.txt", "b"),
            Part::Text("make_package", "y"),
            Part::Text("package_name", "Tax Returns"),
        ]);
        let html = body_text(app.send(request).await).await;
        assert!(html.contains("tax-returns.tar.gz"));
        assert_eq!(app.mock.stage_calls(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_a_notice() {
        let app = TestApp::new().await;
        ffsgate_workflow::ensure_default(app.ctx()).await.unwrap();
        app.mock.set_unreachable(true);
        let response = app.send(upload_request(&[Part::File("a.txt", "a")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("&#x27;a.txt&#x27; failed to upload to Filecoin."));
        let logs = app.ctx().store().list_logs().await.unwrap();
        assert!(logs.last().unwrap().event.starts_with("Upload ERROR: a.txt "));
    }

    #[tokio::test]
    async fn test_staging_failure_is_a_notice() {
        let app = TestApp::new().await;
        std::fs::write(app.ctx().upload_dir(), b"not a directory").unwrap();
        let response = app.send(upload_request(&[Part::File("a.txt", "a")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("&#x27;a.txt&#x27; failed to upload to Filecoin."));
        assert!(!html.contains("Please choose a file"));
        let logs = app.ctx().store().list_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].event.starts_with("Upload ERROR: a.txt "));
        assert_eq!(app.mock.stage_calls(), 0);
    }

    #[tokio::test]
    async fn test_download_leaves_nothing_behind() {
        let app = TestApp::new().await;
        app.send(upload_request(&[Part::File("notes.txt", "remember the milk")])).await;
        let cid = app.ctx().store().list_files().await.unwrap()[0].cid.clone();
        let response = app.get(&format!("/download/{cid}")).await;
        assert_eq!(body_text(response).await, "remember the milk");
        let left = std::fs::read_dir(app.ctx().download_dir()).unwrap().count();
        assert_eq!(left, 0);
    }

    #[tokio::test]
    async fn test_package_named_only_punctuation() {
        let app = TestApp::new().await;
        let request = upload_request(&[
            Part::File("a.txt", "a"),
            Part::Text("make_package", "y"),
            Part::Text("package_name", "!!!"),
        ]);
        let html = body_text(app.send(request).await).await;
        assert!(html.contains("Please enter a name for the package"));
        assert!(!html.contains(".tar.gz"));
        assert_eq!(app.mock.stage_calls(), 0);
    }

    #[tokio::test]
    async fn test_download_unknown_cid_is_a_notice() {
        let app = TestApp::new().await;
        let response = app.get("/download/bafkunknown").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("No file with CID bafkunknown has been uploaded."));
    }

    #[tokio::test]
    async fn test_logs_are_listed() {
        let app = TestApp::new().await;
        ffsgate_workflow::ensure_default(app.ctx()).await.unwrap();
        let html = body_text(app.get("/logs").await).await;
        assert!(html.contains("Created new Filecoin FileSystem (FFS): ffs-0001"));
        assert!(html.contains("Created new Wallet: f3mockwallet0001"));
    }
}
