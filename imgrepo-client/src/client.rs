use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use imgrepo_core::deadline::with_deadline;
use imgrepo_core::transfer::{encode_transfer, framed_reader, receive_all};
use imgrepo_core::{RepoError, Result, ResultExt};
use imgrepo_model::{
    ApiResponse, DownloadHeader, ErrorBody, Image, ImageID, ImageRecord,
    ListResponse, LoginRequest, LoginResponse, NewImage, RegisterRequest,
    TRANSFER_CONTENT_TYPE, UploadHeader, UploadResponse, Visibility, routes::v1,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde_json::from_str;
use tokio::sync::RwLock;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;

/// Identity and token captured by a successful login.
#[derive(Clone)]
struct ClientSession {
    identity: String,
    token: String,
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// One page of `list` results.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub images: Vec<ImageRecord>,
    /// Pass back to `list` for the following page. `None` once a page comes
    /// back empty.
    pub next_cursor: Option<ImageID>,
}

/// Driver for a remote image repository.
///
/// Cloning is cheap and clones share the same session. `login` holds the
/// session lock exclusively while it runs; uploads and downloads hold it
/// shared for the whole transfer, so a login waits for in-flight transfers
/// and never swaps the token underneath one.
#[derive(Clone)]
pub struct RepositoryClient {
    http: Client,
    base_url: Url,
    config: ClientConfig,
    session: Arc<RwLock<Option<ClientSession>>>,
}

impl fmt::Debug for RepositoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryClient")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .field(
                "logged_in",
                &self.session.try_read().map(|s| s.is_some()).unwrap_or(false),
            )
            .finish()
    }
}

impl RepositoryClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, ClientConfig::default())
    }

    pub fn with_config(base_url: &str, config: ClientConfig) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| RepoError::Internal(format!("failed to build HTTP client: {e}")))?;

        info!(base_url = %base_url, "repository client created");
        Ok(Self {
            http,
            base_url,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Identity of the logged-in user, if any.
    pub async fn identity(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.identity.clone())
    }

    fn url(&self, path: &str) -> Result<Url> {
        let joined = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));
        Url::parse(&joined).map_err(|e| RepoError::Validation(format!("invalid URL {joined}: {e}")))
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url(v1::auth::REGISTER)?)
            .timeout(self.config.request_timeout)
            .json(&RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
            });

        send(request, "register").await?;
        info!(username, "registered");
        Ok(())
    }

    /// Log in and keep the session for later calls. Replaces any previous
    /// session, also when the new login fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let mut session = self.session.write().await;
        *session = None;

        let request = self
            .http
            .post(self.url(v1::auth::LOGIN)?)
            .timeout(self.config.request_timeout)
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            });
        let response = send(request, "login").await?;
        let login: LoginResponse = read_data(response, "login").await?;

        *session = Some(ClientSession {
            identity: username.trim().to_string(),
            token: login.token,
        });
        info!(username, expires_in = login.expires_in, "logged in");
        Ok(())
    }

    /// Stream `data` to the server as header then chunks. An empty owner is
    /// filled with the logged-in identity.
    pub async fn upload(&self, image: NewImage, data: Bytes) -> Result<ImageID> {
        let guard = self.session.read().await;
        let session = logged_in(guard.as_ref())?;

        let mut image = image;
        if image.owner.trim().is_empty() {
            image.owner = session.identity.clone();
        }
        let name = image.name.clone();
        let bytes = data.len();
        let header = UploadHeader::new(session.token.clone(), image);

        let request = self
            .http
            .post(self.url(v1::images::COLLECTION)?)
            .header(header::CONTENT_TYPE, TRANSFER_CONTENT_TYPE)
            .body(reqwest::Body::wrap_stream(encode_transfer(header, data)));

        let id = self
            .bounded_transfer("upload", async {
                let response = send(request, "upload").await?;
                let uploaded: UploadResponse = read_data(response, "upload").await?;
                Ok(uploaded.id)
            })
            .await?;

        info!(image_id = %id, name = %name, bytes, "upload complete");
        Ok(id)
    }

    /// Fetch an image. The payload is whatever the chunks concatenate to;
    /// the chunk count is not known in advance.
    pub async fn download(&self, id: ImageID) -> Result<Image> {
        let guard = self.session.read().await;
        let session = logged_in(guard.as_ref())?;

        let request = self
            .http
            .get(self.url(&v1::images::item(id))?)
            .bearer_auth(&session.token)
            .query(&[("requester", session.identity.as_str())]);
        let max_len = self.config.max_image_bytes;

        let image = self
            .bounded_transfer("download", async move {
                let response = send(request, "download").await?;
                let stream = response.bytes_stream().map_err(io::Error::other);
                let frames = framed_reader::<DownloadHeader, _>(StreamReader::new(stream));
                let received = receive_all(frames, max_len).await.context("download")?;
                debug!(chunks = received.chunks, "download stream closed");
                Ok(Image {
                    record: received.header,
                    data: received.payload,
                })
            })
            .await?;

        if image.record.id != id {
            return Err(RepoError::Transport(format!(
                "download of {id} returned header for {}",
                image.record.id
            )));
        }
        info!(image_id = %id, bytes = image.data.len(), "download complete");
        Ok(image)
    }

    /// Fetch one page of images visible to the logged-in user, newest first.
    /// `None` starts from the newest image.
    pub async fn list(&self, cursor: Option<ImageID>) -> Result<ListPage> {
        // Copy the session out so the lock is not held across the request.
        let session = logged_in(self.session.read().await.as_ref())?.clone();

        let mut query = vec![
            ("requester", session.identity.clone()),
            ("page_size", self.config.page_size.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let request = self
            .http
            .get(self.url(v1::images::COLLECTION)?)
            .timeout(self.config.request_timeout)
            .bearer_auth(&session.token)
            .query(&query);
        let response = send(request, "list").await?;
        let page: ListResponse = read_data(response, "list").await?;

        let next_cursor = page.next_cursor();
        debug!(count = page.images.len(), ?next_cursor, "listed images");
        Ok(ListPage {
            images: page.images,
            next_cursor,
        })
    }

    /// Upload a local file named after its base name, owned by the
    /// logged-in user.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        visibility: Visibility,
    ) -> Result<ImageID> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                RepoError::Validation(format!("{} has no usable file name", path.display()))
            })?
            .to_string();
        let data = tokio::fs::read(path).await.map_err(|e| {
            RepoError::Validation(format!("cannot read {}: {e}", path.display()))
        })?;

        self.upload(NewImage::new(name, "", visibility), Bytes::from(data))
            .await
    }

    /// Download an image into `dir`, named after the stored image name.
    /// Returns the written path.
    pub async fn download_to(&self, id: ImageID, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return Err(RepoError::Validation(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
        }

        let image = self.download(id).await?;
        let file_name = Path::new(&image.record.name)
            .file_name()
            .ok_or_else(|| {
                RepoError::Validation(format!(
                    "image name '{}' is not a valid file name",
                    image.record.name
                ))
            })?;
        let target = dir.join(file_name);
        tokio::fs::write(&target, &image.data).await.map_err(|e| {
            RepoError::Validation(format!("cannot write {}: {e}", target.display()))
        })?;

        info!(image_id = %id, path = %target.display(), "image saved");
        Ok(target)
    }

    async fn bounded_transfer<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.config.transfer_timeout {
            Some(limit) => with_deadline(limit, op, fut).await,
            None => fut.await,
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    if with_scheme != raw {
        debug!(from = raw, to = %with_scheme, "normalized base URL");
    }
    Url::parse(&with_scheme)
        .map_err(|e| RepoError::Validation(format!("invalid base URL '{raw}': {e}")))
}

fn logged_in(session: Option<&ClientSession>) -> Result<&ClientSession> {
    session.ok_or_else(|| RepoError::Authentication("not logged in".into()))
}

fn transport_error(op: &str, err: reqwest::Error) -> RepoError {
    if err.is_timeout() {
        RepoError::DeadlineExceeded(format!("{op} timed out: {err}"))
    } else {
        RepoError::Transport(format!("{op}: {err}"))
    }
}

/// Send a request and turn any non-success response into the error the
/// server reported.
async fn send(request: RequestBuilder, op: &str) -> Result<Response> {
    let response = request.send().await.map_err(|e| transport_error(op, e))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = error_from_response(status, &body);
    if matches!(err, RepoError::Authentication(_) | RepoError::Credential) {
        warn!(op, %status, "request rejected");
    }
    Err(err)
}

async fn read_data<T: serde::de::DeserializeOwned>(response: Response, op: &str) -> Result<T> {
    let envelope: ApiResponse<T> = response.json().await.map_err(|e| transport_error(op, e))?;
    envelope
        .data
        .ok_or_else(|| RepoError::Transport(format!("{op}: empty response from server")))
}

/// Rebuild the server's error variant from its JSON body, falling back to
/// the status code for bodies that are not ours (proxies, panics).
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> RepoError {
    if let Ok(ErrorBody { error }) = from_str::<ErrorBody>(body) {
        return RepoError::from_kind(error.kind, error.message);
    }

    let message = if body.trim().is_empty() {
        format!("server responded with {status}")
    } else {
        format!("server responded with {status}: {}", body.trim())
    };
    match status {
        StatusCode::UNAUTHORIZED => RepoError::Authentication(message),
        StatusCode::FORBIDDEN => RepoError::Authorization(message),
        StatusCode::NOT_FOUND => RepoError::NotFound(message),
        StatusCode::CONFLICT => RepoError::Duplicate(message),
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => {
            RepoError::DeadlineExceeded(message)
        }
        status if status.is_client_error() => RepoError::Validation(message),
        _ => RepoError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_scheme_and_loses_trailing_slash() {
        let client = RepositoryClient::new("localhost:10000/").unwrap();
        assert_eq!(
            client.url(v1::auth::LOGIN).unwrap().as_str(),
            "http://localhost:10000/api/v1/auth/login"
        );

        let client = RepositoryClient::new("https://images.example.com").unwrap();
        assert_eq!(client.base_url().scheme(), "https");
    }

    #[test]
    fn rebuilds_server_error_variants() {
        let body = r#"{"error":{"kind":"credential","message":"invalid username or password","status":401}}"#;
        assert!(matches!(
            error_from_response(StatusCode::UNAUTHORIZED, body),
            RepoError::Credential
        ));

        let body = r#"{"error":{"kind":"authorization","message":"private","status":403}}"#;
        assert!(matches!(
            error_from_response(StatusCode::FORBIDDEN, body),
            RepoError::Authorization(msg) if msg == "private"
        ));
    }

    #[test]
    fn foreign_error_bodies_fall_back_to_status() {
        assert!(matches!(
            error_from_response(StatusCode::NOT_FOUND, "<html>nope</html>"),
            RepoError::NotFound(_)
        ));
        assert!(matches!(
            error_from_response(StatusCode::BAD_GATEWAY, ""),
            RepoError::Internal(_)
        ));
        assert!(matches!(
            error_from_response(StatusCode::UNPROCESSABLE_ENTITY, "bad"),
            RepoError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn session_operations_fail_before_any_request_when_logged_out() {
        // Nothing listens here; reaching the network would be a transport error.
        let client = RepositoryClient::new("127.0.0.1:9").unwrap();

        let err = client
            .upload(NewImage::new("a.png", "", Visibility::Public), Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Authentication(_)));

        let err = client.download(ImageID::new()).await.unwrap_err();
        assert!(matches!(err, RepoError::Authentication(_)));

        let err = client.list(None).await.unwrap_err();
        assert!(matches!(err, RepoError::Authentication(_)));
    }

    #[tokio::test]
    async fn upload_file_rejects_unreadable_paths() {
        let client = RepositoryClient::new("127.0.0.1:9").unwrap();
        *client.session.write().await = Some(ClientSession {
            identity: "alice".into(),
            token: "t".into(),
        });

        let err = client
            .upload_file("/definitely/not/here.png", Visibility::Public)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }
}
