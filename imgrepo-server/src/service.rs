//! Network-facing orchestrator: authenticates every sensitive call against
//! the session store, then delegates to the registry.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use imgrepo_core::auth::SessionToken;
use imgrepo_core::deadline::with_deadline;
use imgrepo_core::ports::{Session, SessionStore, UserService};
use imgrepo_core::transfer::{TransferCodecError, TransferReceiver};
use imgrepo_core::{ImageRegistry, RepoError, Result, ResultExt};
use imgrepo_model::{Image, ImageID, ImageRecord, TransferFrame, UploadHeader};
use tracing::{debug, info, warn};

/// Holds no state across calls beyond the injected backends.
#[derive(Clone)]
pub struct RepositoryService {
    users: Arc<dyn UserService>,
    sessions: Arc<dyn SessionStore>,
    registry: ImageRegistry,
    max_image_bytes: usize,
}

impl std::fmt::Debug for RepositoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryService")
            .field("registry", &self.registry)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish_non_exhaustive()
    }
}

impl RepositoryService {
    pub fn new(
        users: Arc<dyn UserService>,
        sessions: Arc<dyn SessionStore>,
        registry: ImageRegistry,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            users,
            sessions,
            registry,
            max_image_bytes,
        }
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        self.users
            .register(username, password)
            .await
            .context("register")
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionToken> {
        let subject = self.users.login(username, password).await?;
        let token = self.sessions.new_session(&subject).await.context("login")?;
        info!(subject = %subject, "session issued");
        Ok(token)
    }

    pub async fn authenticate(&self, token: &str) -> Result<Session> {
        if token.trim().is_empty() {
            return Err(RepoError::Authentication("missing session token".into()));
        }
        with_deadline(
            self.registry.options().operation_timeout,
            "validate session",
            self.sessions.is_session(token),
        )
        .await
        .inspect_err(|err| warn!(error = %err, "session rejected"))
    }

    /// Run the receiving half of an upload. Authentication and the owner
    /// check happen as soon as the header frame arrives, before any chunk is
    /// buffered.
    pub async fn upload_image<S>(&self, mut frames: S) -> Result<ImageID>
    where
        S: Stream<Item = std::result::Result<TransferFrame<UploadHeader>, TransferCodecError>>
            + Unpin,
    {
        let mut receiver = TransferReceiver::new(self.max_image_bytes);
        let mut bound = None;

        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(RepoError::from).context("upload")?;
            if let Some(header) = receiver.accept(frame)? {
                debug!(?header, "upload header received");
                let session = self.authenticate(&header.token).await?;
                let owner = bind_identity(&session, &header.owner, "owner")?;
                bound = Some((session, owner));
            }
        }

        let received = receiver.finish().context("upload")?;
        let Some((session, owner)) = bound else {
            return Err(RepoError::Authentication("missing session token".into()));
        };

        let mut image = received.header.into_new_image();
        image.owner = owner;

        info!(
            subject = %session.subject,
            name = %image.name,
            bytes = received.payload.len(),
            chunks = received.chunks,
            "upload received"
        );
        self.registry.upload(image, received.payload).await
    }

    /// Authenticate, then fetch the record and payload. Errors surface here,
    /// before any part of the download stream is produced.
    pub async fn download_image(
        &self,
        token: &str,
        requester: Option<&str>,
        id: ImageID,
    ) -> Result<Image> {
        let session = self.authenticate(token).await?;
        let requester = bind_identity(&session, requester.unwrap_or_default(), "requester")?;
        let image = self.registry.download(&requester, id).await?;
        info!(image_id = %id, requester = %requester, bytes = image.data.len(), "download started");
        Ok(image)
    }

    pub async fn list_images(
        &self,
        token: &str,
        requester: Option<&str>,
        page_size: u32,
        cursor: Option<ImageID>,
    ) -> Result<Vec<ImageRecord>> {
        let session = self.authenticate(token).await?;
        let requester = bind_identity(&session, requester.unwrap_or_default(), "requester")?;
        self.registry.list(&requester, page_size, cursor).await
    }
}

/// The acting identity is always the session subject. A client-supplied
/// identity may be omitted but must not name someone else.
fn bind_identity(session: &Session, claimed: &str, field: &str) -> Result<String> {
    let claimed = claimed.trim();
    if claimed.is_empty() || claimed == session.subject {
        Ok(session.subject.clone())
    } else {
        warn!(subject = %session.subject, claimed, field, "identity mismatch");
        Err(RepoError::Authorization(format!(
            "{field} '{claimed}' does not match the authenticated user"
        )))
    }
}
