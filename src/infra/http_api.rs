//! reqwestによるBookApi実装。
//!
//! エンドポイント（base_url相対）:
//! `GET /books`, `GET /books/{id}`, `GET|POST /user-books`,
//! `GET|PUT|DELETE /user-books/{id}`, `POST /v1/signin`, `POST /v1/signup`,
//! `POST /feedback`

use std::fmt::Debug;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ApiSettings;
use crate::domain::model::book::{Book, BookDraft, BookPatch};
use crate::domain::model::id::BookId;
use crate::domain::model::session::{AuthToken, Credentials, Feedback, Registration, UserProfile};
use crate::domain::repository::{ApiError, AuthGrant, BookApi};

/// BookFlow REST APIのHTTPクライアント。
#[derive(Clone)]
pub struct HttpBookApi {
    client: Client,
    base_url: Url,
}

impl Debug for HttpBookApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBookApi")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpBookApi {
    pub fn new(settings: &ApiSettings) -> anyhow::Result<Self> {
        let base_url = settings.base_url()?;
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("bookflow-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// base_urlのパスにセグメントを追加する。各セグメントはパーセントエンコードされる。
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Transport(format!("base url cannot have a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// エラー応答のbody。APIにより `message` か `error` のどちらかを使う。
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SigninResponse {
    token: String,
    #[serde(default)]
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct SignupResponse {
    token: Option<String>,
    message: Option<String>,
    result: Option<UserProfile>,
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    request
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))
}

/// ステータスを分類し、2xx以外はApiErrorにする。
async fn check(response: Response, resource: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body.message.or(body.error);
    warn!(%status, resource, message = message.as_deref(), "API request failed");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(resource.to_string()),
        other => ApiError::Status {
            status: other.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T, ApiError> {
    let response = check(response, resource).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(format!("{resource}: {e}")))
}

impl BookApi for HttpBookApi {
    #[instrument(skip_all)]
    async fn fetch_catalog(&self) -> Result<Vec<Book>, ApiError> {
        let response = send(self.client.get(self.url(&["books"])?)).await?;
        let books: Vec<Book> = decode(response, "books").await?;
        debug!(count = books.len(), "fetched catalog");
        Ok(books)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn fetch_book(&self, id: &BookId) -> Result<Book, ApiError> {
        let response = send(self.client.get(self.url(&["books", id.as_str()])?)).await?;
        decode(response, &format!("book {id}")).await
    }

    #[instrument(skip_all)]
    async fn fetch_user_books(&self, token: &AuthToken) -> Result<Vec<Book>, ApiError> {
        let request = self
            .client
            .get(self.url(&["user-books"])?)
            .bearer_auth(token.as_str());
        let books: Vec<Book> = decode(send(request).await?, "user-books").await?;
        debug!(count = books.len(), "fetched user books");
        Ok(books)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn fetch_user_book(&self, token: &AuthToken, id: &BookId) -> Result<Book, ApiError> {
        let request = self
            .client
            .get(self.url(&["user-books", id.as_str()])?)
            .bearer_auth(token.as_str());
        decode(send(request).await?, &format!("user book {id}")).await
    }

    #[instrument(skip_all, fields(title = %draft.title))]
    async fn create_user_book(&self, token: &AuthToken, draft: &BookDraft) -> Result<Book, ApiError> {
        let request = self
            .client
            .post(self.url(&["user-books"])?)
            .bearer_auth(token.as_str())
            .json(draft);
        let book: Book = decode(send(request).await?, "user-books").await?;
        debug!(id = %book.id(), "created user book");
        Ok(book)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn update_user_book(
        &self,
        token: &AuthToken,
        id: &BookId,
        patch: &BookPatch,
    ) -> Result<Book, ApiError> {
        let request = self
            .client
            .put(self.url(&["user-books", id.as_str()])?)
            .bearer_auth(token.as_str())
            .json(patch);
        decode(send(request).await?, &format!("user book {id}")).await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete_user_book(&self, token: &AuthToken, id: &BookId) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(&["user-books", id.as_str()])?)
            .bearer_auth(token.as_str());
        check(send(request).await?, &format!("user book {id}")).await?;
        debug!("deleted user book");
        Ok(())
    }

    #[instrument(skip_all, fields(username = %credentials.username))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        let request = self
            .client
            .post(self.url(&["v1", "signin"])?)
            .json(&credentials.trimmed());
        let body: SigninResponse = decode(send(request).await?, "signin").await?;
        Ok(AuthGrant {
            token: AuthToken::new(body.token),
            user: body.user,
        })
    }

    #[instrument(skip_all, fields(username = %registration.username))]
    async fn sign_up(&self, registration: &Registration) -> Result<AuthGrant, ApiError> {
        let request = self
            .client
            .post(self.url(&["v1", "signup"])?)
            .json(&registration.trimmed());
        let body: SignupResponse = decode(send(request).await?, "signup").await?;
        match (body.token, body.result) {
            (Some(token), Some(user)) => Ok(AuthGrant {
                token: AuthToken::new(token),
                user,
            }),
            _ => Err(ApiError::Rejected(body.message)),
        }
    }

    #[instrument(skip_all)]
    async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), ApiError> {
        let request = self.client.post(self.url(&["feedback"])?).json(feedback);
        check(send(request).await?, "feedback").await?;
        Ok(())
    }
}
