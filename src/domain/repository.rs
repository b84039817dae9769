use std::future::Future;

use super::model::book::{Book, BookDraft, BookPatch};
use super::model::id::BookId;
use super::model::session::{AuthToken, Credentials, Feedback, Registration, Session, UserProfile};

/// セッション永続化の抽象。Infra層が実装する。
pub trait SessionRepository {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> Result<Session, Self::Error>;
    fn save(&self, session: &Session) -> Result<(), Self::Error>;
    fn clear(&self) -> Result<(), Self::Error>;
}

/// 外部APIの失敗分類。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("unauthorized{}", fmt_message(.0))]
    Unauthorized(Option<String>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}{}", fmt_message(.message))]
    Status { status: u16, message: Option<String> },

    /// 2xxだが要求が受理されなかった（トークン欠落など）
    #[error("request rejected{}", fmt_message(.0))]
    Rejected(Option<String>),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// サーバーが返した `message` / `error` フィールド
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(msg)
            | ApiError::Rejected(msg)
            | ApiError::Status { message: msg, .. } => msg.as_deref(),
            _ => None,
        }
    }
}

fn fmt_message(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// 認証成功時にAPIが返すもの。
#[derive(Debug, Clone, PartialEq)]
pub struct AuthGrant {
    pub token: AuthToken,
    pub user: UserProfile,
}

/// 外部REST APIの抽象（Book Repository Client）。
///
/// 失敗は型付きで返す。空結果への変換やログ出力はApplication層の責務。
pub trait BookApi {
    fn fetch_catalog(&self) -> impl Future<Output = Result<Vec<Book>, ApiError>> + Send;

    fn fetch_book(&self, id: &BookId) -> impl Future<Output = Result<Book, ApiError>> + Send;

    fn fetch_user_books(
        &self,
        token: &AuthToken,
    ) -> impl Future<Output = Result<Vec<Book>, ApiError>> + Send;

    fn fetch_user_book(
        &self,
        token: &AuthToken,
        id: &BookId,
    ) -> impl Future<Output = Result<Book, ApiError>> + Send;

    fn create_user_book(
        &self,
        token: &AuthToken,
        draft: &BookDraft,
    ) -> impl Future<Output = Result<Book, ApiError>> + Send;

    fn update_user_book(
        &self,
        token: &AuthToken,
        id: &BookId,
        patch: &BookPatch,
    ) -> impl Future<Output = Result<Book, ApiError>> + Send;

    fn delete_user_book(
        &self,
        token: &AuthToken,
        id: &BookId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthGrant, ApiError>> + Send;

    fn sign_up(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthGrant, ApiError>> + Send;

    fn submit_feedback(
        &self,
        feedback: &Feedback,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        assert_eq!(
            ApiError::Unauthorized(Some("Invalid token".into())).to_string(),
            "unauthorized: Invalid token"
        );
        assert_eq!(ApiError::Unauthorized(None).to_string(), "unauthorized");
        assert_eq!(
            ApiError::Status {
                status: 500,
                message: None
            }
            .to_string(),
            "HTTP 500"
        );
    }

    #[test]
    fn server_message_only_for_http_replies() {
        let err = ApiError::Status {
            status: 400,
            message: Some("User already exists".into()),
        };
        assert_eq!(err.server_message(), Some("User already exists"));
        assert_eq!(ApiError::Transport("refused".into()).server_message(), None);
    }
}
