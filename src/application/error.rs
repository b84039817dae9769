use crate::domain::error::DomainError;
use crate::domain::repository::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("not signed in")]
    NotSignedIn,

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("view changed before the response arrived")]
    Stale,

    #[error("state lock poisoned")]
    LockPoisoned,
}

/// 画面単位の操作。失敗時の表示メッセージを決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FetchCatalog,
    FetchUserBooks,
    FetchBook,
    FetchUserBook,
    AddBook,
    UpdateBook,
    DeleteBook,
    SignIn,
    SignUp,
    SignOut,
    Feedback,
}

impl Action {
    pub fn success_message(self) -> &'static str {
        match self {
            Action::AddBook => "Book added to your collection successfully!",
            Action::UpdateBook => "Book updated successfully!",
            Action::DeleteBook => "Book deleted successfully.",
            Action::SignIn => "Signed in successfully!",
            Action::SignUp => "Signup successful!",
            Action::SignOut => "Signed out.",
            Action::Feedback => "Thank you for your feedback!",
            Action::FetchCatalog
            | Action::FetchUserBooks
            | Action::FetchBook
            | Action::FetchUserBook => "Loaded.",
        }
    }

    fn fallback_failure(self) -> &'static str {
        match self {
            Action::FetchCatalog => "Failed to fetch books.",
            Action::FetchUserBooks => "Failed to fetch your books.",
            Action::FetchBook => "Failed to fetch book details. Please check the ID.",
            Action::FetchUserBook => "Failed to fetch book details.",
            Action::AddBook => "Failed to add book. Please try again.",
            Action::UpdateBook => "Failed to update book.",
            Action::DeleteBook => "Failed to delete book.",
            Action::SignIn => "Invalid credentials. Please try again.",
            Action::SignUp => "Signup failed.",
            Action::SignOut => "Failed to sign out.",
            Action::Feedback => "Failed to submit feedback.",
        }
    }

    fn not_signed_in(self) -> &'static str {
        match self {
            Action::AddBook => "You must be logged in to add a book.",
            Action::UpdateBook => "You must be logged in to edit a book.",
            Action::DeleteBook => "You must be logged in to delete a book.",
            _ => "You must be logged in to do that.",
        }
    }
}

impl AppError {
    /// 利用者に見せる1行メッセージ。構造化エラーコードは出さない。
    pub fn user_message(&self, action: Action) -> String {
        match self {
            AppError::NotSignedIn => action.not_signed_in().to_string(),
            AppError::Domain(e) => capitalize(&e.to_string()),
            AppError::Stale => "The view changed before the response arrived.".to_string(),
            AppError::Api(e) => match (action, e) {
                (Action::SignIn | Action::SignUp | Action::Feedback, e) if e.server_message().is_some() => {
                    e.server_message().unwrap_or_default().to_string()
                }
                (Action::SignUp | Action::Feedback, ApiError::Transport(_)) => {
                    "Network error.".to_string()
                }
                (_, ApiError::Unauthorized(_)) if action != Action::SignIn => {
                    "Your session has expired. Please sign in again.".to_string()
                }
                _ => action.fallback_failure().to_string(),
            },
            AppError::Storage(_) | AppError::LockPoisoned => action.fallback_failure().to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_prefers_server_message() {
        let err = AppError::Api(ApiError::Unauthorized(Some("User not found".into())));
        assert_eq!(err.user_message(Action::SignIn), "User not found");

        let err = AppError::Api(ApiError::Transport("refused".into()));
        assert_eq!(
            err.user_message(Action::SignIn),
            "Invalid credentials. Please try again."
        );
    }

    #[test]
    fn sign_up_network_and_rejection() {
        let err = AppError::Api(ApiError::Transport("refused".into()));
        assert_eq!(err.user_message(Action::SignUp), "Network error.");

        let err = AppError::Api(ApiError::Rejected(None));
        assert_eq!(err.user_message(Action::SignUp), "Signup failed.");
    }

    #[test]
    fn crud_failures_use_fixed_messages() {
        let err = AppError::Api(ApiError::Status {
            status: 500,
            message: Some("boom".into()),
        });
        assert_eq!(
            err.user_message(Action::AddBook),
            "Failed to add book. Please try again."
        );
        assert_eq!(err.user_message(Action::DeleteBook), "Failed to delete book.");
    }

    #[test]
    fn unauthorized_crud_asks_to_sign_in_again() {
        let err = AppError::Api(ApiError::Unauthorized(None));
        assert_eq!(
            err.user_message(Action::UpdateBook),
            "Your session has expired. Please sign in again."
        );
    }

    #[test]
    fn not_signed_in_per_action() {
        assert_eq!(
            AppError::NotSignedIn.user_message(Action::AddBook),
            "You must be logged in to add a book."
        );
    }

    #[test]
    fn validation_errors_are_shown_verbatim() {
        let err = AppError::Domain(DomainError::MissingField("title"));
        assert_eq!(err.user_message(Action::AddBook), "Title is required");
    }
}
