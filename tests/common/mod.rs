//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use bookflow_mcp::domain::model::book::{Book, BookDraft, BookPatch};
use bookflow_mcp::domain::model::id::BookId;
use bookflow_mcp::domain::model::session::{
    AuthToken, Credentials, Feedback, Registration, Session, UserProfile,
};
use bookflow_mcp::domain::repository::{ApiError, AuthGrant, BookApi, SessionRepository};

// =============================================================================
// InMemorySessionStore: テスト用セッションストア
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("in-memory store error")]
pub struct InMemoryError;

/// ファイルI/O不要のインメモリストア。
#[derive(Default)]
pub struct InMemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionRepository for InMemorySessionStore {
    type Error = InMemoryError;

    fn load(&self) -> Result<Session, Self::Error> {
        let guard = self.session.lock().map_err(|_| InMemoryError)?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, session: &Session) -> Result<(), Self::Error> {
        *self.session.lock().map_err(|_| InMemoryError)? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Self::Error> {
        *self.session.lock().map_err(|_| InMemoryError)? = None;
        Ok(())
    }
}

// =============================================================================
// FakeApi: 応答を差し替えられるBookApi
// =============================================================================

type Hook = Box<dyn Fn() + Send + Sync>;

/// 各エンドポイントの応答を事前に仕込むフェイク。呼び出し回数も記録する。
#[derive(Default)]
pub struct FakeApi {
    pub catalog: Mutex<Option<Result<Vec<Book>, ApiError>>>,
    pub user_books: Mutex<Option<Result<Vec<Book>, ApiError>>>,
    pub grant: Mutex<Option<Result<AuthGrant, ApiError>>>,
    pub feedback_result: Mutex<Option<Result<(), ApiError>>>,
    pub sent_feedback: Mutex<Vec<Feedback>>,
    pub catalog_calls: AtomicUsize,
    pub user_book_calls: AtomicUsize,
    pub mutation_calls: AtomicUsize,
    /// カタログ取得中に実行されるフック（画面遷移の割り込み再現用）
    on_fetch: Mutex<Option<Hook>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, books: Vec<Book>) -> Self {
        *self.catalog.lock().unwrap() = Some(Ok(books));
        self
    }

    pub fn with_catalog_error(self, err: ApiError) -> Self {
        *self.catalog.lock().unwrap() = Some(Err(err));
        self
    }

    pub fn with_user_books(self, books: Vec<Book>) -> Self {
        *self.user_books.lock().unwrap() = Some(Ok(books));
        self
    }

    pub fn with_user_books_error(self, err: ApiError) -> Self {
        *self.user_books.lock().unwrap() = Some(Err(err));
        self
    }

    pub fn with_grant(self, grant: Result<AuthGrant, ApiError>) -> Self {
        *self.grant.lock().unwrap() = Some(grant);
        self
    }

    pub fn with_feedback_result(self, result: Result<(), ApiError>) -> Self {
        *self.feedback_result.lock().unwrap() = Some(result);
        self
    }

    pub fn on_fetch(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_fetch.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn user_book_calls(&self) -> usize {
        self.user_book_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    fn canned<T: Clone>(slot: &Mutex<Option<Result<T, ApiError>>>, default: T) -> Result<T, ApiError> {
        slot.lock().unwrap().clone().unwrap_or(Ok(default))
    }
}

impl BookApi for FakeApi {
    async fn fetch_catalog(&self) -> Result<Vec<Book>, ApiError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_fetch.lock().unwrap().as_ref() {
            hook();
        }
        Self::canned(&self.catalog, Vec::new())
    }

    async fn fetch_book(&self, id: &BookId) -> Result<Book, ApiError> {
        let catalog = Self::canned(&self.catalog, Vec::new())?;
        catalog
            .into_iter()
            .find(|b| b.id() == id)
            .ok_or_else(|| ApiError::NotFound(format!("book {id}")))
    }

    async fn fetch_user_books(&self, _token: &AuthToken) -> Result<Vec<Book>, ApiError> {
        self.user_book_calls.fetch_add(1, Ordering::SeqCst);
        Self::canned(&self.user_books, Vec::new())
    }

    async fn fetch_user_book(&self, _token: &AuthToken, id: &BookId) -> Result<Book, ApiError> {
        let books = Self::canned(&self.user_books, Vec::new())?;
        books
            .into_iter()
            .find(|b| b.id() == id)
            .ok_or_else(|| ApiError::NotFound(format!("user book {id}")))
    }

    async fn create_user_book(&self, _token: &AuthToken, draft: &BookDraft) -> Result<Book, ApiError> {
        let n = self.mutation_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut book = Book::new(format!("new{n}"), &*draft.title, &*draft.author, &*draft.genre);
        if let Some(image) = &draft.image {
            book = book.with_image(image.clone());
        }
        if let Some(description) = &draft.description {
            book = book.with_description(description.clone());
        }
        if let Some(date) = draft.published_date {
            book = book.with_published_date(date);
        }
        Ok(book)
    }

    async fn update_user_book(
        &self,
        token: &AuthToken,
        id: &BookId,
        patch: &BookPatch,
    ) -> Result<Book, ApiError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.fetch_user_book(token, id).await?;
        Ok(Book::new(
            id.clone(),
            patch.title.clone().unwrap_or_else(|| current.title().to_string()),
            patch.author.clone().unwrap_or_else(|| current.author().to_string()),
            patch.genre.clone().unwrap_or_else(|| current.genre().to_string()),
        ))
    }

    async fn delete_user_book(&self, token: &AuthToken, id: &BookId) -> Result<(), ApiError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_user_book(token, id).await.map(|_| ())
    }

    async fn sign_in(&self, _credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        self.grant
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ApiError::Unauthorized(None)))
    }

    async fn sign_up(&self, _registration: &Registration) -> Result<AuthGrant, ApiError> {
        self.grant
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ApiError::Rejected(None)))
    }

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), ApiError> {
        self.sent_feedback.lock().unwrap().push(feedback.clone());
        self.feedback_result.lock().unwrap().clone().unwrap_or(Ok(()))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn token() -> AuthToken {
    AuthToken::new("tok-123")
}

pub fn alice() -> UserProfile {
    UserProfile {
        id: Some("u-alice".into()),
        username: Some("alice".into()),
        email: Some("alice@example.com".into()),
    }
}

pub fn signed_in_session() -> Session {
    Session::signed_in(token(), alice())
}

/// 小さなカタログ:
/// ```text
/// c1 The Hobbit          Tolkien  Fantasy
/// c2 The Silmarillion    Tolkien  Fantasy
/// c3 Hamlet              Shakespeare Drama
/// c4 Dune                Herbert  Science Fiction
/// ```
pub fn small_catalog() -> Vec<Book> {
    vec![
        Book::new("c1", "The Hobbit", "Tolkien", "Fantasy"),
        Book::new("c2", "The Silmarillion", "Tolkien", "Fantasy"),
        Book::new("c3", "Hamlet", "Shakespeare", "Drama"),
        Book::new("c4", "Dune", "Herbert", "Science Fiction"),
    ]
}

/// "Book 1" .. "Book n"、ジャンルは交互。
pub fn numbered_catalog(n: usize) -> Vec<Book> {
    (1..=n)
        .map(|i| {
            let genre = if i % 2 == 0 { "Drama" } else { "Fantasy" };
            Book::new(format!("b{i}"), format!("Book {i}"), "Anon", genre)
        })
        .collect()
}

pub fn user_books() -> Vec<Book> {
    vec![Book::new("u1", "My Notes", "alice", "Memoir")]
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
