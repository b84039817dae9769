use std::sync::{Arc, RwLock};

use tracing::{debug, error, info};

use crate::domain::browser::BookBrowser;
use crate::domain::error::DomainError;
use crate::domain::model::book::{Book, BookDraft, BookPatch};
use crate::domain::model::id::BookId;
use crate::domain::model::session::{AuthToken, Feedback, UserProfile};
use crate::domain::repository::{ApiError, BookApi};

use super::error::{Action, AppError};
use super::generation::{Ticket, ViewGeneration};

/// `refresh` の結果。失敗は空結果＋メッセージとして個別に報告する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub catalog_count: usize,
    pub user_book_count: usize,
    pub catalog_error: Option<String>,
    pub user_books_error: Option<String>,
}

impl RefreshReport {
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.catalog_error
            .as_deref()
            .into_iter()
            .chain(self.user_books_error.as_deref())
    }
}

/// Books画面のユースケース。
/// API呼び出し → 世代確認 → BookBrowserへ反映 のパターンで操作する。
pub struct LibraryService<A: BookApi> {
    api: A,
    browser: Arc<RwLock<BookBrowser>>,
    generation: ViewGeneration,
}

impl<A: BookApi> LibraryService<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            browser: Arc::new(RwLock::new(BookBrowser::new())),
            generation: ViewGeneration::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn generation(&self) -> &ViewGeneration {
        &self.generation
    }

    /// BookBrowserを読み取る。awaitを跨いでロックを保持しないこと。
    pub fn read<T>(&self, f: impl FnOnce(&BookBrowser) -> T) -> Result<T, AppError> {
        let guard = self.browser.read().map_err(|_| AppError::LockPoisoned)?;
        Ok(f(&guard))
    }

    pub fn write<T>(&self, f: impl FnOnce(&mut BookBrowser) -> T) -> Result<T, AppError> {
        let mut guard = self.browser.write().map_err(|_| AppError::LockPoisoned)?;
        Ok(f(&mut guard))
    }

    /// カタログとユーザーBookを並行取得し、両方そろってから反映する。
    /// 途中で画面が替わっていたら何も反映せず `Stale` を返す。
    pub async fn refresh(&self, token: Option<&AuthToken>) -> Result<RefreshReport, AppError> {
        let ticket = self.generation.ticket();
        let (catalog, user_books) = tokio::join!(self.api.fetch_catalog(), self.user_books(token));
        self.ensure_current(ticket)?;

        let mut report = RefreshReport::default();
        let catalog = catalog.unwrap_or_else(|e| {
            error!(error = %e, "failed to fetch catalog");
            report.catalog_error = Some(AppError::Api(e).user_message(Action::FetchCatalog));
            Vec::new()
        });
        let user_books = user_books.unwrap_or_else(|e| {
            error!(error = %e, "failed to fetch user books");
            report.user_books_error = Some(AppError::Api(e).user_message(Action::FetchUserBooks));
            Vec::new()
        });
        report.catalog_count = catalog.len();
        report.user_book_count = user_books.len();

        self.write(|browser| {
            browser.load_catalog(catalog);
            browser.set_user_books(user_books);
        })?;
        info!(
            catalog = report.catalog_count,
            user_books = report.user_book_count,
            "library refreshed"
        );
        Ok(report)
    }

    /// カタログBookの詳細。
    pub async fn book_detail(&self, id: &BookId) -> Result<Book, AppError> {
        let ticket = self.generation.ticket();
        let book = self.api.fetch_book(id).await?;
        self.ensure_current(ticket)?;
        Ok(book)
    }

    /// ユーザーBookの詳細。
    pub async fn user_book_detail(
        &self,
        token: Option<&AuthToken>,
        id: &BookId,
    ) -> Result<Book, AppError> {
        let token = token.ok_or(AppError::NotSignedIn)?;
        let ticket = self.generation.ticket();
        let book = self.api.fetch_user_book(token, id).await?;
        self.ensure_current(ticket)?;
        Ok(book)
    }

    /// Bookを追加する。入力検証はリクエスト前に行う。
    pub async fn add_book(
        &self,
        token: Option<&AuthToken>,
        draft: BookDraft,
    ) -> Result<Book, AppError> {
        let draft = draft.normalized();
        draft.validate()?;
        let token = token.ok_or(AppError::NotSignedIn)?;

        let ticket = self.generation.ticket();
        let book = self.api.create_user_book(token, &draft).await?;
        info!(id = %book.id(), "user book created");
        self.commit_if_current(ticket, |browser| browser.upsert_user_book(book.clone()))?;
        Ok(book)
    }

    /// Bookを更新する（指定フィールドのみ）。
    pub async fn update_book(
        &self,
        token: Option<&AuthToken>,
        id: &BookId,
        patch: BookPatch,
    ) -> Result<Book, AppError> {
        patch.validate()?;
        let token = token.ok_or(AppError::NotSignedIn)?;

        let ticket = self.generation.ticket();
        let book = self.api.update_user_book(token, id, &patch).await?;
        info!(id = %id, "user book updated");
        self.commit_if_current(ticket, |browser| browser.upsert_user_book(book.clone()))?;
        Ok(book)
    }

    /// Bookを削除する。
    pub async fn delete_book(&self, token: Option<&AuthToken>, id: &BookId) -> Result<(), AppError> {
        let token = token.ok_or(AppError::NotSignedIn)?;

        let ticket = self.generation.ticket();
        self.api.delete_user_book(token, id).await?;
        info!(id = %id, "user book deleted");
        self.commit_if_current(ticket, |browser| {
            browser.remove_user_book(id);
        })?;
        Ok(())
    }

    /// フィードバックを送信する。空メッセージは送らない。
    pub async fn submit_feedback(
        &self,
        profile: &UserProfile,
        message: &str,
    ) -> Result<(), AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DomainError::MissingField("feedback message").into());
        }
        let feedback = Feedback::from_profile(profile, message);
        self.api.submit_feedback(&feedback).await?;
        info!("feedback submitted");
        Ok(())
    }

    // --- private ---

    /// トークンが無ければネットワークを使わず空を返す。
    async fn user_books(&self, token: Option<&AuthToken>) -> Result<Vec<Book>, ApiError> {
        match token {
            Some(token) => self.api.fetch_user_books(token).await,
            None => {
                debug!("no token; skipping user books fetch");
                Ok(Vec::new())
            }
        }
    }

    fn ensure_current(&self, ticket: Ticket) -> Result<(), AppError> {
        if self.generation.is_current(ticket) {
            Ok(())
        } else {
            debug!("discarding stale response");
            Err(AppError::Stale)
        }
    }

    /// 変更系は成功を返すが、画面が替わっていれば一覧への反映だけ省く。
    fn commit_if_current(
        &self,
        ticket: Ticket,
        f: impl FnOnce(&mut BookBrowser),
    ) -> Result<(), AppError> {
        if self.generation.is_current(ticket) {
            self.write(f)
        } else {
            debug!("view changed; skipping local list update");
            Ok(())
        }
    }
}
