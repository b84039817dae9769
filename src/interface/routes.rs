//! パス → 画面の対応表とルートガード。
//!
//! パスは大文字小文字を区別せず、末尾の `/` は無視する。

use crate::domain::model::id::BookId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Landing,
    SignIn,
    SignUp,
    Books,
    BookDetail(BookId),
    UserBookDetail(BookId),
    AddBook,
    About,
    Feedback,
    NotFound(String),
}

/// ルートの公開範囲。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// 誰でも表示できる
    Open,
    /// 未ログイン時のみ（ログイン済みならHomeへ）
    PublicOnly,
    /// ログイン必須
    Guarded,
}

/// ガード適用後の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render(Route),
    Redirect(Route),
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim();
        let normalized = trimmed.trim_end_matches('/');
        let segments: Vec<&str> = normalized
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let lower: Vec<String> = segments.iter().map(|s| s.to_ascii_lowercase()).collect();
        let lower: Vec<&str> = lower.iter().map(String::as_str).collect();

        match lower.as_slice() {
            [] => Route::Home,
            ["landingpage"] => Route::Landing,
            ["signin"] => Route::SignIn,
            ["signup"] => Route::SignUp,
            ["bookspage"] => Route::Books,
            ["books", _] => Route::BookDetail(BookId::new(segments[1])),
            ["user-books", _] => Route::UserBookDetail(BookId::new(segments[1])),
            ["add-book"] => Route::AddBook,
            ["about"] => Route::About,
            ["feedback"] => Route::Feedback,
            _ => Route::NotFound(trimmed.to_string()),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Landing | Route::SignIn | Route::SignUp => Access::PublicOnly,
            Route::Feedback | Route::NotFound(_) => Access::Open,
            _ => Access::Guarded,
        }
    }

    /// 正規形のパス
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Landing => "/LandingPage".to_string(),
            Route::SignIn => "/signin".to_string(),
            Route::SignUp => "/signup".to_string(),
            Route::Books => "/BooksPage".to_string(),
            Route::BookDetail(id) => format!("/books/{id}"),
            Route::UserBookDetail(id) => format!("/user-books/{id}"),
            Route::AddBook => "/add-book".to_string(),
            Route::About => "/about".to_string(),
            Route::Feedback => "/feedback".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    /// ログイン状態でガードを適用する。
    pub fn resolve(self, authenticated: bool) -> Resolution {
        match (self.access(), authenticated) {
            (Access::Guarded, false) => match self {
                Route::Home => Resolution::Redirect(Route::Landing),
                _ => Resolution::Redirect(Route::SignIn),
            },
            (Access::PublicOnly, true) => Resolution::Redirect(Route::Home),
            _ => Resolution::Render(self),
        }
    }
}
