//! MCP Server for bookflow-mcp
//!
//! MCP Protocol (stdio) <-> application::LibraryService / SessionService
//!
//! 11 tools: navigate, sign_in, sign_up, sign_out, search, filter, page,
//! add_book, edit_book, delete_book, feedback

use std::sync::Arc;

use chrono::NaiveDate;
use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::routes::{Resolution, Route};
use crate::application::error::{Action, AppError};
use crate::application::library::LibraryService;
use crate::application::render;
use crate::application::session::SessionService;
use crate::config::Settings;
use crate::domain::model::book::{parse_date, BookDraft, BookPatch, Provenance};
use crate::domain::model::facet::FacetKind;
use crate::domain::model::id::BookId;
use crate::domain::model::session::{Credentials, Registration, Session};
use crate::infra::http_api::HttpBookApi;
use crate::infra::json_store::JsonSessionStore;

// =============================================================================
// Public entry point
// =============================================================================

/// MCP Serverを起動する。
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let server = BookflowMcpServer::new(&settings)?;
    info!(
        api = %settings.api.base_url,
        session = %settings.session.path.display(),
        "starting bookflow-mcp"
    );
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

// =============================================================================
// MCP Server
// =============================================================================

#[derive(Clone)]
struct BookflowMcpServer {
    library: Arc<LibraryService<HttpBookApi>>,
    session: Arc<SessionService<JsonSessionStore>>,
    tool_router: ToolRouter<Self>,
}

impl BookflowMcpServer {
    fn new(settings: &Settings) -> anyhow::Result<Self> {
        let api = HttpBookApi::new(&settings.api)?;
        let store = JsonSessionStore::new(settings.session.path.clone());
        Ok(Self::with_parts(api, store))
    }

    fn with_parts(api: HttpBookApi, store: JsonSessionStore) -> Self {
        Self {
            library: Arc::new(LibraryService::new(api)),
            session: Arc::new(SessionService::new(store)),
            tool_router: Self::tool_router(),
        }
    }

    /// 失敗を画面内メッセージとして返す。サーバー側のエラーにはしない。
    fn failure(e: AppError, action: Action) -> CallToolResult {
        CallToolResult::error(vec![Content::text(e.user_message(action))])
    }

    fn internal(e: AppError) -> McpError {
        McpError::internal_error(format!("{e}"), None)
    }

    /// ログイン必須の操作用。セッションは毎回読み直す。
    fn guarded_session(&self) -> Result<Session, McpError> {
        let session = self.session.snapshot_or_anonymous();
        if !session.is_authenticated() {
            return Err(McpError::invalid_params(
                "Not signed in. Use `sign_in` (or `sign_up`) first.",
                None,
            ));
        }
        Ok(session)
    }

    /// Books画面を現在の状態で描画する。
    fn books_view(&self, session: &Session, notices: &[String]) -> Result<String, McpError> {
        let profile = session.profile();
        let page = self
            .library
            .read(|browser| render::books_page(browser, &profile))
            .map_err(Self::internal)?;
        Ok(with_notices(notices, page))
    }

    /// ガード適用済みルートを描画する。取得失敗は画面内メッセージにする。
    async fn render_route(&self, route: &Route, session: &Session) -> Result<String, McpError> {
        let token = session.token();
        let text = match route {
            Route::Home => render::home_page(&session.profile()),
            Route::Landing => render::landing_page(),
            Route::SignIn => render::sign_in_form(),
            Route::SignUp => render::sign_up_form(),
            Route::About => render::about_page(),
            Route::AddBook => render::add_book_form(),
            Route::Feedback => render::feedback_form(),
            Route::NotFound(path) => render::not_found(path),
            Route::Books => match self.library.refresh(token).await {
                Ok(report) => {
                    let notices: Vec<String> = report.messages().map(String::from).collect();
                    self.books_view(session, &notices)?
                }
                Err(e) => e.user_message(Action::FetchCatalog),
            },
            Route::BookDetail(id) => match self.library.book_detail(id).await {
                Ok(book) => render::book_detail(&book, Provenance::Catalog),
                Err(e) => e.user_message(Action::FetchBook),
            },
            Route::UserBookDetail(id) => match self.library.user_book_detail(token, id).await {
                Ok(book) => render::book_detail(&book, Provenance::User),
                Err(e) => e.user_message(Action::FetchUserBook),
            },
        };
        Ok(text)
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for BookflowMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bookflow-mcp".to_string(),
                title: Some("BookFlow Book Catalog Client".to_string()),
                description: Some(
                    "Browse the shared BookFlow catalog, filter by title, genre and author, \
                     and manage the books you added."
                        .to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Client for the BookFlow book catalog.\n\
                 \n\
                 Start with `navigate` to '/' (or `sign_in`). Open the catalog with `navigate` to '/BooksPage', \
                 then narrow it with `search` / `filter` and move through results with `page`.\n\
                 \n\
                 Your own books: `add_book`, `navigate` to '/user-books/<id>', `edit_book`, `delete_book`. \
                 `feedback` sends a message to the maintainers."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

fn parse_facet_kind(s: &str) -> Result<FacetKind, McpError> {
    match s {
        "genre" => Ok(FacetKind::Genre),
        "author" => Ok(FacetKind::Author),
        other => Err(McpError::invalid_params(
            format!("Unknown facet: '{other}'. Use: genre, author"),
            None,
        )),
    }
}

/// 空文字は未指定扱い。
fn parse_published_date(s: Option<&str>) -> Result<Option<NaiveDate>, McpError> {
    match s.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_date(raw).map(Some).ok_or_else(|| {
            McpError::invalid_params(
                format!("Invalid published_date: '{raw}'. Use YYYY-MM-DD"),
                None,
            )
        }),
    }
}

fn validate_book_id(id: &str) -> Result<BookId, McpError> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') {
        return Err(McpError::invalid_params(
            "id must be a non-empty book ID without '/'",
            None,
        ));
    }
    Ok(BookId::new(id))
}

fn with_notices(notices: &[String], body: String) -> String {
    if notices.is_empty() {
        return body;
    }
    let mut out: String = notices.iter().map(|n| format!("> {n}\n")).collect();
    out.push('\n');
    out.push_str(&body);
    out
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpNavigateRequest {
    #[schemars(
        description = "Path to open, e.g. '/', '/BooksPage', '/books/<id>', '/user-books/<id>', '/add-book', '/about', '/feedback', '/signin', '/signup'"
    )]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpSignInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpSignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpSignOutRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpSearchRequest {
    #[schemars(description = "Case-insensitive title substring. Empty string clears the search.")]
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpFilterRequest {
    #[schemars(description = "Facet to change: 'genre' or 'author'. Omit with clear=true.")]
    pub facet: Option<String>,
    #[schemars(
        description = "Replace the selection with these values (empty list = no restriction). Values must appear in the Filters list."
    )]
    pub values: Option<Vec<String>>,
    #[schemars(description = "Toggle a single value on/off")]
    pub toggle: Option<String>,
    #[schemars(description = "Clear search text and all selections (default: false)")]
    #[serde(default)]
    pub clear: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpPageRequest {
    #[schemars(description = "Action: 'next', 'previous', or 'goto'")]
    pub action: String,
    #[schemars(description = "Target page (1-based). Required for 'goto'.")]
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpAddBookRequest {
    #[schemars(description = "Book title (required)")]
    pub title: String,
    #[schemars(description = "Author (required)")]
    pub author: String,
    #[schemars(description = "Genre (required)")]
    pub genre: String,
    #[schemars(description = "Cover image URL")]
    pub image: Option<String>,
    pub description: Option<String>,
    #[schemars(description = "Published date, YYYY-MM-DD")]
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpEditBookRequest {
    #[schemars(description = "ID of one of your books (from the User Added Books list)")]
    pub id: String,
    #[schemars(description = "New title (omit to keep current)")]
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    #[schemars(description = "New published date, YYYY-MM-DD")]
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpDeleteBookRequest {
    #[schemars(description = "ID of one of your books")]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpFeedbackRequest {
    pub message: String,
}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl BookflowMcpServer {
    #[tool(
        name = "navigate",
        description = "Open a page by path. Guarded pages redirect to '/signin' (or '/LandingPage' for '/') when signed out; '/signin' and '/signup' redirect to '/' when signed in. '/BooksPage' reloads the catalog and your books.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn navigate(
        &self,
        Parameters(req): Parameters<McpNavigateRequest>,
    ) -> Result<CallToolResult, McpError> {
        // 新しい画面に入るので、以前の画面の応答は反映させない
        self.library.generation().advance();
        let session = self.session.snapshot_or_anonymous();

        let (route, redirected) = match Route::parse(&req.path).resolve(session.is_authenticated()) {
            Resolution::Render(route) => (route, false),
            Resolution::Redirect(route) => (route, true),
        };

        let body = self.render_route(&route, &session).await?;
        let text = if redirected {
            format!("Redirected to {}\n\n{}", route.path(), body)
        } else {
            body
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "sign_in",
        description = "Sign in with username and password. Stores the session for later calls.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn sign_in(
        &self,
        Parameters(req): Parameters<McpSignInRequest>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = Credentials {
            username: req.username,
            password: req.password,
        };
        match self.session.sign_in(self.library.api(), &credentials).await {
            Ok(session) => {
                // 旧セッションで始めた取得は反映させない
                self.library.generation().advance();
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "{}\n\n{}",
                    Action::SignIn.success_message(),
                    render::home_page(&session.profile())
                ))]))
            }
            Err(e) => Ok(Self::failure(e, Action::SignIn)),
        }
    }

    #[tool(
        name = "sign_up",
        description = "Create an account (username, email, password) and sign in.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn sign_up(
        &self,
        Parameters(req): Parameters<McpSignUpRequest>,
    ) -> Result<CallToolResult, McpError> {
        let registration = Registration {
            username: req.username,
            email: req.email,
            password: req.password,
        };
        match self.session.sign_up(self.library.api(), &registration).await {
            Ok(session) => {
                // 旧セッションで始めた取得は反映させない
                self.library.generation().advance();
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "{}\n\n{}",
                    Action::SignUp.success_message(),
                    render::home_page(&session.profile())
                ))]))
            }
            Err(e) => Ok(Self::failure(e, Action::SignUp)),
        }
    }

    #[tool(
        name = "sign_out",
        description = "Sign out and forget the stored session.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn sign_out(
        &self,
        Parameters(_req): Parameters<McpSignOutRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.library.generation().advance();
        match self.session.sign_out() {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(format!(
                "{}\n\n{}",
                Action::SignOut.success_message(),
                render::landing_page()
            ))])),
            Err(e) => Ok(Self::failure(e, Action::SignOut)),
        }
    }

    #[tool(
        name = "search",
        description = "Filter the loaded catalog by title (case-insensitive substring). Resets to page 1. Open '/BooksPage' first to load the catalog.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn search(
        &self,
        Parameters(req): Parameters<McpSearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session = self.guarded_session()?;
        self.library
            .write(|browser| browser.set_search(req.text))
            .map_err(Self::internal)?;
        let text = self.books_view(&session, &[])?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "filter",
        description = "Restrict results by genre or author. Replace a selection with `values`, flip one value with `toggle`, or reset everything with clear=true. Any change returns to page 1.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn filter(
        &self,
        Parameters(req): Parameters<McpFilterRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session = self.guarded_session()?;

        if req.clear {
            self.library
                .write(|browser| browser.clear_filters())
                .map_err(Self::internal)?;
            let text = self.books_view(&session, &[])?;
            return Ok(CallToolResult::success(vec![Content::text(text)]));
        }

        let kind = req
            .facet
            .as_deref()
            .ok_or_else(|| {
                McpError::invalid_params("facet is required unless clear=true", None)
            })
            .and_then(parse_facet_kind)?;

        let result = self
            .library
            .write(|browser| browser.edit_selection(kind, req.values, req.toggle.as_deref()))
            .map_err(Self::internal)?;

        if let Err(e) = result {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        let text = self.books_view(&session, &[])?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "page",
        description = "Move through result pages: 'next', 'previous', or 'goto' with page. At the first/last page, next/previous do nothing.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn page(
        &self,
        Parameters(req): Parameters<McpPageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session = self.guarded_session()?;

        let notice = match req.action.as_str() {
            "next" => {
                let moved = self
                    .library
                    .write(|browser| browser.next_page())
                    .map_err(Self::internal)?;
                (!moved).then(|| "Already on the last page.".to_string())
            }
            "previous" => {
                let moved = self
                    .library
                    .write(|browser| browser.previous_page())
                    .map_err(Self::internal)?;
                (!moved).then(|| "Already on the first page.".to_string())
            }
            "goto" => {
                let page = req.page.ok_or_else(|| {
                    McpError::invalid_params("page is required for 'goto'", None)
                })?;
                self.library
                    .write(|browser| browser.go_to_page(page))
                    .map_err(Self::internal)?
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                None
            }
            other => {
                return Err(McpError::invalid_params(
                    format!("Unknown action: '{other}'. Use: next, previous, goto"),
                    None,
                ))
            }
        };

        let notices: Vec<String> = notice.into_iter().collect();
        let text = self.books_view(&session, &notices)?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "add_book",
        description = "Add a book to your collection. title, author and genre are required.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn add_book(
        &self,
        Parameters(req): Parameters<McpAddBookRequest>,
    ) -> Result<CallToolResult, McpError> {
        let draft = BookDraft {
            title: req.title,
            author: req.author,
            genre: req.genre,
            image: req.image,
            description: req.description,
            published_date: parse_published_date(req.published_date.as_deref())?,
        };
        let token = self.session.token();
        match self.library.add_book(token.as_ref(), draft).await {
            Ok(book) => Ok(CallToolResult::success(vec![Content::text(format!(
                "{} You can find it under User Added Books in '/BooksPage'.\n\n{}",
                Action::AddBook.success_message(),
                render::book_card(1, &book, Provenance::User)
            ))])),
            Err(e) => Ok(Self::failure(e, Action::AddBook)),
        }
    }

    #[tool(
        name = "edit_book",
        description = "Edit one of your books. Only the specified fields are changed.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn edit_book(
        &self,
        Parameters(req): Parameters<McpEditBookRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = validate_book_id(&req.id)?;
        let patch = BookPatch {
            title: req.title,
            author: req.author,
            genre: req.genre,
            image: req.image,
            description: req.description,
            published_date: parse_published_date(req.published_date.as_deref())?,
        };
        let token = self.session.token();
        match self.library.update_book(token.as_ref(), &id, patch).await {
            Ok(book) => Ok(CallToolResult::success(vec![Content::text(format!(
                "{}\n\n{}",
                Action::UpdateBook.success_message(),
                render::book_detail(&book, Provenance::User)
            ))])),
            Err(e) => Ok(Self::failure(e, Action::UpdateBook)),
        }
    }

    #[tool(
        name = "delete_book",
        description = "Delete one of your books.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn delete_book(
        &self,
        Parameters(req): Parameters<McpDeleteBookRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = validate_book_id(&req.id)?;
        let token = self.session.token();
        match self.library.delete_book(token.as_ref(), &id).await {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(format!(
                "{} Open '/BooksPage' to see your remaining books.",
                Action::DeleteBook.success_message()
            ))])),
            Err(e) => Ok(Self::failure(e, Action::DeleteBook)),
        }
    }

    #[tool(
        name = "feedback",
        description = "Send feedback to the BookFlow maintainers. Sent as 'Anonymous' when signed out.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn feedback(
        &self,
        Parameters(req): Parameters<McpFeedbackRequest>,
    ) -> Result<CallToolResult, McpError> {
        let profile = self.session.snapshot_or_anonymous().profile();
        match self.library.submit_feedback(&profile, &req.message).await {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(
                Action::Feedback.success_message(),
            )])),
            Err(e) => Ok(Self::failure(e, Action::Feedback)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
