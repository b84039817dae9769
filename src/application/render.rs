//! View Layer: 状態をMarkdownテキストに描画する純粋関数群。

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::domain::browser::{BookBrowser, BrowserView};
use crate::domain::model::book::{Book, Provenance};
use crate::domain::model::session::UserProfile;

/// 一覧用の1行カード。`n` は通し番号。
pub fn book_card(n: usize, book: &Book, provenance: Provenance) -> String {
    format!(
        "{n}. **{}** by {} · {} (cover: {}) → {}/{}",
        book.title(),
        book.author(),
        book.genre(),
        book.cover_or_default(),
        provenance.link_prefix(),
        book.id()
    )
}

/// Books画面全体（プロフィール・フィルタ・結果・ページ送り・ユーザーBook）。
pub fn books_page(browser: &BookBrowser, profile: &UserProfile) -> String {
    let view = browser.view();
    let mut out = String::from("# Books\n\n");

    out.push_str(&profile_card(profile));
    out.push('\n');
    out.push_str(&filters(browser));
    out.push('\n');
    out.push_str(&results(&view));

    if !browser.user_books().is_empty() {
        out.push_str("\n## User Added Books\n\n");
        for (i, book) in browser.user_books().iter().enumerate() {
            let _ = writeln!(out, "{}", book_card(i + 1, book, Provenance::User));
        }
    }
    out
}

pub fn profile_card(profile: &UserProfile) -> String {
    format!(
        "## Profile\n\n[{}] {}\n{}\nBook lover and expert manager\n",
        profile.avatar_initial(),
        profile.display_name(),
        profile.display_email()
    )
}

fn filters(browser: &BookBrowser) -> String {
    let filter = browser.filter();
    let facets = browser.facets();
    let search = if filter.search().is_empty() {
        "(none)".to_string()
    } else {
        format!("\"{}\"", filter.search())
    };
    format!(
        "## Filters\n\nSearch: {}\nGenres: {}\nAuthors: {}\n",
        search,
        checklist(facets.genres(), filter.genres()),
        checklist(facets.authors(), filter.authors())
    )
}

fn checklist(available: &BTreeSet<String>, selected: &BTreeSet<String>) -> String {
    if available.is_empty() {
        return "(none)".to_string();
    }
    available
        .iter()
        .map(|v| {
            let mark = if selected.contains(v) { "x" } else { " " };
            format!("[{mark}] {v}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn results(view: &BrowserView<'_>) -> String {
    let mut out = format!("## Results ({} matching)\n\n", view.filtered_count);
    if view.books.is_empty() {
        out.push_str("No books found.\n");
    } else {
        let offset = (view.current_page - 1) * crate::domain::model::page::PAGE_SIZE;
        for (i, book) in view.books.iter().enumerate() {
            let _ = writeln!(out, "{}", book_card(offset + i + 1, book, Provenance::Catalog));
        }
    }
    if let Some(footer) = pagination(view) {
        out.push('\n');
        out.push_str(&footer);
        out.push('\n');
    }
    out
}

/// 2ページ以上のときだけページ送りを出す。
pub fn pagination(view: &BrowserView<'_>) -> Option<String> {
    if view.total_pages <= 1 {
        return None;
    }
    let previous = if view.has_previous() { "‹ Previous" } else { "(‹ Previous)" };
    let next = if view.has_next() { "Next ›" } else { "(Next ›)" };
    Some(format!(
        "{previous} | Page {} of {} | {next}",
        view.current_page, view.total_pages
    ))
}

/// 詳細ページ。ユーザーBookには編集・削除の案内を付ける。
pub fn book_detail(book: &Book, provenance: Provenance) -> String {
    let published = book
        .published_date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let mut out = format!(
        "# {}\n\n![{}]({})\n\n- Author: {}\n- Genre: {}\n- Published Date: {}\n- Description: {}\n",
        book.title(),
        book.title(),
        book.cover_or_default(),
        book.author(),
        book.genre(),
        published,
        book.description().unwrap_or("(none)")
    );
    let _ = write!(out, "\nPath: {}/{}\n", provenance.link_prefix(), book.id());
    if provenance.is_mutable() {
        let _ = write!(
            out,
            "\nThis book is yours: use `edit_book` or `delete_book` with id `{}`.\n",
            book.id()
        );
    }
    out
}

pub fn home_page(profile: &UserProfile) -> String {
    format!(
        "# Welcome back, {}\n\nDiscover, organize, and track your reading.\n\n\
         - Browse the catalog: `navigate` to `/BooksPage`\n\
         - Add a book: `/add-book`\n\
         - About: `/about`\n\
         - Send feedback: `/feedback`\n",
        profile.display_name()
    )
}

pub fn landing_page() -> String {
    "# BookFlow\n\nYour personal library, organized.\n\n\
     - Sign in: `/signin`\n\
     - Create an account: `/signup`\n"
        .to_string()
}

pub fn about_page() -> String {
    "# About BookFlow\n\nBookFlow keeps a shared catalog of books alongside the books you add yourself. \
     Search by title, narrow by genre and author, and keep your own entries up to date.\n"
        .to_string()
}

pub fn sign_in_form() -> String {
    "# Sign In\n\nUse `sign_in` with `username` and `password`. New here? Go to `/signup`.\n".to_string()
}

pub fn sign_up_form() -> String {
    "# Sign Up\n\nUse `sign_up` with `username`, `email`, and `password`. Already registered? Go to `/signin`.\n"
        .to_string()
}

pub fn add_book_form() -> String {
    "# Add a Book\n\nUse `add_book` with `title`, `author`, `genre` (required) and optional \
     `image`, `description`, `published_date` (YYYY-MM-DD).\n"
        .to_string()
}

pub fn feedback_form() -> String {
    "# Feedback\n\nUse `feedback` with your `message`.\n".to_string()
}

pub fn not_found(path: &str) -> String {
    format!("# 404 Not Found\n\nNo page at `{path}`.\n")
}
