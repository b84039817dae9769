use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::BookId;
use crate::domain::error::DomainError;

/// カバー画像が無いBookに使うプレースホルダー。
pub const DEFAULT_COVER_IMAGE: &str = "/default-book.png";

/// Bookの出自。カタログ（読み取り専用）かユーザー所有か。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Catalog,
    User,
}

impl Provenance {
    /// 詳細ページへのリンクプレフィックス
    pub fn link_prefix(self) -> &'static str {
        match self {
            Provenance::Catalog => "/books",
            Provenance::User => "/user-books",
        }
    }

    pub fn is_mutable(self) -> bool {
        matches!(self, Provenance::User)
    }
}

/// APIから受け取るBookレコード。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    id: BookId,
    title: String,
    author: String,
    genre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    published_date: Option<NaiveDate>,
}

impl Book {
    pub fn new(
        id: impl Into<BookId>,
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            image: None,
            description: None,
            published_date: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_published_date(mut self, date: NaiveDate) -> Self {
        self.published_date = Some(date);
        self
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn genre(&self) -> &str {
        &self.genre
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// 空文字のimageもプレースホルダー扱い。
    pub fn cover_or_default(&self) -> &str {
        match self.image.as_deref() {
            Some(img) if !img.trim().is_empty() => img,
            _ => DEFAULT_COVER_IMAGE,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn published_date(&self) -> Option<NaiveDate> {
        self.published_date
    }
}

/// `YYYY-MM-DD` と RFC 3339 タイムスタンプの両方を受け付け、日付部分だけを残す。
/// 解釈できない値はNoneにする。
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Add-Bookフォームの入力。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub genre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<NaiveDate>,
}

impl BookDraft {
    /// 必須項目（title / author / genre）が空でないことを検証する。
    pub fn validate(&self) -> Result<(), DomainError> {
        require("title", &self.title)?;
        require("author", &self.author)?;
        require("genre", &self.genre)?;
        Ok(())
    }

    /// 前後の空白を除去し、空の任意項目をNoneに落とす。
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            genre: self.genre.trim().to_string(),
            image: non_blank(self.image),
            description: non_blank(self.description),
            published_date: self.published_date,
        }
    }
}

/// Editフォームの入力（Noneのフィールドは変更しない）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<NaiveDate>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.genre.is_none()
            && self.image.is_none()
            && self.description.is_none()
            && self.published_date.is_none()
    }

    /// 必須項目を空文字で上書きしようとしていないか検証する。
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::EmptyPatch);
        }
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        if let Some(author) = &self.author {
            require("author", author)?;
        }
        if let Some(genre) = &self.genre {
            require("genre", genre)?;
        }
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingField(field));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
