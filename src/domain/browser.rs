use std::collections::BTreeSet;

use super::error::DomainError;
use super::model::book::Book;
use super::model::facet::{FacetKind, Facets};
use super::model::filter::{apply_filters, FilterState};
use super::model::id::BookId;
use super::model::page::{paginate, total_pages, PageState};

/// 表示中ページのスナップショット。
#[derive(Debug)]
pub struct BrowserView<'a> {
    pub books: Vec<&'a Book>,
    pub current_page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
}

impl BrowserView<'_> {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Books画面の状態（集約ルート）。絞り込み・ページ操作はここを経由する。
///
/// facetはカタログ読み込み時に一度だけ計算し、選択状態は常にfacetの部分集合に保つ。
#[derive(Debug, Clone, Default)]
pub struct BookBrowser {
    catalog: Vec<Book>,
    user_books: Vec<Book>,
    facets: Facets,
    filter: FilterState,
    page: PageState,
}

impl BookBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Vec<Book>) -> Self {
        let mut browser = Self::new();
        browser.load_catalog(catalog);
        browser
    }

    pub fn catalog(&self) -> &[Book] {
        &self.catalog
    }

    pub fn user_books(&self) -> &[Book] {
        &self.user_books
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn page(&self) -> PageState {
        self.page
    }

    /// カタログを差し替える。facetを再計算し、消えた選択値を外す。
    /// 選択が変わればページを1に戻し、変わらなければ末尾を越えないよう丸める。
    pub fn load_catalog(&mut self, catalog: Vec<Book>) {
        self.facets = Facets::extract(&catalog);
        self.catalog = catalog;

        let mut pruned = false;
        for kind in [FacetKind::Genre, FacetKind::Author] {
            let available = self.facets.of(kind);
            let selected = self.filter.selected_mut(kind);
            let before = selected.len();
            selected.retain(|v| available.contains(v));
            pruned |= selected.len() != before;
        }

        if pruned {
            self.page.reset();
        } else {
            self.page.clamp(self.total_pages());
        }
    }

    pub fn set_user_books(&mut self, books: Vec<Book>) {
        self.user_books = books;
    }

    pub fn find_catalog_book(&self, id: &BookId) -> Option<&Book> {
        self.catalog.iter().find(|b| b.id() == id)
    }

    pub fn find_user_book(&self, id: &BookId) -> Option<&Book> {
        self.user_books.iter().find(|b| b.id() == id)
    }

    /// 作成・更新後のユーザーBookを反映する（同IDは置換、無ければ末尾に追加）
    pub fn upsert_user_book(&mut self, book: Book) {
        match self.user_books.iter_mut().find(|b| b.id() == book.id()) {
            Some(existing) => *existing = book,
            None => self.user_books.push(book),
        }
    }

    /// 削除したユーザーBookを外す。外したかを返す。
    pub fn remove_user_book(&mut self, id: &BookId) -> bool {
        let before = self.user_books.len();
        self.user_books.retain(|b| b.id() != id);
        self.user_books.len() != before
    }

    // --- Filter transitions ---

    /// 検索テキストを変更する。変化があればページを1に戻す。
    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let search = search.into();
        if self.filter.search() == search {
            return false;
        }
        self.filter.set_search(search);
        self.page.reset();
        true
    }

    /// facet値の選択を切り替える。カタログに無い値の選択はエラー。
    pub fn toggle(&mut self, kind: FacetKind, value: &str) -> Result<bool, DomainError> {
        let selected = !self.filter.selected(kind).contains(value);
        self.select(kind, value, selected)?;
        Ok(selected)
    }

    /// facet値の選択/解除。状態が変わったかを返す。
    pub fn select(
        &mut self,
        kind: FacetKind,
        value: &str,
        selected: bool,
    ) -> Result<bool, DomainError> {
        if selected && !self.facets.contains(kind, value) {
            return Err(DomainError::UnknownFacet {
                kind,
                value: value.to_string(),
            });
        }
        let set = self.filter.selected_mut(kind);
        let changed = if selected {
            set.insert(value.to_string())
        } else {
            set.remove(value)
        };
        if changed {
            self.page.reset();
        }
        Ok(changed)
    }

    /// 選択集合を丸ごと置き換える。1つでも未知の値があれば何も変えない。
    pub fn set_selection<I, S>(&mut self, kind: FacetKind, values: I) -> Result<bool, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if let Some(unknown) = values.iter().find(|v| !self.facets.contains(kind, v)) {
            return Err(DomainError::UnknownFacet {
                kind,
                value: unknown.clone(),
            });
        }
        let set = self.filter.selected_mut(kind);
        if *set == values {
            return Ok(false);
        }
        *set = values;
        self.page.reset();
        Ok(true)
    }

    /// 置き換えとトグルをまとめて1回の変更として適用する。
    /// どちらかが失敗したら選択もページも変えない。
    pub fn edit_selection(
        &mut self,
        kind: FacetKind,
        replace: Option<Vec<String>>,
        toggle: Option<&str>,
    ) -> Result<bool, DomainError> {
        let mut target: BTreeSet<String> = match replace {
            Some(values) => values.into_iter().collect(),
            None => self.filter.selected(kind).clone(),
        };
        if let Some(value) = toggle {
            if !target.remove(value) {
                target.insert(value.to_string());
            }
        }
        self.set_selection(kind, target)
    }

    /// 検索・選択をすべて解除する。
    pub fn clear_filters(&mut self) -> bool {
        if self.filter.is_unfiltered() {
            return false;
        }
        self.filter = FilterState::new();
        self.page.reset();
        true
    }

    // --- Page transitions ---

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered().len())
    }

    pub fn next_page(&mut self) -> bool {
        let total = self.total_pages();
        self.page.next(total)
    }

    pub fn previous_page(&mut self) -> bool {
        self.page.previous()
    }

    pub fn go_to_page(&mut self, page: usize) -> Result<(), DomainError> {
        let total = self.total_pages();
        self.page.go_to(page, total)
    }

    // --- Queries ---

    pub fn filtered(&self) -> Vec<&Book> {
        apply_filters(&self.catalog, &self.filter)
    }

    /// 現在ページに表示するBook一覧。
    pub fn view(&self) -> BrowserView<'_> {
        let filtered = self.filtered();
        let page = paginate(&filtered, self.page.current());
        BrowserView {
            books: page.visible.to_vec(),
            current_page: self.page.current(),
            total_pages: page.total_pages,
            filtered_count: filtered.len(),
        }
    }
}
