use std::collections::BTreeSet;

use super::book::Book;
use super::facet::FacetKind;

/// 検索テキストとgenre / authorの選択状態。
///
/// 選択集合が空のときはその属性で絞り込まない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    search: String,
    genres: BTreeSet<String>,
    authors: BTreeSet<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn genres(&self) -> &BTreeSet<String> {
        &self.genres
    }

    pub fn authors(&self) -> &BTreeSet<String> {
        &self.authors
    }

    pub fn selected(&self, kind: FacetKind) -> &BTreeSet<String> {
        match kind {
            FacetKind::Genre => &self.genres,
            FacetKind::Author => &self.authors,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.search.is_empty() && self.genres.is_empty() && self.authors.is_empty()
    }

    // --- 内部操作（BookBrowser経由でのみ呼ばれる） ---

    pub(crate) fn set_search(&mut self, search: String) {
        self.search = search;
    }

    pub(crate) fn selected_mut(&mut self, kind: FacetKind) -> &mut BTreeSet<String> {
        match kind {
            FacetKind::Genre => &mut self.genres,
            FacetKind::Author => &mut self.authors,
        }
    }
}

/// 検索テキストの小文字化を一度だけ行うための述語。
struct Matcher<'a> {
    needle: String,
    state: &'a FilterState,
}

impl<'a> Matcher<'a> {
    fn new(state: &'a FilterState) -> Self {
        Self {
            needle: state.search.to_lowercase(),
            state,
        }
    }

    fn matches(&self, book: &Book) -> bool {
        let matches_search =
            self.needle.is_empty() || book.title().to_lowercase().contains(&self.needle);
        let matches_genre = self.state.genres.is_empty() || self.state.genres.contains(book.genre());
        let matches_author =
            self.state.authors.is_empty() || self.state.authors.contains(book.author());
        matches_search && matches_genre && matches_author
    }
}

/// カタログを絞り込む。入力順を保ち、入力は変更しない。
pub fn apply_filters<'a>(catalog: &'a [Book], state: &FilterState) -> Vec<&'a Book> {
    let matcher = Matcher::new(state);
    catalog.iter().filter(|b| matcher.matches(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Book> {
        vec![
            Book::new("1", "Harry Potter and the Sorcerer's Stone", "J.K. Rowling", "Fantasy"),
            Book::new("2", "1984", "George Orwell", "Dystopia"),
            Book::new("3", "The Hobbit", "J.R.R. Tolkien", "Fantasy"),
            Book::new("4", "Animal Farm", "George Orwell", "Satire"),
        ]
    }

    fn ids(books: &[&Book]) -> Vec<String> {
        books.iter().map(|b| b.id().to_string()).collect()
    }

    #[test]
    fn empty_state_keeps_everything_in_order() {
        let c = catalog();
        let out = apply_filters(&c, &FilterState::new());
        assert_eq!(ids(&out), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let c = catalog();
        let out = apply_filters(&c, &FilterState::new().with_search("harry"));
        assert_eq!(ids(&out), vec!["1"]);

        let out = apply_filters(&c, &FilterState::new().with_search("HOBB"));
        assert_eq!(ids(&out), vec!["3"]);
    }

    #[test]
    fn search_excludes_non_matching_title() {
        let c = catalog();
        let out = apply_filters(&c, &FilterState::new().with_search("harry"));
        assert!(out.iter().all(|b| b.id() != c[1].id()));
    }

    #[test]
    fn genre_set_restricts() {
        let c = catalog();
        let out = apply_filters(&c, &FilterState::new().with_genres(["Fantasy"]));
        assert_eq!(ids(&out), vec!["1", "3"]);
    }

    #[test]
    fn author_set_restricts() {
        let c = catalog();
        let out = apply_filters(&c, &FilterState::new().with_authors(["George Orwell"]));
        assert_eq!(ids(&out), vec!["2", "4"]);
    }

    #[test]
    fn predicates_combine_conjunctively() {
        let c = catalog();
        let state = FilterState::new()
            .with_genres(["Satire", "Fantasy"])
            .with_authors(["George Orwell"])
            .with_search("farm");
        let out = apply_filters(&c, &state);
        assert_eq!(ids(&out), vec!["4"]);
    }

    #[test]
    fn multiple_genres_are_a_union_within_the_facet() {
        let c = catalog();
        let out = apply_filters(&c, &FilterState::new().with_genres(["Dystopia", "Satire"]));
        assert_eq!(ids(&out), vec!["2", "4"]);
    }

    #[test]
    fn input_is_not_mutated() {
        let c = catalog();
        let before = c.clone();
        let _ = apply_filters(&c, &FilterState::new().with_search("the"));
        assert_eq!(c, before);
    }

    #[test]
    fn is_unfiltered() {
        assert!(FilterState::new().is_unfiltered());
        assert!(!FilterState::new().with_search("x").is_unfiltered());
    }
}
