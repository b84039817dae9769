use std::collections::BTreeSet;
use std::fmt;

use super::book::Book;

/// 絞り込み対象の属性。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    Genre,
    Author,
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetKind::Genre => write!(f, "genre"),
            FacetKind::Author => write!(f, "author"),
        }
    }
}

/// カタログから導出したgenre / authorの重複なし集合。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    genres: BTreeSet<String>,
    authors: BTreeSet<String>,
}

impl Facets {
    /// カタログを一度走査して集合を作る。
    pub fn extract(catalog: &[Book]) -> Self {
        let mut facets = Self::default();
        for book in catalog {
            if !facets.genres.contains(book.genre()) {
                facets.genres.insert(book.genre().to_string());
            }
            if !facets.authors.contains(book.author()) {
                facets.authors.insert(book.author().to_string());
            }
        }
        facets
    }

    pub fn genres(&self) -> &BTreeSet<String> {
        &self.genres
    }

    pub fn authors(&self) -> &BTreeSet<String> {
        &self.authors
    }

    pub fn of(&self, kind: FacetKind) -> &BTreeSet<String> {
        match kind {
            FacetKind::Genre => &self.genres,
            FacetKind::Author => &self.authors,
        }
    }

    pub fn contains(&self, kind: FacetKind, value: &str) -> bool {
        self.of(kind).contains(value)
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.authors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, author: &str, genre: &str) -> Book {
        Book::new(id, format!("Title {id}"), author, genre)
    }

    #[test]
    fn duplicate_genres_collapse() {
        let catalog = vec![
            book("1", "A", "Fantasy"),
            book("2", "B", "Fantasy"),
            book("3", "C", "Drama"),
        ];
        let facets = Facets::extract(&catalog);
        let genres: Vec<&str> = facets.genres().iter().map(String::as_str).collect();
        assert_eq!(genres, vec!["Drama", "Fantasy"]);
        assert_eq!(facets.authors().len(), 3);
    }

    #[test]
    fn empty_catalog_yields_empty_facets() {
        let facets = Facets::extract(&[]);
        assert!(facets.is_empty());
    }

    #[test]
    fn contains_by_kind() {
        let facets = Facets::extract(&[book("1", "Tolkien", "Fantasy")]);
        assert!(facets.contains(FacetKind::Genre, "Fantasy"));
        assert!(facets.contains(FacetKind::Author, "Tolkien"));
        assert!(!facets.contains(FacetKind::Genre, "Tolkien"));
    }

    #[test]
    fn facet_kind_display() {
        assert_eq!(FacetKind::Genre.to_string(), "genre");
        assert_eq!(FacetKind::Author.to_string(), "author");
    }
}
