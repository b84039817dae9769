use super::model::facet::FacetKind;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{kind} '{value}' is not present in the loaded catalog")]
    UnknownFacet { kind: FacetKind, value: String },

    #[error("page {requested} out of range (1-{total})")]
    PageOutOfRange { requested: usize, total: usize },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("nothing to update: specify at least one field")]
    EmptyPatch,
}
