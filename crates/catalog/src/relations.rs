//! Existence checks for the entities a video refers to.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Either, NotFoundError, Notification};
use domain::{CastMemberId, CategoryId, GenreId};
use tokio::sync::RwLock;

/// Identifier of an entity owned by another bounded context.
pub trait RelatedId: Copy + Eq + Hash + Display + Send + Sync + 'static {
    /// Entity name used in not-found messages.
    const ENTITY: &'static str;
    /// Input field the ids arrive in.
    const FIELD: &'static str;
}

impl RelatedId for CategoryId {
    const ENTITY: &'static str = CategoryId::ENTITY;
    const FIELD: &'static str = "category_ids";
}

impl RelatedId for GenreId {
    const ENTITY: &'static str = GenreId::ENTITY;
    const FIELD: &'static str = "genre_ids";
}

impl RelatedId for CastMemberId {
    const ENTITY: &'static str = CastMemberId::ENTITY;
    const FIELD: &'static str = "cast_member_ids";
}

/// Looks up whether referenced entities exist.
#[async_trait]
pub trait RelatedEntityRepository<Id: RelatedId>: Send + Sync {
    /// Returns `ids` when all exist, otherwise one error per missing id.
    async fn exists_by_ids(&self, ids: &[Id]) -> Either<Vec<Id>, Vec<NotFoundError>>;
}

/// In-memory set of known ids.
#[derive(Clone)]
pub struct InMemoryRelatedEntityRepository<Id> {
    known: Arc<RwLock<HashSet<Id>>>,
}

impl<Id: RelatedId> InMemoryRelatedEntityRepository<Id> {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self {
            known: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Records `id` as existing.
    pub async fn insert(&self, id: Id) {
        self.known.write().await.insert(id);
    }

    /// Records every id in `ids` as existing.
    pub async fn insert_many(&self, ids: impl IntoIterator<Item = Id>) {
        self.known.write().await.extend(ids);
    }
}

impl<Id: RelatedId> Default for InMemoryRelatedEntityRepository<Id> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Id: RelatedId> RelatedEntityRepository<Id> for InMemoryRelatedEntityRepository<Id> {
    async fn exists_by_ids(&self, ids: &[Id]) -> Either<Vec<Id>, Vec<NotFoundError>> {
        let known = self.known.read().await;
        Either::ok(ids.to_vec()).chain_each(|id| {
            if known.contains(&id) {
                Either::ok(id)
            } else {
                Either::fail(NotFoundError::new(id, Id::ENTITY))
            }
        })
    }
}

/// Checks the ids of one relation and reports missing ones under the
/// relation's input field.
pub async fn validate_related_ids<Id: RelatedId>(
    repository: &dyn RelatedEntityRepository<Id>,
    ids: &[Id],
) -> Either<Vec<Id>, Notification> {
    repository.exists_by_ids(ids).await.map_err(|errors| {
        errors.iter().fold(Notification::new(), |notification, error| {
            notification.with_error(error.to_string(), Some(Id::FIELD))
        })
    })
}

/// Validates every relation of a video at once.
#[derive(Clone)]
pub struct VideoRelationsValidator {
    categories: Arc<dyn RelatedEntityRepository<CategoryId>>,
    genres: Arc<dyn RelatedEntityRepository<GenreId>>,
    cast_members: Arc<dyn RelatedEntityRepository<CastMemberId>>,
}

impl VideoRelationsValidator {
    pub fn new(
        categories: Arc<dyn RelatedEntityRepository<CategoryId>>,
        genres: Arc<dyn RelatedEntityRepository<GenreId>>,
        cast_members: Arc<dyn RelatedEntityRepository<CastMemberId>>,
    ) -> Self {
        Self {
            categories,
            genres,
            cast_members,
        }
    }

    /// Returns a notification with every missing id; empty when all exist.
    pub async fn validate(
        &self,
        category_ids: &[CategoryId],
        genre_ids: &[GenreId],
        cast_member_ids: &[CastMemberId],
    ) -> Notification {
        let mut notification = Notification::new();
        let (_, errors) = validate_related_ids(self.categories.as_ref(), category_ids)
            .await
            .into_pair();
        notification.copy_errors(&errors.unwrap_or_default());
        let (_, errors) = validate_related_ids(self.genres.as_ref(), genre_ids)
            .await
            .into_pair();
        notification.copy_errors(&errors.unwrap_or_default());
        let (_, errors) = validate_related_ids(self.cast_members.as_ref(), cast_member_ids)
            .await
            .into_pair();
        notification.copy_errors(&errors.unwrap_or_default());
        notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_known_ids_pass() {
        let repository = InMemoryRelatedEntityRepository::new();
        let ids = [CategoryId::new(), CategoryId::new()];
        repository.insert_many(ids).await;

        let result = repository.exists_by_ids(&ids).await;
        assert_eq!(result, Either::ok(ids.to_vec()));
    }

    #[tokio::test]
    async fn every_missing_id_is_reported() {
        let repository = InMemoryRelatedEntityRepository::new();
        let known = GenreId::new();
        repository.insert(known).await;
        let missing = [GenreId::new(), GenreId::new()];

        let result = repository
            .exists_by_ids(&[missing[0], known, missing[1]])
            .await;
        let (_, errors) = result.into_pair();
        let errors = errors.unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].to_string(),
            format!("Genre Not Found using ID {}", missing[0])
        );
        assert_eq!(errors[1].ids, vec![missing[1].to_string()]);
    }

    #[tokio::test]
    async fn validator_reports_each_relation_under_its_field() {
        let categories = Arc::new(InMemoryRelatedEntityRepository::<CategoryId>::new());
        let genres = Arc::new(InMemoryRelatedEntityRepository::<GenreId>::new());
        let cast_members = Arc::new(InMemoryRelatedEntityRepository::<CastMemberId>::new());
        let category = CategoryId::new();
        categories.insert(category).await;

        let validator = VideoRelationsValidator::new(categories, genres, cast_members);
        let notification = validator
            .validate(&[category], &[GenreId::new()], &[CastMemberId::new()])
            .await;

        assert!(notification.field_errors("category_ids").is_none());
        assert_eq!(notification.field_errors("genre_ids").unwrap().len(), 1);
        assert_eq!(notification.field_errors("cast_member_ids").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_relations_are_valid() {
        let validator = VideoRelationsValidator::new(
            Arc::new(InMemoryRelatedEntityRepository::new()),
            Arc::new(InMemoryRelatedEntityRepository::new()),
            Arc::new(InMemoryRelatedEntityRepository::new()),
        );
        assert!(!validator.validate(&[], &[], &[]).await.has_errors());
    }
}
