//! Category data access service.
//!
//! # Responsibility
//! - Async CRUD for categories and note/category links.
//! - Reactive category list stream.

use crate::live::{LiveQuery, Table};
use crate::model::category::{Category, CategoryId, NoteCategoryCrossRef};
use crate::model::note::NoteId;
use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use crate::service::ServiceResult;
use crate::store::Store;
use log::info;

const CATEGORIES_ONLY: &[Table] = &[Table::Categories];
const LINKS_ONLY: &[Table] = &[Table::NoteCategoryLinks];
const CATEGORIES_AND_LINKS: &[Table] = &[Table::Categories, Table::NoteCategoryLinks];

/// Async facade over [`SqliteCategoryRepository`].
#[derive(Clone)]
pub struct CategoryService {
    store: Store,
}

impl CategoryService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Creates a category; names must be unique ignoring case.
    pub async fn create(&self, category: Category) -> ServiceResult<CategoryId> {
        let id = self
            .store
            .write("category_insert", CATEGORIES_ONLY, move |conn| {
                SqliteCategoryRepository::new(conn).insert_category(&category)
            })
            .await?;
        info!("event=category_insert module=service status=ok category_id={id}");
        Ok(id)
    }

    pub async fn update(&self, category: Category) -> ServiceResult<()> {
        self.store
            .write("category_update", CATEGORIES_ONLY, move |conn| {
                SqliteCategoryRepository::new(conn).update_category(&category)
            })
            .await
    }

    /// Deletes a category together with its note links.
    pub async fn delete(&self, id: CategoryId) -> ServiceResult<()> {
        self.store
            .write("category_delete", CATEGORIES_AND_LINKS, move |conn| {
                SqliteCategoryRepository::new(conn).delete_category(id)
            })
            .await?;
        info!("event=category_delete module=service status=ok category_id={id}");
        Ok(())
    }

    pub async fn get(&self, id: CategoryId) -> ServiceResult<Option<Category>> {
        self.store
            .read("category_get", move |conn| {
                SqliteCategoryRepository::new(conn).get_category(id)
            })
            .await
    }

    pub async fn find_by_name(&self, name: impl Into<String>) -> ServiceResult<Option<Category>> {
        let name = name.into();
        self.store
            .read("category_find", move |conn| {
                SqliteCategoryRepository::new(conn).find_category_by_name(&name)
            })
            .await
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<Category>> {
        self.store
            .read("category_list", |conn| {
                SqliteCategoryRepository::new(conn).list_categories()
            })
            .await
    }

    /// Category names only, as older screens expect.
    pub async fn get_all_names(&self) -> ServiceResult<Vec<String>> {
        self.store
            .read("category_names", |conn| {
                SqliteCategoryRepository::new(conn).list_category_names()
            })
            .await
    }

    pub async fn observe_all(&self) -> ServiceResult<LiveQuery<Vec<Category>>> {
        let store = self.store.clone();
        LiveQuery::start(self.store.tracker(), CATEGORIES_ONLY, "category_list", move || {
            let store = store.clone();
            async move {
                store
                    .read("category_list", |conn| {
                        SqliteCategoryRepository::new(conn).list_categories()
                    })
                    .await
            }
        })
        .await
    }

    pub async fn assign(&self, note_id: NoteId, category_id: CategoryId) -> ServiceResult<()> {
        let link = NoteCategoryCrossRef {
            note_id,
            category_id,
        };
        self.store
            .write("category_link", LINKS_ONLY, move |conn| {
                SqliteCategoryRepository::new(conn).link_note(link)
            })
            .await
    }

    /// Removes one link; returns whether it existed.
    pub async fn unassign(&self, note_id: NoteId, category_id: CategoryId) -> ServiceResult<bool> {
        let link = NoteCategoryCrossRef {
            note_id,
            category_id,
        };
        self.store
            .write("category_unlink", LINKS_ONLY, move |conn| {
                SqliteCategoryRepository::new(conn).unlink_note(link)
            })
            .await
    }

    /// Replaces the whole category set of one note atomically.
    pub async fn set_note_categories(
        &self,
        note_id: NoteId,
        category_ids: Vec<CategoryId>,
    ) -> ServiceResult<()> {
        self.store
            .write("category_set_for_note", LINKS_ONLY, move |conn| {
                SqliteCategoryRepository::new(conn).set_note_categories(note_id, &category_ids)
            })
            .await
    }

    pub async fn categories_for_note(&self, note_id: NoteId) -> ServiceResult<Vec<Category>> {
        self.store
            .read("category_for_note", move |conn| {
                SqliteCategoryRepository::new(conn).categories_for_note(note_id)
            })
            .await
    }

    pub async fn links(&self) -> ServiceResult<Vec<NoteCategoryCrossRef>> {
        self.store
            .read("category_links", |conn| {
                SqliteCategoryRepository::new(conn).list_links()
            })
            .await
    }

    /// Deletes links left behind by deleted notes; returns how many went.
    pub async fn purge_orphan_links(&self) -> ServiceResult<usize> {
        let removed = self
            .store
            .write("category_purge_orphans", LINKS_ONLY, |conn| {
                SqliteCategoryRepository::new(conn).purge_orphan_links()
            })
            .await?;
        info!("event=category_purge_orphans module=service status=ok removed={removed}");
        Ok(removed)
    }
}
