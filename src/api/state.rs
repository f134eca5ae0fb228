use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    references::{FilmCatalog, IdGenerator, IdentityReference, UuidIdGenerator},
    services::{InteractionService, ListService},
    store::{MemoryInteractionStore, MemoryListStore},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub interactions: Arc<InteractionService>,
    pub lists: Arc<ListService>,
}

impl AppState {
    pub fn new(interactions: InteractionService, lists: ListService) -> Self {
        Self {
            interactions: Arc::new(interactions),
            lists: Arc::new(lists),
        }
    }

    /// Services over in-process stores and random ids
    ///
    /// Used by the router tests and for running without a database.
    pub fn in_memory(
        identity: Arc<dyn IdentityReference>,
        catalog: Arc<dyn FilmCatalog>,
    ) -> Self {
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidIdGenerator);
        let interactions = InteractionService::new(
            Arc::new(MemoryInteractionStore::new()),
            identity.clone(),
            catalog.clone(),
        );
        let lists = ListService::new(Arc::new(MemoryListStore::new()), identity, catalog, ids);
        Self::new(interactions, lists)
    }
}

impl FromRef<AppState> for Arc<InteractionService> {
    fn from_ref(state: &AppState) -> Self {
        state.interactions.clone()
    }
}

impl FromRef<AppState> for Arc<ListService> {
    fn from_ref(state: &AppState) -> Self {
        state.lists.clone()
    }
}
