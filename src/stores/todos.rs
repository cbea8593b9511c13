use std::sync::{PoisonError, RwLock};

use crate::{
    models::TodoItem,
    persistence::{WriteBehind, TODOS_KEY},
};

pub struct TodoStore {
    items: RwLock<Vec<TodoItem>>,
    writer: WriteBehind,
}

impl TodoStore {
    pub fn new(items: Vec<TodoItem>, writer: WriteBehind) -> Self {
        Self {
            items: RwLock::new(items),
            writer,
        }
    }

    pub fn add(&self, item: TodoItem) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.push(item);
        self.writer.put(TODOS_KEY, &*items);
    }

    pub fn count(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Owned copy of the collection. Library API for embedders; no request
    /// type returns whole collections.
    pub fn list(&self) -> Vec<TodoItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
