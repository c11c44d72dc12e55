//! Tag operations on the repository.
//!
//! Each operation is an atomic read-modify-write of a single todo, except
//! [`TodoRepository::clear_all_tags`] which touches every todo.

use serde_json::Value;

use super::TodoRepository;
use crate::error::Result;
use crate::tags::{parse_tag_value, validate_tag, TagSet};
use crate::todo::{Todo, TodoId};

impl TodoRepository {
    /// Add `tag` to a todo. Adding a tag that is already present succeeds
    /// without writing anything.
    pub async fn add_tag(&self, id: &TodoId, tag: &str) -> Result<()> {
        self.modify(id, |todo| {
            let tag = validate_tag(tag)?;
            Ok(todo.tags.insert(tag))
        })
        .await?;
        Ok(())
    }

    /// Add a tag taken from an untyped request body.
    ///
    /// The todo is looked up before the value is validated, so a missing
    /// todo reports NotFound whatever the body holds.
    pub async fn add_tag_value(&self, id: &TodoId, value: Option<&Value>) -> Result<()> {
        self.modify(id, |todo| {
            let tag = parse_tag_value(value)?;
            Ok(todo.tags.insert(tag))
        })
        .await?;
        Ok(())
    }

    /// Tags of a todo in insertion order
    pub async fn list_tags(&self, id: &TodoId) -> Result<Vec<String>> {
        Ok(self.get(id).await?.tags.to_vec())
    }

    /// Replace a todo's whole tag set
    pub async fn replace_tags(&self, id: &TodoId, tags: TagSet) -> Result<Vec<String>> {
        let todo = self
            .modify(id, |todo| {
                if todo.tags == tags {
                    return Ok(false);
                }
                todo.tags = tags;
                Ok(true)
            })
            .await?;
        Ok(todo.tags.to_vec())
    }

    /// Remove one tag from a todo. Removing an absent tag is a no-op.
    pub async fn remove_tag(&self, id: &TodoId, tag: &str) -> Result<()> {
        self.modify(id, |todo| Ok(todo.tags.remove(tag))).await?;
        Ok(())
    }

    /// Remove every tag from one todo. The todo itself is kept.
    pub async fn clear_tags_for_todo(&self, id: &TodoId) -> Result<()> {
        self.modify(id, |todo| {
            if todo.tags.is_empty() {
                return Ok(false);
            }
            todo.tags.clear();
            Ok(true)
        })
        .await?;
        Ok(())
    }

    /// All todos whose tag set contains `tag` (exact, case-sensitive)
    pub async fn todos_by_tag(&self, tag: &str) -> Vec<Todo> {
        self.table
            .read()
            .await
            .todos
            .values()
            .filter(|todo| todo.tags.contains(tag))
            .cloned()
            .collect()
    }

    /// Remove the tag set from every todo without deleting any todo.
    ///
    /// Memory is always cleared; store writes are best-effort and failures are
    /// logged. Returns the number of todos that had tags.
    pub async fn clear_all_tags(&self) -> usize {
        let mut table = self.table.write().await;
        let mut cleared = 0;
        let mut failed = 0;

        for todo in table.todos.values_mut() {
            if todo.tags.is_empty() {
                continue;
            }
            todo.tags.clear();
            cleared += 1;
            if self.persist(todo).await.is_err() {
                failed += 1;
            }
        }

        if failed > 0 {
            tracing::warn!(
                "Cleared tags on {} todos, {} could not be persisted",
                cleared,
                failed
            );
        } else {
            tracing::info!("Cleared tags on {} todos", cleared);
        }
        cleared
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::FlakyStore;
    use super::*;
    use crate::error::TodoError;
    use crate::store::{SqliteStore, TodoStore};
    use crate::todo::NewTodo;
    use serde_json::json;

    async fn repo_with(titles: &[&str]) -> (TodoRepository, Vec<TodoId>) {
        let repo = TodoRepository::in_memory();
        let mut ids = Vec::new();
        for title in titles {
            ids.push(repo.add(NewTodo::titled(*title)).await.unwrap().id);
        }
        (repo, ids)
    }

    #[tokio::test]
    async fn test_add_tag_is_idempotent() {
        let (repo, ids) = repo_with(&["t"]).await;
        repo.add_tag(&ids[0], "work").await.unwrap();
        repo.add_tag(&ids[0], "work").await.unwrap();
        assert_eq!(repo.list_tags(&ids[0]).await.unwrap(), vec!["work".to_string()]);
    }

    #[tokio::test]
    async fn test_add_empty_tag_is_rejected_without_mutation() {
        let (repo, ids) = repo_with(&["t"]).await;
        let err = repo.add_tag(&ids[0], "").await.unwrap_err();
        assert!(matches!(err, TodoError::Validation(_)));
        assert!(repo.list_tags(&ids[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_tag_value_checks_existence_before_validation() {
        let (repo, ids) = repo_with(&["t"]).await;
        let missing = TodoId::Seq(9);
        for value in [None, Some(json!("")), Some(json!(3)), Some(json!("x"))] {
            assert!(matches!(
                repo.add_tag_value(&missing, value.as_ref()).await,
                Err(TodoError::NotFound(_))
            ));
        }

        let err = repo.add_tag_value(&ids[0], Some(&json!(""))).await.unwrap_err();
        assert!(matches!(err, TodoError::Validation(_)));
        repo.add_tag_value(&ids[0], Some(&json!("home"))).await.unwrap();
        assert_eq!(repo.list_tags(&ids[0]).await.unwrap(), vec!["home".to_string()]);
    }

    #[tokio::test]
    async fn test_tag_ops_on_missing_todo_are_not_found() {
        let (repo, _) = repo_with(&[]).await;
        let id = TodoId::Seq(5);
        assert!(matches!(repo.add_tag(&id, "x").await, Err(TodoError::NotFound(_))));
        assert!(matches!(repo.list_tags(&id).await, Err(TodoError::NotFound(_))));
        assert!(matches!(repo.remove_tag(&id, "x").await, Err(TodoError::NotFound(_))));
        assert!(matches!(
            repo.clear_tags_for_todo(&id).await,
            Err(TodoError::NotFound(_))
        ));
        assert!(matches!(
            repo.replace_tags(&id, TagSet::new()).await,
            Err(TodoError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_todos_by_tag_tracks_membership() {
        let (repo, ids) = repo_with(&["a", "b", "c"]).await;
        repo.add_tag(&ids[0], "work").await.unwrap();
        repo.add_tag(&ids[2], "work").await.unwrap();
        repo.add_tag(&ids[1], "Work").await.unwrap();

        let tagged: Vec<TodoId> = repo
            .todos_by_tag("work")
            .await
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(tagged, vec![ids[0].clone(), ids[2].clone()]);

        repo.remove_tag(&ids[0], "work").await.unwrap();
        let tagged: Vec<TodoId> = repo
            .todos_by_tag("work")
            .await
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(tagged, vec![ids[2].clone()]);
    }

    #[tokio::test]
    async fn test_remove_absent_tag_is_noop() {
        let (repo, ids) = repo_with(&["a"]).await;
        repo.add_tag(&ids[0], "x").await.unwrap();
        repo.remove_tag(&ids[0], "y").await.unwrap();
        assert_eq!(repo.list_tags(&ids[0]).await.unwrap(), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_tags_for_todo_keeps_the_todo() {
        let (repo, ids) = repo_with(&["a"]).await;
        repo.add_tag(&ids[0], "x").await.unwrap();
        repo.add_tag(&ids[0], "y").await.unwrap();

        repo.clear_tags_for_todo(&ids[0]).await.unwrap();
        let todo = repo.get(&ids[0]).await.unwrap();
        assert!(todo.tags.is_empty());
        assert_eq!(todo.title, "a");
    }

    #[tokio::test]
    async fn test_replace_tags() {
        let (repo, ids) = repo_with(&["a"]).await;
        repo.add_tag(&ids[0], "old").await.unwrap();
        let tags = repo
            .replace_tags(&ids[0], TagSet::try_from_iter(["n1", "n2"]).unwrap())
            .await
            .unwrap();
        assert_eq!(tags, vec!["n1".to_string(), "n2".to_string()]);
        assert!(repo.todos_by_tag("old").await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_tags_keeps_todos() {
        let (repo, ids) = repo_with(&["a", "b", "c"]).await;
        repo.add_tag(&ids[0], "x").await.unwrap();
        repo.add_tag(&ids[1], "y").await.unwrap();

        assert_eq!(repo.clear_all_tags().await, 2);
        assert_eq!(repo.len().await, 3);
        for todo in repo.list().await {
            assert!(todo.tags.is_empty());
        }
    }

    #[tokio::test]
    async fn test_tag_changes_are_persisted() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let repo = TodoRepository::new(store.clone());
        let a = repo.add(NewTodo::titled("a")).await.unwrap().id;
        let b = repo.add(NewTodo::titled("b")).await.unwrap().id;

        repo.add_tag(&a, "work").await.unwrap();
        repo.add_tag(&b, "home").await.unwrap();
        let found = store.find_by_tag_contains("work").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a);

        repo.clear_all_tags().await;
        assert!(store.find_by_tag_contains("home").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_on_add_tag_leaves_tags_unchanged() {
        let store = Arc::new(FlakyStore::new());
        let repo = TodoRepository::new(store.clone());
        let id = repo.add(NewTodo::titled("a")).await.unwrap().id;

        store.set_failing(true);
        let err = repo.add_tag(&id, "work").await.unwrap_err();
        assert!(matches!(err, TodoError::Store(_)));
        assert!(repo.list_tags(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_tags_is_best_effort() {
        let store = Arc::new(FlakyStore::new());
        let repo = TodoRepository::new(store.clone());
        let id = repo.add(NewTodo::titled("a")).await.unwrap().id;
        repo.add_tag(&id, "x").await.unwrap();

        store.set_failing(true);
        assert_eq!(repo.clear_all_tags().await, 1);
        assert!(repo.list_tags(&id).await.unwrap().is_empty());
    }
}
