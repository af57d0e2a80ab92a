//! Domain operations against an in-memory SQLite store and search mirror.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use todo_core::{
    CreateTodo, FtsSearchIndex, Page, SearchIndex, SearchSyncPolicy, SqliteStore, TodoDraft,
    TodoError, TodoListPatch, TodoPatch, TodoService,
};

fn service_with(policy: SearchSyncPolicy) -> (TodoService, Arc<FtsSearchIndex>) {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let search = Arc::new(FtsSearchIndex::open_in_memory().unwrap());
    let service = TodoService::new(store, search.clone(), policy);
    (service, search)
}

fn service() -> TodoService {
    service_with(SearchSyncPolicy::UploadOnly).0
}

fn new_todo(title: &str) -> CreateTodo {
    CreateTodo {
        title: title.to_string(),
        description: Some(format!("{title} details")),
        due_date: NaiveDate::from_ymd_opt(2026, 12, 24),
    }
}

// --- todo lists ---

#[tokio::test]
async fn created_list_can_be_fetched() {
    let service = service();
    let first = service.create_todo_list("Groceries").await.unwrap();
    let second = service.create_todo_list("Chores").await.unwrap();
    assert_ne!(first.id, second.id);

    let fetched = service.get_todo_list(first.id).await.unwrap();
    assert_eq!(fetched.name, "Groceries");
    assert_eq!(fetched.id, first.id);
    assert_eq!(fetched.todos_count, 0);
}

#[tokio::test]
async fn blank_list_name_is_rejected() {
    let service = service();
    let err = service.create_todo_list("   ").await.unwrap_err();
    assert!(matches!(err, TodoError::Validation { field: "name", .. }));
    assert!(service.list_todo_lists(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_list_applies_name() {
    let service = service();
    let list = service.create_todo_list("Old").await.unwrap();
    let patch = TodoListPatch {
        name: Some("New".to_string()),
    };
    let updated = service.update_todo_list(list.id, patch).await.unwrap();
    assert_eq!(updated.name, "New");
    assert!(updated.updated_at >= list.updated_at);
    assert_eq!(updated.created_at, list.created_at);
    assert_eq!(service.get_todo_list(list.id).await.unwrap().name, "New");
}

#[tokio::test]
async fn empty_list_patch_changes_nothing() {
    let service = service();
    let list = service.create_todo_list("Same").await.unwrap();
    let updated = service
        .update_todo_list(list.id, TodoListPatch::default())
        .await
        .unwrap();
    assert_eq!(updated, list);
}

#[tokio::test]
async fn missing_list_is_not_found_everywhere() {
    let service = service();
    assert!(matches!(
        service.get_todo_list(5).await,
        Err(TodoError::ListNotFound(5))
    ));
    assert!(matches!(
        service.delete_todo_list(5).await,
        Err(TodoError::ListNotFound(5))
    ));
    assert!(matches!(
        service.update_todo_list(5, TodoListPatch::default()).await,
        Err(TodoError::ListNotFound(5))
    ));
    assert!(matches!(
        service.get_todo_list_todos(5, Page::default()).await,
        Err(TodoError::ListNotFound(5))
    ));
}

#[tokio::test]
async fn deleting_list_removes_its_todos() {
    let service = service();
    let list = service.create_todo_list("Doomed").await.unwrap();
    let keep = service.create_todo_list("Kept").await.unwrap();
    let a = service.create_todo(list.id, new_todo("a")).await.unwrap();
    let b = service.create_todo(list.id, new_todo("b")).await.unwrap();
    let other = service.create_todo(keep.id, new_todo("c")).await.unwrap();

    service.delete_todo_list(list.id).await.unwrap();

    for todo in [&a, &b] {
        let err = service.get_todo(list.id, todo.id).await.unwrap_err();
        assert!(err.is_not_found());
    }
    assert!(service.get_todo(keep.id, other.id).await.is_ok());
}

#[tokio::test]
async fn list_todo_lists_pages_in_id_order() {
    let service = service();
    for name in ["one", "two", "three"] {
        service.create_todo_list(name).await.unwrap();
    }
    let all = service.list_todo_lists(Page::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let page = service
        .list_todo_lists(Page::new(Some(1), Some(1)))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "two");
}

// --- todos ---

#[tokio::test]
async fn create_todo_requires_existing_list() {
    let service = service();
    let err = service.create_todo(99, new_todo("orphan")).await.unwrap_err();
    assert!(matches!(err, TodoError::ListNotFound(99)));

    let list = service.create_todo_list("Real").await.unwrap();
    assert!(service
        .get_todo_list_todos(list.id, Page::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn create_todo_defaults_optional_fields() {
    let service = service();
    let list = service.create_todo_list("Defaults").await.unwrap();
    let input = CreateTodo {
        title: "Bare".to_string(),
        description: None,
        due_date: None,
    };
    let todo = service.create_todo(list.id, input).await.unwrap();
    assert_eq!(todo.description, "");
    assert_eq!(todo.due_date, Utc::now().date_naive());
    assert_eq!(todo.list_id, list.id);
}

#[tokio::test]
async fn todos_carry_their_current_list_name() {
    let service = service();
    let list = service.create_todo_list("Errands").await.unwrap();
    let todo = service.create_todo(list.id, new_todo("Post office")).await.unwrap();
    assert_eq!(todo.list_name, "Errands");

    let patch = TodoListPatch {
        name: Some("Saturday errands".to_string()),
    };
    service.update_todo_list(list.id, patch).await.unwrap();

    let fetched = service.get_todo(list.id, todo.id).await.unwrap();
    assert_eq!(fetched.list_name, "Saturday errands");
    let listed = service
        .get_todo_list_todos(list.id, Page::default())
        .await
        .unwrap();
    assert_eq!(listed[0].list_name, "Saturday errands");
}

#[tokio::test]
async fn get_todo_requires_both_ids_to_match() {
    let service = service();
    let home = service.create_todo_list("Home").await.unwrap();
    let work = service.create_todo_list("Work").await.unwrap();
    let todo = service.create_todo(home.id, new_todo("Dishes")).await.unwrap();

    assert_eq!(service.get_todo(home.id, todo.id).await.unwrap(), todo);
    assert!(matches!(
        service.get_todo(work.id, todo.id).await,
        Err(TodoError::TodoNotFound { .. })
    ));
}

#[tokio::test]
async fn update_todo_applies_present_fields_only() {
    let service = service();
    let list = service.create_todo_list("List").await.unwrap();
    let todo = service.create_todo(list.id, new_todo("old")).await.unwrap();

    let patch = TodoPatch {
        title: Some("new".to_string()),
        ..TodoPatch::default()
    };
    let updated = service.update_todo(list.id, todo.id, patch).await.unwrap();
    assert_eq!(updated.title, "new");
    assert_eq!(updated.description, todo.description);
    assert_eq!(updated.due_date, todo.due_date);

    let stored = service.get_todo(list.id, todo.id).await.unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn empty_todo_patch_changes_nothing() {
    let service = service();
    let list = service.create_todo_list("List").await.unwrap();
    let todo = service.create_todo(list.id, new_todo("same")).await.unwrap();
    let updated = service
        .update_todo(list.id, todo.id, TodoPatch::default())
        .await
        .unwrap();
    assert_eq!(updated, todo);
}

#[tokio::test]
async fn delete_todo_then_not_found() {
    let service = service();
    let list = service.create_todo_list("List").await.unwrap();
    let todo = service.create_todo(list.id, new_todo("gone")).await.unwrap();

    service.delete_todo(list.id, todo.id).await.unwrap();
    assert!(service.get_todo(list.id, todo.id).await.unwrap_err().is_not_found());
    assert!(service.delete_todo(list.id, todo.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn overdue_todos_are_strictly_before_today() {
    let service = service();
    let list = service.create_todo_list("Due").await.unwrap();
    let mut late = new_todo("late");
    late.due_date = NaiveDate::from_ymd_opt(2020, 1, 1);
    let late = service.create_todo(list.id, late).await.unwrap();
    service.create_todo(list.id, new_todo("later")).await.unwrap();

    let overdue = service
        .overdue_todos(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(overdue, vec![late]);
}

#[tokio::test]
async fn import_stores_trimmed_titles() {
    let service = service();
    let drafts = [TodoDraft {
        title: "  padded  ".to_string(),
        description: String::new(),
        due_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
    }];
    let (list, todos) = service.import_todo_list(" Imported ", &drafts).await.unwrap();
    assert_eq!(list.name, "Imported");
    assert_eq!(todos[0].title, "padded");

    let stored = service.get_todo(list.id, todos[0].id).await.unwrap();
    assert_eq!(stored.title, "padded");
}

#[tokio::test]
async fn import_rejects_blank_title_and_writes_nothing() {
    let service = service();
    let drafts = [TodoDraft {
        title: "   ".to_string(),
        description: String::new(),
        due_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
    }];
    let err = service.import_todo_list("Imported", &drafts).await.unwrap_err();
    assert!(matches!(err, TodoError::Validation { field: "title", .. }));
    assert!(service.list_todo_lists(Page::default()).await.unwrap().is_empty());
}

// --- search mirror policy ---

#[tokio::test]
async fn upload_only_policy_leaves_mirror_alone() {
    let (service, search) = service_with(SearchSyncPolicy::UploadOnly);
    let list = service.create_todo_list("List").await.unwrap();
    let todo = service.create_todo(list.id, new_todo("milk")).await.unwrap();

    assert!(search.get_document(todo.id).await.unwrap().is_none());
    assert!(service.search_todos("milk").await.unwrap().is_empty());
}

#[tokio::test]
async fn all_writes_policy_mirrors_every_change() {
    let (service, search) = service_with(SearchSyncPolicy::AllWrites);
    let list = service.create_todo_list("List").await.unwrap();
    let todo = service.create_todo(list.id, new_todo("milk")).await.unwrap();
    assert_eq!(service.search_todos("milk").await.unwrap().len(), 1);

    let patch = TodoPatch {
        title: Some("bread".to_string()),
        ..TodoPatch::default()
    };
    service.update_todo(list.id, todo.id, patch).await.unwrap();
    assert!(service.search_todos("milk").await.unwrap().is_empty());
    assert_eq!(service.search_todos("bread").await.unwrap()[0].todo_id, todo.id);

    service.delete_todo_list(list.id).await.unwrap();
    assert!(search.get_document(todo.id).await.unwrap().is_none());
}
