mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{menu_input, Harness};
use rbac_core::domain::{Menu, MenuQuery, MenuSelectQuery, RecordStatus};
use rbac_core::repositories::MenuRepository;
use rbac_core::{DomainError, ErrorKind};
use rbac_infrastructure::InMemoryMenuRepository;
use rbac_shared::{PageResult, Pagination};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use uuid::Uuid;

#[tokio::test]
async fn siblings_and_children_get_sequential_codes() {
    let h = Harness::new().await;

    let a = h.menus.create(menu_input("A", None), None).await.unwrap();
    let b = h.menus.create(menu_input("B", None), None).await.unwrap();
    let a1 = h.menus.create(menu_input("A1", Some(a.id)), None).await.unwrap();
    let a2 = h.menus.create(menu_input("A2", Some(a.id)), None).await.unwrap();
    let a11 = h.menus.create(menu_input("A11", Some(a1.id)), None).await.unwrap();

    assert_eq!(a.level_code, "01");
    assert_eq!(b.level_code, "02");
    assert_eq!(a1.level_code, "0101");
    assert_eq!(a2.level_code, "0102");
    assert_eq!(a11.level_code, "010101");
}

#[tokio::test]
async fn deleted_sibling_code_is_reused() {
    let h = Harness::new().await;

    h.menus.create(menu_input("one", None), None).await.unwrap();
    let two = h.menus.create(menu_input("two", None), None).await.unwrap();
    h.menus.create(menu_input("three", None), None).await.unwrap();

    h.menus.delete(&two.id, None).await.unwrap();
    let next = h.menus.create(menu_input("again", None), None).await.unwrap();

    assert_eq!(next.level_code, "02");
}

#[tokio::test]
async fn reparent_rewrites_every_descendant() {
    let h = Harness::new().await;

    let a = h.menus.create(menu_input("A", None), None).await.unwrap();
    let b = h.menus.create(menu_input("B", Some(a.id)), None).await.unwrap();
    let c = h.menus.create(menu_input("C", Some(b.id)), None).await.unwrap();
    let d = h.menus.create(menu_input("D", Some(c.id)), None).await.unwrap();
    let x = h.menus.create(menu_input("X", None), None).await.unwrap();
    h.menus.create(menu_input("X1", Some(x.id)), None).await.unwrap();

    assert_eq!(d.level_code, "01010101");

    let moved = h.menus.update(&b.id, menu_input("B", Some(x.id)), None).await.unwrap();
    assert_eq!(moved.level_code, "0202");
    assert_eq!(moved.parent_id, Some(x.id));

    assert_eq!(h.menus.get(&c.id).await.unwrap().level_code, "020201");
    assert_eq!(h.menus.get(&d.id).await.unwrap().level_code, "02020101");
    assert_eq!(h.menus.get(&a.id).await.unwrap().level_code, "01");
    assert_eq!(h.menus.get(&x.id).await.unwrap().level_code, "02");
}

#[tokio::test]
async fn reparent_to_top_level() {
    let h = Harness::new().await;

    let a = h.menus.create(menu_input("A", None), None).await.unwrap();
    let b = h.menus.create(menu_input("B", Some(a.id)), None).await.unwrap();
    let c = h.menus.create(menu_input("C", Some(b.id)), None).await.unwrap();

    let moved = h.menus.update(&b.id, menu_input("B", None), None).await.unwrap();

    assert_eq!(moved.level_code, "02");
    assert_eq!(h.menus.get(&c.id).await.unwrap().level_code, "0201");
}

#[tokio::test]
async fn self_parent_leaves_storage_untouched() {
    let h = Harness::new().await;

    let a = h.menus.create(menu_input("A", None), None).await.unwrap();
    let err = h
        .menus
        .update(&a.id, menu_input("renamed", Some(a.id)), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::SelfParent));
    let after = h.menus.get(&a.id).await.unwrap();
    assert_eq!(after.name, "A");
    assert_eq!(after.level_code, "01");
    assert_eq!(after.parent_id, None);
}

#[tokio::test]
async fn move_under_descendant_is_rejected() {
    let h = Harness::new().await;

    let a = h.menus.create(menu_input("A", None), None).await.unwrap();
    let b = h.menus.create(menu_input("B", Some(a.id)), None).await.unwrap();
    let c = h.menus.create(menu_input("C", Some(b.id)), None).await.unwrap();

    let err = h.menus.update(&a.id, menu_input("A", Some(c.id)), None).await.unwrap_err();

    assert!(matches!(err, DomainError::ParentIsDescendant));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.menus.get(&a.id).await.unwrap().level_code, "01");
    assert_eq!(h.menus.get(&c.id).await.unwrap().level_code, "010101");
}

#[tokio::test]
async fn hundredth_child_is_an_allocation_failure() {
    let h = Harness::new().await;

    let parent = h.menus.create(menu_input("parent", None), None).await.unwrap();
    for i in 1..=99 {
        let child = h
            .menus
            .create(menu_input(&format!("child {i}"), Some(parent.id)), None)
            .await
            .unwrap();
        assert_eq!(child.level_code, format!("01{i:02}"));
    }

    let err = h
        .menus
        .create(menu_input("one too many", Some(parent.id)), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AllocationFailure);
}

#[tokio::test]
async fn concurrent_creates_never_share_a_code() {
    let h = Harness::new().await;
    let parent_id = h.menus.create(menu_input("parent", None), None).await.unwrap().id;

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let menus = h.menus.clone();
        tasks.spawn(async move {
            menus
                .create(menu_input(&format!("child {i}"), Some(parent_id)), None)
                .await
                .map(|m| m.level_code)
        });
    }

    let mut codes = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        assert!(codes.insert(joined.unwrap().unwrap()));
    }
    assert_eq!(codes.len(), 20);
}

#[tokio::test]
async fn duplicate_code_under_same_parent_conflicts() {
    let h = Harness::new().await;

    let mut input = menu_input("Users", None);
    input.code = Some("users".to_string());
    h.menus.create(input.clone(), None).await.unwrap();

    let err = h.menus.create(input, None).await.unwrap_err();
    assert!(matches!(err, DomainError::MenuCodeAlreadyExists(_)));
}

#[tokio::test]
async fn delete_requires_leaf_and_missing_is_not_found() {
    let h = Harness::new().await;

    let a = h.menus.create(menu_input("A", None), None).await.unwrap();
    let b = h.menus.create(menu_input("B", Some(a.id)), None).await.unwrap();

    let err = h.menus.delete(&a.id, None).await.unwrap_err();
    assert!(matches!(err, DomainError::HasChildren));

    h.menus.delete_many(&[b.id, a.id], None).await.unwrap();
    let err = h.menus.get(&a.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn tree_query_nests_and_filters_by_status() {
    let h = Harness::new().await;

    let a = h.menus.create(menu_input("A", None), None).await.unwrap();
    let b = h.menus.create(menu_input("B", Some(a.id)), None).await.unwrap();
    h.menus.create(menu_input("C", None), None).await.unwrap();
    h.menus.update_status(&b.id, RecordStatus::Disabled).await.unwrap();

    let all = h.menus.query_tree(&MenuSelectQuery::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].children.len(), 1);

    let enabled = h
        .menus
        .query_tree(&MenuSelectQuery {
            status: Some(RecordStatus::Enabled),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(enabled[0].children.is_empty());
}

/// Parks the first armed call until released.
#[derive(Default)]
struct Gate {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl Gate {
    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

/// In-memory menus whose `update` and `delete` wait at a gate before writing.
struct GatedMenuRepository {
    inner: InMemoryMenuRepository,
    gate: Arc<Gate>,
}

#[async_trait]
impl MenuRepository for GatedMenuRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Menu>, DomainError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Menu>, DomainError> {
        self.inner.find_by_ids(ids).await
    }

    async fn query_level_codes_by_parent_id(&self, parent_id: Option<Uuid>) -> Result<Vec<String>, DomainError> {
        self.inner.query_level_codes_by_parent_id(parent_id).await
    }

    async fn check_code(&self, code: &str, parent_id: Option<Uuid>) -> Result<bool, DomainError> {
        self.inner.check_code(code, parent_id).await
    }

    async fn has_children(&self, id: &Uuid) -> Result<bool, DomainError> {
        self.inner.has_children(id).await
    }

    async fn create(&self, menu: &Menu) -> Result<Menu, DomainError> {
        self.inner.create(menu).await
    }

    async fn update(&self, menu: &Menu) -> Result<Menu, DomainError> {
        self.gate.pass().await;
        self.inner.update(menu).await
    }

    async fn update_with_level_code(&self, menu: &Menu, old_code: &str, new_code: &str) -> Result<Menu, DomainError> {
        self.inner.update_with_level_code(menu, old_code, new_code).await
    }

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        self.inner.update_status(id, status).await
    }

    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        self.gate.pass().await;
        self.inner.delete(id, removed_by).await
    }

    async fn query_page(&self, query: &MenuQuery, page: Pagination) -> Result<PageResult<Menu>, DomainError> {
        self.inner.query_page(query, page).await
    }

    async fn query_select(&self, query: &MenuSelectQuery) -> Result<Vec<Menu>, DomainError> {
        self.inner.query_select(query).await
    }
}

async fn gated_harness() -> (Harness, Arc<Gate>) {
    let gate = Arc::new(Gate::default());
    let shared = gate.clone();
    let h = Harness::with_menu_repo(move |inner| {
        Arc::new(GatedMenuRepository { inner, gate: shared }) as Arc<dyn MenuRepository>
    })
    .await;
    (h, gate)
}

const STILL_WAITING: Duration = Duration::from_millis(50);

#[tokio::test]
async fn move_waits_for_in_flight_rename() {
    let (h, gate) = gated_harness().await;

    let p1 = h.menus.create(menu_input("P1", None), None).await.unwrap();
    let p2 = h.menus.create(menu_input("P2", None), None).await.unwrap();
    let m = h.menus.create(menu_input("M", Some(p1.id)), None).await.unwrap();
    assert_eq!(m.level_code, "0101");
    let (m_id, p1_id, p2_id) = (m.id, p1.id, p2.id);

    gate.arm();
    let menus = h.menus.clone();
    let rename =
        tokio::spawn(async move { menus.update(&m_id, menu_input("M renamed", Some(p1_id)), None).await });
    gate.entered.notified().await;

    let menus = h.menus.clone();
    let mut relocate =
        tokio::spawn(async move { menus.update(&m_id, menu_input("M renamed", Some(p2_id)), None).await });
    assert!(tokio::time::timeout(STILL_WAITING, &mut relocate).await.is_err());

    gate.release.notify_one();
    rename.await.unwrap().unwrap();
    relocate.await.unwrap().unwrap();

    let stored = h.menus.get(&m.id).await.unwrap();
    assert_eq!(stored.name, "M renamed");
    assert_eq!(stored.parent_id, Some(p2.id));
    assert_eq!(stored.level_code, format!("{}01", p2.level_code));
    assert!(h.menu_repo.query_level_codes_by_parent_id(Some(p1.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_under_parent_being_deleted_is_not_found() {
    let (h, gate) = gated_harness().await;

    let parent_id = h.menus.create(menu_input("P", None), None).await.unwrap().id;

    gate.arm();
    let menus = h.menus.clone();
    let removal = tokio::spawn(async move { menus.delete(&parent_id, None).await });
    gate.entered.notified().await;

    let menus = h.menus.clone();
    let mut child = tokio::spawn(async move { menus.create(menu_input("C", Some(parent_id)), None).await });
    assert!(tokio::time::timeout(STILL_WAITING, &mut child).await.is_err());

    gate.release.notify_one();
    removal.await.unwrap().unwrap();
    let err = child.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let live = h.menus.query_tree(&MenuSelectQuery::default()).await.unwrap();
    assert!(live.is_empty());
    assert!(!h.menu_repo.has_children(&parent_id).await.unwrap());
}

#[tokio::test]
async fn concurrent_creates_with_same_code_admit_one() {
    let h = Harness::new().await;

    let mut tasks = JoinSet::new();
    for i in 0..10 {
        let menus = h.menus.clone();
        tasks.spawn(async move {
            let mut input = menu_input(&format!("Users {i}"), None);
            input.code = Some("users".to_string());
            menus.create(input, None).await
        });
    }

    let mut created = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert!(matches!(err, DomainError::MenuCodeAlreadyExists(_))),
        }
    }
    assert_eq!(created, 1);
}
