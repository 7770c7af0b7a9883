use rusqlite::Connection;
use seqlist_core::db::open_db_in_memory;
use seqlist_core::{
    Item, ItemRepository, ListConfig, ListService, NewItem, ScopeId, SortDirection,
    SqliteEmbeddedItemRepository,
};

const T0: i64 = 1_700_000_000_000;
const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn service(conn: &Connection) -> ListService<SqliteEmbeddedItemRepository<'_>> {
    let config = ListConfig::default();
    let repo = SqliteEmbeddedItemRepository::try_new(conn, &config).unwrap();
    ListService::with_config(repo, config)
}

fn seed(
    service: &ListService<SqliteEmbeddedItemRepository<'_>>,
    scope: ScopeId,
    count: i64,
) -> Vec<Item> {
    (0..count)
        .map(|index| {
            service
                .create_item(
                    scope,
                    NewItem {
                        position: None,
                        created_at: Some(T0 + index),
                    },
                )
                .unwrap()
        })
        .collect()
}

fn positions(items: &[Item]) -> Vec<i64> {
    items.iter().map(|item| item.position.unwrap()).collect()
}

#[test]
fn repository_reports_the_embedded_shape() {
    let conn = setup();
    let service = service(&conn);
    assert!(service.engine().repo().is_embedded());
}

#[test]
fn sequential_creates_assign_contiguous_positions() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 3);

    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Ascending)
        .unwrap();
    assert_eq!(positions(&items), vec![0, 1, 2]);
    let ids: Vec<_> = items.iter().map(|item| item.uuid).collect();
    let seeded_ids: Vec<_> = seeded.iter().map(|item| item.uuid).collect();
    assert_eq!(ids, seeded_ids);
}

#[test]
fn create_inserts_at_next_available_position() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    seed(&service, scope, 3);

    let item = service.create_item(scope, NewItem::default()).unwrap();
    assert_eq!(item.position, Some(3));
}

#[test]
fn explicit_duplicate_position_sorts_by_created_at() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    seed(&service, scope, 3);

    let deuce = service
        .create_item(
            scope,
            NewItem {
                position: Some(1),
                created_at: Some(T0 + 100),
            },
        )
        .unwrap();

    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Ascending)
        .unwrap();
    assert_eq!(positions(&items), vec![0, 1, 1, 2]);
    assert_eq!(items[2].uuid, deuce.uuid);
}

#[test]
fn descending_order_is_the_reverse_of_ascending() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    seed(&service, scope, 3);

    let deuce = service
        .create_item(
            scope,
            NewItem {
                position: Some(2),
                created_at: Some(T0 - ONE_DAY_MS),
            },
        )
        .unwrap();

    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Descending)
        .unwrap();
    assert_eq!(positions(&items), vec![2, 2, 1, 0]);
    assert_eq!(items[1].uuid, deuce.uuid);
}

#[test]
fn destroy_reorders_the_parent_document_without_reload() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 6);

    service.destroy_item(&seeded[3]).unwrap();

    // The shift lands in the same parent document, so a plain re-query
    // observes it immediately.
    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Ascending)
        .unwrap();
    assert_eq!(positions(&items), vec![0, 1, 2, 3, 4]);
    assert!(items.iter().all(|item| item.uuid != seeded[3].uuid));
}

#[test]
fn destroy_does_not_shift_when_item_was_already_removed() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 6);

    let mut item = seeded[2].clone();
    service.engine().remove_from_list(&mut item).unwrap();
    service.destroy_item(&item).unwrap();

    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Ascending)
        .unwrap();
    assert_eq!(positions(&items), vec![0, 1, 2, 3, 4]);
}

#[test]
fn remove_from_list_clears_position_and_compacts() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 6);

    let mut item = seeded[0].clone();
    service.engine().remove_from_list(&mut item).unwrap();

    assert_eq!(item.position, None);
    let stored = service
        .engine()
        .repo()
        .find_item(scope, item.uuid)
        .unwrap()
        .unwrap();
    assert_eq!(stored.position, None);

    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Ascending)
        .unwrap();
    assert_eq!(positions(&items), vec![0, 1, 2, 3, 4]);
}

#[test]
fn first_and_last_predicates_match_list_ends() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 3);

    assert!(service.engine().is_first(&seeded[0]));
    assert!(!service.engine().is_first(&seeded[2]));
    assert!(service.engine().is_last(&seeded[2]).unwrap());
    assert!(!service.engine().is_last(&seeded[0]).unwrap());
}

#[test]
fn navigation_walks_adjacent_positions() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 3);

    let next = service.engine().next_item(&seeded[1]).unwrap().unwrap();
    assert_eq!(next.uuid, seeded[2].uuid);
    let previous = service.engine().previous_item(&seeded[1]).unwrap().unwrap();
    assert_eq!(previous.uuid, seeded[0].uuid);

    assert!(service.engine().next_item(&seeded[2]).unwrap().is_none());
    assert!(service.engine().previous_item(&seeded[0]).unwrap().is_none());

    let mut removed = seeded[1].clone();
    service.engine().remove_from_list(&mut removed).unwrap();
    assert!(service.engine().next_item(&removed).unwrap().is_none());
    assert!(service.engine().previous_item(&removed).unwrap().is_none());
}

#[test]
fn insert_at_moves_within_the_parent_document() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 3);

    let mut last = seeded[2].clone();
    service.engine().insert_at(&mut last, 1).unwrap();
    assert_eq!(last.position, Some(1));

    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Ascending)
        .unwrap();
    assert_eq!(positions(&items), vec![0, 1, 2]);
    let ids: Vec<_> = items.iter().map(|item| item.uuid).collect();
    assert_eq!(ids, vec![seeded[0].uuid, seeded[2].uuid, seeded[1].uuid]);
}

#[test]
fn insert_at_same_position_changes_nothing() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 3);

    let mut item = seeded[1].clone();
    service.engine().insert_at(&mut item, 1).unwrap();

    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Ascending)
        .unwrap();
    assert_eq!(positions(&items), vec![0, 1, 2]);
    let ids: Vec<_> = items.iter().map(|item| item.uuid).collect();
    let seeded_ids: Vec<_> = seeded.iter().map(|item| item.uuid).collect();
    assert_eq!(ids, seeded_ids);
}

#[test]
fn insert_at_re_enters_an_out_of_list_item() {
    let conn = setup();
    let service = service(&conn);
    let scope = service.create_scope("category_1").unwrap();
    let seeded = seed(&service, scope, 3);

    let mut item = seeded[0].clone();
    service.engine().remove_from_list(&mut item).unwrap();
    service.engine().insert_at(&mut item, 2).unwrap();

    assert_eq!(item.position, Some(2));
    let items = service
        .engine()
        .order_by_position(scope, SortDirection::Ascending)
        .unwrap();
    assert_eq!(positions(&items), vec![0, 1, 2]);
    assert_eq!(items[2].uuid, item.uuid);
}

#[test]
fn start_list_at_shifts_the_base_for_new_inserts() {
    let conn = setup();
    let config = ListConfig {
        start_list_at: 1,
        ..ListConfig::default()
    };
    let repo = SqliteEmbeddedItemRepository::try_new(&conn, &config).unwrap();
    let service = ListService::with_config(repo, config);
    let scope = service.create_scope("category_3").unwrap();

    let first = service.create_item(scope, NewItem::default()).unwrap();
    let second = service.create_item(scope, NewItem::default()).unwrap();
    assert_eq!(first.position, Some(1));
    assert_eq!(second.position, Some(2));
}
