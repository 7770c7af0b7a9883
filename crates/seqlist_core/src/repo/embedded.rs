//! Embedded-shape repository: items inside one parent document per scope.
//!
//! # Responsibility
//! - Persist each scope's items as a JSON array in the `scope_docs` table.
//! - Batch sibling updates into a single parent write.
//!
//! # Invariants
//! - Every mutation rewrites the whole parent document in one UPDATE.
//! - The configured position attribute is the JSON key inside each entry.

use crate::config::ListConfig;
use crate::db::migrations::latest_version;
use crate::model::item::{Item, ItemId, ScopeId, SortDirection};
use crate::repo::item_repo::{ItemRepository, PositionRange, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use uuid::Uuid;

/// SQLite-backed repository for the embedded storage shape.
pub struct SqliteEmbeddedItemRepository<'conn> {
    conn: &'conn Connection,
    position_key: String,
}

impl<'conn> SqliteEmbeddedItemRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection, config: &ListConfig) -> RepoResult<Self> {
        config.validate()?;
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            position_key: config.position_field_name.clone(),
        })
    }

    /// Returns the JSON key used for positions inside document entries.
    pub fn position_key(&self) -> &str {
        &self.position_key
    }

    fn read_doc(&self, scope: ScopeId) -> RepoResult<Vec<Value>> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM scope_docs WHERE scope_uuid = ?1;",
                [scope.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let doc = doc.ok_or(RepoError::ScopeNotFound(scope))?;

        let parsed: Value = serde_json::from_str(&doc).map_err(|err| {
            RepoError::InvalidData(format!("unreadable document for scope {scope}: {err}"))
        })?;
        match parsed {
            Value::Array(entries) => Ok(entries),
            other => Err(RepoError::InvalidData(format!(
                "scope {scope} document must be an array, got {other}"
            ))),
        }
    }

    // The single parent write shared by every mutation of this shape.
    fn write_doc(&self, scope: ScopeId, entries: &[Value]) -> RepoResult<()> {
        let doc = serde_json::to_string(entries).map_err(|err| {
            RepoError::InvalidData(format!("unwritable document for scope {scope}: {err}"))
        })?;
        let changed = self.conn.execute(
            "UPDATE scope_docs SET doc = ?1 WHERE scope_uuid = ?2;",
            params![doc, scope.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::ScopeNotFound(scope));
        }
        Ok(())
    }

    fn entry_to_item(&self, scope: ScopeId, entry: &Value) -> RepoResult<Item> {
        let uuid_text = entry
            .get("uuid")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_entry(scope, "missing `uuid`"))?;
        let uuid = Uuid::parse_str(uuid_text)
            .map_err(|_| invalid_entry(scope, "malformed `uuid`"))?;

        let position = match entry.get(&self.position_key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_i64()
                    .ok_or_else(|| invalid_entry(scope, "non-integer position"))?,
            ),
        };

        let created_at = entry
            .get("created_at")
            .and_then(Value::as_i64)
            .ok_or_else(|| invalid_entry(scope, "missing `created_at`"))?;

        Ok(Item {
            uuid,
            scope_uuid: scope,
            position,
            created_at,
        })
    }

    fn item_to_entry(&self, item: &Item) -> Value {
        let mut fields = Map::new();
        fields.insert("uuid".to_string(), Value::from(item.uuid.to_string()));
        fields.insert(
            self.position_key.clone(),
            item.position.map_or(Value::Null, Value::from),
        );
        fields.insert("created_at".to_string(), Value::from(item.created_at));
        Value::Object(fields)
    }

    fn entry_uuid(scope: ScopeId, entry: &Value) -> RepoResult<ItemId> {
        let uuid_text = entry
            .get("uuid")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_entry(scope, "missing `uuid`"))?;
        Uuid::parse_str(uuid_text).map_err(|_| invalid_entry(scope, "malformed `uuid`"))
    }

    fn items_of(&self, scope: ScopeId) -> RepoResult<Vec<Item>> {
        let entries = self.read_doc(scope)?;
        entries
            .iter()
            .map(|entry| self.entry_to_item(scope, entry))
            .collect()
    }
}

impl ItemRepository for SqliteEmbeddedItemRepository<'_> {
    fn create_scope(&self, label: &str) -> RepoResult<ScopeId> {
        let scope = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO scope_docs (scope_uuid, label, doc) VALUES (?1, ?2, '[]');",
            params![scope.to_string(), label],
        )?;
        Ok(scope)
    }

    fn insert_item(&self, item: &Item) -> RepoResult<()> {
        let mut entries = self.read_doc(item.scope_uuid)?;
        entries.push(self.item_to_entry(item));
        self.write_doc(item.scope_uuid, &entries)
    }

    fn delete_item(&self, item: &Item) -> RepoResult<()> {
        let entries = self.read_doc(item.scope_uuid)?;
        let mut kept = Vec::with_capacity(entries.len());
        let mut found = false;
        for entry in entries {
            if Self::entry_uuid(item.scope_uuid, &entry)? == item.uuid {
                found = true;
                continue;
            }
            kept.push(entry);
        }
        if !found {
            return Err(RepoError::ItemNotFound(item.uuid));
        }
        self.write_doc(item.scope_uuid, &kept)
    }

    fn find_item(&self, scope: ScopeId, id: ItemId) -> RepoResult<Option<Item>> {
        Ok(self
            .items_of(scope)?
            .into_iter()
            .find(|item| item.uuid == id))
    }

    fn siblings_of(&self, item: &Item) -> RepoResult<Vec<Item>> {
        let mut items = self.items_of(item.scope_uuid)?;
        items.sort_by_key(|sibling| {
            (
                sibling.position.is_none(),
                sibling.position.unwrap_or(0),
                sibling.created_at,
                sibling.uuid,
            )
        });
        Ok(items)
    }

    fn load_position(&self, item: &Item) -> RepoResult<Option<i64>> {
        self.find_item(item.scope_uuid, item.uuid)?
            .map(|stored| stored.position)
            .ok_or(RepoError::ItemNotFound(item.uuid))
    }

    fn write_position(&self, item: &Item, position: Option<i64>) -> RepoResult<()> {
        let mut entries = self.read_doc(item.scope_uuid)?;
        let mut found = false;
        for entry in &mut entries {
            if Self::entry_uuid(item.scope_uuid, entry)? != item.uuid {
                continue;
            }
            found = true;
            if let Value::Object(fields) = entry {
                fields.insert(
                    self.position_key.clone(),
                    position.map_or(Value::Null, Value::from),
                );
            }
        }
        if !found {
            return Err(RepoError::ItemNotFound(item.uuid));
        }
        self.write_doc(item.scope_uuid, &entries)
    }

    fn bulk_shift(&self, scope: ScopeId, range: PositionRange, delta: i64) -> RepoResult<()> {
        let mut entries = self.read_doc(scope)?;
        for entry in &mut entries {
            let current = self.entry_to_item(scope, entry)?.position;
            let Some(current) = current else {
                continue;
            };
            if !range.matches(current) {
                continue;
            }
            if let Value::Object(fields) = entry {
                fields.insert(self.position_key.clone(), Value::from(current + delta));
            }
        }
        self.write_doc(scope, &entries)
    }

    fn reload_item(&self, item: &mut Item) -> RepoResult<()> {
        let stored = self
            .find_item(item.scope_uuid, item.uuid)?
            .ok_or(RepoError::ItemNotFound(item.uuid))?;
        *item = stored;
        Ok(())
    }

    fn count_in_list(&self, scope: ScopeId) -> RepoResult<i64> {
        let count = self
            .items_of(scope)?
            .iter()
            .filter(|item| item.is_in_list())
            .count();
        Ok(count as i64)
    }

    fn order_by_position(
        &self,
        scope: ScopeId,
        direction: SortDirection,
    ) -> RepoResult<Vec<Item>> {
        let mut items: Vec<Item> = self
            .items_of(scope)?
            .into_iter()
            .filter(Item::is_in_list)
            .collect();
        items.sort_by_key(|item| (item.position, item.created_at, item.uuid));
        if direction == SortDirection::Descending {
            items.reverse();
        }
        Ok(items)
    }

    fn is_embedded(&self) -> bool {
        true
    }
}

fn invalid_entry(scope: ScopeId, detail: &str) -> RepoError {
    RepoError::InvalidData(format!("{detail} in document entry of scope {scope}"))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'scope_docs'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable("scope_docs"));
    }

    Ok(())
}
