//! Referenced-shape repository: items as independent rows.
//!
//! # Responsibility
//! - Persist items in the `items` table keyed by a scope foreign key.
//! - Translate position range predicates into single-UPDATE bulk shifts.
//!
//! # Invariants
//! - The configured position attribute must exist as a column in `items`;
//!   construction fails otherwise.
//! - Sibling updates happen out-of-band from the item in hand; callers must
//!   reload to observe shifted rows.

use crate::config::ListConfig;
use crate::db::migrations::latest_version;
use crate::model::item::{Item, ItemId, ScopeId, SortDirection};
use crate::repo::item_repo::{ItemRepository, PositionRange, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// SQLite-backed repository for the referenced storage shape.
#[derive(Debug)]
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
    position_column: String,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates a repository from a migrated connection.
    ///
    /// Validates the configured position field name and verifies that the
    /// schema carries it as a column before any data access happens.
    pub fn try_new(conn: &'conn Connection, config: &ListConfig) -> RepoResult<Self> {
        config.validate()?;
        ensure_connection_ready(conn, &config.position_field_name)?;
        Ok(Self {
            conn,
            position_column: config.position_field_name.clone(),
        })
    }

    /// Returns the column name used for positions.
    pub fn position_column(&self) -> &str {
        &self.position_column
    }

    fn ensure_scope_exists(&self, scope: ScopeId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM scopes WHERE scope_uuid = ?1);",
            [scope.to_string()],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Ok(())
        } else {
            Err(RepoError::ScopeNotFound(scope))
        }
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT uuid, scope_uuid, {col} AS list_position, created_at FROM items",
            col = self.position_column
        )
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_scope(&self, label: &str) -> RepoResult<ScopeId> {
        let scope = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO scopes (scope_uuid, label) VALUES (?1, ?2);",
            params![scope.to_string(), label],
        )?;
        Ok(scope)
    }

    fn insert_item(&self, item: &Item) -> RepoResult<()> {
        self.ensure_scope_exists(item.scope_uuid)?;
        self.conn.execute(
            &format!(
                "INSERT INTO items (uuid, scope_uuid, {col}, created_at)
                 VALUES (?1, ?2, ?3, ?4);",
                col = self.position_column
            ),
            params![
                item.uuid.to_string(),
                item.scope_uuid.to_string(),
                item.position,
                item.created_at,
            ],
        )?;
        Ok(())
    }

    fn delete_item(&self, item: &Item) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM items WHERE uuid = ?1;",
            [item.uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::ItemNotFound(item.uuid));
        }
        Ok(())
    }

    fn find_item(&self, scope: ScopeId, id: ItemId) -> RepoResult<Option<Item>> {
        self.ensure_scope_exists(scope)?;
        let sql = format!(
            "{select} WHERE uuid = ?1 AND scope_uuid = ?2;",
            select = self.select_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id.to_string(), scope.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn siblings_of(&self, item: &Item) -> RepoResult<Vec<Item>> {
        self.ensure_scope_exists(item.scope_uuid)?;
        let sql = format!(
            "{select}
             WHERE scope_uuid = ?1
             ORDER BY ({col} IS NULL) ASC, {col} ASC, created_at ASC, uuid ASC;",
            select = self.select_sql(),
            col = self.position_column
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([item.scope_uuid.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn load_position(&self, item: &Item) -> RepoResult<Option<i64>> {
        let sql = format!(
            "SELECT {col} FROM items WHERE uuid = ?1;",
            col = self.position_column
        );
        let position: Option<Option<i64>> = self
            .conn
            .query_row(&sql, [item.uuid.to_string()], |row| row.get(0))
            .optional()?;
        position.ok_or(RepoError::ItemNotFound(item.uuid))
    }

    fn write_position(&self, item: &Item, position: Option<i64>) -> RepoResult<()> {
        let sql = format!(
            "UPDATE items SET {col} = ?1 WHERE uuid = ?2;",
            col = self.position_column
        );
        let changed = self
            .conn
            .execute(&sql, params![position, item.uuid.to_string()])?;
        if changed == 0 {
            return Err(RepoError::ItemNotFound(item.uuid));
        }
        Ok(())
    }

    fn bulk_shift(&self, scope: ScopeId, range: PositionRange, delta: i64) -> RepoResult<()> {
        self.ensure_scope_exists(scope)?;
        let (clause, bounds) = range_clause(&self.position_column, range);
        let sql = format!(
            "UPDATE items
             SET {col} = {col} + ?1
             WHERE scope_uuid = ?2
               AND {col} IS NOT NULL
               AND {clause};",
            col = self.position_column
        );

        let mut bind_values: Vec<Value> =
            vec![Value::Integer(delta), Value::Text(scope.to_string())];
        bind_values.extend(bounds.into_iter().map(Value::Integer));
        self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(())
    }

    fn reload_item(&self, item: &mut Item) -> RepoResult<()> {
        let sql = format!("{select} WHERE uuid = ?1;", select = self.select_sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([item.uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            *item = parse_item_row(row)?;
            return Ok(());
        }
        Err(RepoError::ItemNotFound(item.uuid))
    }

    fn count_in_list(&self, scope: ScopeId) -> RepoResult<i64> {
        self.ensure_scope_exists(scope)?;
        let sql = format!(
            "SELECT COUNT(*) FROM items WHERE scope_uuid = ?1 AND {col} IS NOT NULL;",
            col = self.position_column
        );
        let count = self
            .conn
            .query_row(&sql, [scope.to_string()], |row| row.get(0))?;
        Ok(count)
    }

    fn order_by_position(
        &self,
        scope: ScopeId,
        direction: SortDirection,
    ) -> RepoResult<Vec<Item>> {
        self.ensure_scope_exists(scope)?;
        // Descending mirrors the ascending enumeration exactly, so every
        // sort key flips together.
        let order = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let sql = format!(
            "{select}
             WHERE scope_uuid = ?1
               AND {col} IS NOT NULL
             ORDER BY {col} {order}, created_at {order}, uuid {order};",
            select = self.select_sql(),
            col = self.position_column
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([scope.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn is_embedded(&self) -> bool {
        false
    }
}

fn range_clause(column: &str, range: PositionRange) -> (String, Vec<i64>) {
    match range {
        PositionRange::Above(bound) => (format!("{column} > ?3"), vec![bound]),
        PositionRange::AtOrAbove(bound) => (format!("{column} >= ?3"), vec![bound]),
        PositionRange::FromUntil { from, until } => {
            (format!("{column} >= ?3 AND {column} < ?4"), vec![from, until])
        }
        PositionRange::AfterThrough { after, through } => (
            format!("{column} > ?3 AND {column} <= ?4"),
            vec![after, through],
        ),
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "items.uuid")?;
    let scope_text: String = row.get("scope_uuid")?;
    let scope_uuid = parse_uuid(&scope_text, "items.scope_uuid")?;

    Ok(Item {
        uuid,
        scope_uuid,
        position: row.get("list_position")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_connection_ready(conn: &Connection, position_column: &str) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["scopes", "items"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in ["uuid", "scope_uuid", "created_at"] {
        if !table_has_column(conn, "items", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "items",
                column: column.to_string(),
            });
        }
    }

    // The position attribute is config-driven; a renamed field requires the
    // host schema to carry the matching column.
    if !table_has_column(conn, "items", position_column)? {
        return Err(RepoError::MissingRequiredColumn {
            table: "items",
            column: position_column.to_string(),
        });
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::SqliteItemRepository;
    use crate::config::ListConfig;
    use crate::db::open_db_in_memory;
    use crate::repo::item_repo::RepoError;

    #[test]
    fn try_new_rejects_unsafe_field_name() {
        let conn = open_db_in_memory().unwrap();
        let mut config = ListConfig::default();
        config.position_field_name = "position--".to_string();
        let err = SqliteItemRepository::try_new(&conn, &config).unwrap_err();
        assert!(matches!(err, RepoError::Config(_)));
    }

    #[test]
    fn try_new_rejects_missing_position_column() {
        let conn = open_db_in_memory().unwrap();
        let mut config = ListConfig::default();
        config.position_field_name = "ordinal".to_string();
        let err = SqliteItemRepository::try_new(&conn, &config).unwrap_err();
        assert!(matches!(
            err,
            RepoError::MissingRequiredColumn { table: "items", ref column } if column == "ordinal"
        ));
    }

    #[test]
    fn try_new_accepts_renamed_column_after_host_migration() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("ALTER TABLE items ADD COLUMN ordinal INTEGER;")
            .unwrap();
        let mut config = ListConfig::default();
        config.position_field_name = "ordinal".to_string();
        let repo = SqliteItemRepository::try_new(&conn, &config).unwrap();
        assert_eq!(repo.position_column(), "ordinal");
    }
}
