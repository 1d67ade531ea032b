//! SQLite-backed contact store

use crate::ops::{Field, Operation, RowRef};
use crate::{ContactStore, GroupRow, NewGroup, Result, StoreError};
use sqlx::SqlitePool;

/// Contact store backed by an SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ContactStore for SqliteStore {
    async fn group_rows(&self) -> Result<Vec<GroupRow>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT id, title
            FROM groups
            WHERE deleted = 0 AND visible = 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title)| GroupRow { id, title })
            .collect())
    }

    async fn insert_group(&self, group: &NewGroup) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO groups (title, visible, deleted, account_name, account_type)
            VALUES (?, ?, 0, ?, ?)
            "#,
        )
        .bind(&group.title)
        .bind(group.visible)
        .bind(&group.account_name)
        .bind(&group.account_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Apply a batch inside a single transaction. Back references are
    /// resolved to real row ids as parent inserts execute; any failure
    /// rolls the whole batch back.
    async fn apply_batch(&self, ops: &[Operation]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Row id produced by each operation so far; only insert-parent
        // operations yield a referenceable id.
        let mut row_ids: Vec<Option<i64>> = Vec::with_capacity(ops.len());

        for (index, op) in ops.iter().enumerate() {
            match op {
                Operation::InsertContact {
                    account_name,
                    account_type,
                } => {
                    let result = sqlx::query(
                        "INSERT INTO raw_contacts (account_name, account_type) VALUES (?, ?)",
                    )
                    .bind(account_name)
                    .bind(account_type)
                    .execute(&mut *tx)
                    .await?;

                    row_ids.push(Some(result.last_insert_rowid()));
                }
                Operation::InsertData { contact, field } => {
                    let raw_contact_id = resolve(*contact, &row_ids, index)?;

                    let query = match field {
                        Field::StructuredName { display_name } => sqlx::query(
                            r#"
                            INSERT INTO contact_data (raw_contact_id, kind, display_name)
                            VALUES (?, ?, ?)
                            "#,
                        )
                        .bind(raw_contact_id)
                        .bind(field.kind())
                        .bind(display_name),
                        Field::Phone { number, subtype } => sqlx::query(
                            r#"
                            INSERT INTO contact_data (raw_contact_id, kind, phone_number, phone_subtype)
                            VALUES (?, ?, ?, ?)
                            "#,
                        )
                        .bind(raw_contact_id)
                        .bind(field.kind())
                        .bind(number)
                        .bind(subtype.as_str()),
                        Field::GroupMembership { group_id } => sqlx::query(
                            r#"
                            INSERT INTO contact_data (raw_contact_id, kind, group_id)
                            VALUES (?, ?, ?)
                            "#,
                        )
                        .bind(raw_contact_id)
                        .bind(field.kind())
                        .bind(group_id),
                    };

                    query.execute(&mut *tx).await?;
                    row_ids.push(None);
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Resolve a row reference against the parent ids inserted so far.
/// A back reference must point at an earlier insert-parent operation.
fn resolve(contact: RowRef, row_ids: &[Option<i64>], index: usize) -> Result<i64> {
    match contact {
        RowRef::Id(id) => Ok(id),
        RowRef::BackRef(position) => {
            if position >= index {
                return Err(StoreError::BackRef(format!(
                    "operation {} references position {} which does not precede it",
                    index, position
                )));
            }
            row_ids[position].ok_or_else(|| {
                StoreError::BackRef(format!(
                    "operation {} references position {} which is not an insert-parent operation",
                    index, position
                ))
            })
        }
    }
}
