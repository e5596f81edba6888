use super::{Entry, LedgerStore};
use crate::{
    error::{LedgerError, LedgerResult},
    types::{AccountId, Amount, EntryId, Page, TransferId},
};
use rusqlite::{params, OptionalExtension, Row};

pub(super) const ENTRY_COLUMNS: &str = "id, account_id, transfer_id, amount, created_at";

pub(super) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        account_id: row.get(1)?,
        transfer_id: row.get(2)?,
        amount: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl LedgerStore {
    // ── Entry ─────────────────────────────────────────────────────

    pub fn get_entry(&self, entry_id: EntryId) -> LedgerResult<Entry> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![entry_id],
                entry_from_row,
            )
            .optional()?
            .ok_or(LedgerError::EntryNotFound { entry_id })
    }

    pub fn list_entries(&self, account_id: AccountId, page: Page) -> LedgerResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE account_id = ?1
             ORDER BY id ASC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(
            params![account_id, page.limit(), page.offset()],
            entry_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// The debit and credit lines written for one transfer, by id.
    pub fn entries_for_transfer(&self, transfer_id: TransferId) -> LedgerResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE transfer_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![transfer_id], entry_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Sum of every committed entry on the account. Equals the balance.
    pub fn entry_sum(&self, account_id: AccountId) -> LedgerResult<Amount> {
        let sum: Amount = self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM entries WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    pub fn entry_count(&self) -> LedgerResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count)
    }
}
