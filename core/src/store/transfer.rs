use super::{LedgerStore, Transfer};
use crate::{
    error::{LedgerError, LedgerResult},
    transfer::{self, TransferParams, TransferResult},
    types::{Page, TransferId},
};
use rusqlite::{params, OptionalExtension, Row};

pub(super) const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";

pub(super) fn transfer_from_row(row: &Row<'_>) -> rusqlite::Result<Transfer> {
    Ok(Transfer {
        id: row.get(0)?,
        from_account_id: row.get(1)?,
        to_account_id: row.get(2)?,
        amount: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl LedgerStore {
    // ── Transfer ──────────────────────────────────────────────────

    /// Run one transfer attempt in its own unit of work.
    /// Commits on success; on any error the unit of work is dropped and
    /// rolled back, leaving no transfer, entry or balance change behind.
    pub fn execute_transfer(&mut self, params: &TransferParams) -> LedgerResult<TransferResult> {
        let uow = self.begin()?;
        let result = transfer::transfer(&uow, params)?;
        uow.commit()?;
        log::debug!(
            "transfer {}: {} -> {} amount={} committed",
            result.transfer.id,
            params.from_account_id,
            params.to_account_id,
            params.amount
        );
        Ok(result)
    }

    pub fn get_transfer(&self, transfer_id: TransferId) -> LedgerResult<Transfer> {
        self.conn
            .query_row(
                &format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = ?1"),
                params![transfer_id],
                transfer_from_row,
            )
            .optional()?
            .ok_or(LedgerError::TransferNotFound { transfer_id })
    }

    /// Transfers where either side belongs to `owner`.
    pub fn list_transfers(&self, owner: &str, page: Page) -> LedgerResult<Vec<Transfer>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.from_account_id, t.to_account_id, t.amount, t.created_at
             FROM transfers t
             WHERE t.from_account_id IN (SELECT id FROM accounts WHERE owner = ?1)
                OR t.to_account_id   IN (SELECT id FROM accounts WHERE owner = ?1)
             ORDER BY t.id ASC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![owner, page.limit(), page.offset()], transfer_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn transfer_count(&self) -> LedgerResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transfers", [], |row| row.get(0))?;
        Ok(count)
    }
}
