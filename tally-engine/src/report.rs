//! Read-only reporting over the main-account ledger.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::MainAccountTxn;
use tally_ledger::{main_account, MainAccountQuery};

use crate::orchestrator::Engine;
use crate::{resolver, EngineResult};

/// Default page size for the main-account listing.
pub const DEFAULT_REPORT_LIMIT: usize = 500;

/// Filtered main-account listing plus the authoritative cash position.
#[derive(Clone, Debug, Serialize)]
pub struct MainAccountReport {
    pub transactions: Vec<MainAccountTxn>,
    pub total_balance: Decimal,
}

/// Query covering the current calendar month, newest first.
pub fn current_month_query() -> MainAccountQuery {
    let now = Utc::now();
    let month_start = now
        .date_naive()
        .with_day(1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(now);
    MainAccountQuery::default()
        .with_time_range(Some(month_start), Some(now))
        .with_limit(DEFAULT_REPORT_LIMIT)
}

impl Engine {
    /// Main-account listing; defaults to the current calendar month with
    /// the standard limit when no query is supplied.
    pub fn main_account_report(
        &self,
        query: Option<MainAccountQuery>,
    ) -> EngineResult<MainAccountReport> {
        let query = query.unwrap_or_else(current_month_query);
        let conn = self.store().reader()?;
        let transactions = main_account::query(&conn, &query)?;
        let total_balance = resolver::resolve_main(&conn)?.balance;
        Ok(MainAccountReport {
            transactions,
            total_balance,
        })
    }

    /// Current cash position.
    pub fn main_balance(&self) -> EngineResult<Decimal> {
        let conn = self.store().reader()?;
        Ok(resolver::resolve_main(&conn)?.balance)
    }
}
