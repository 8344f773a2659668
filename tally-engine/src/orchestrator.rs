//! Transaction orchestrator: the state machine that fans one business
//! event out into ledger entries and aggregate updates, atomically.

use rusqlite::Transaction;
use rust_decimal::Decimal;
use tally_core::{
    validate_amount, CounterpartyId, CounterpartyTxn, Customer, CustomerId, ExpenseKind,
    InvoiceStatus, MainAccountTxn, PartyKind, Purchase, Sale, SourceKind, Supplier, SupplierId,
    TxnKind,
};
use tally_ledger::{counterparty, invoice, main_account, party, LedgerStore};
use tracing::{info, warn};
use uuid::Uuid;

use crate::effects::{counterparty_effect, CounterpartyEffect};
use crate::locks::{LockKey, LockRegistry};
use crate::resolver;
use crate::{EngineError, EngineResult};

/// Default bound on optimistic retries before surfacing `Conflict`.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The consistency engine. Cheap to clone; clones share the lock registry.
#[derive(Clone)]
pub struct Engine {
    store: LedgerStore,
    locks: LockRegistry,
    max_retries: u32,
}

impl Engine {
    pub fn new(store: LedgerStore) -> Self {
        Self::with_max_retries(store, DEFAULT_MAX_RETRIES)
    }

    pub fn with_max_retries(store: LedgerStore, max_retries: u32) -> Self {
        Self {
            store,
            locks: LockRegistry::new(),
            max_retries,
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub(crate) fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Re-run `attempt` while it fails with `Conflict`, up to the bound.
    pub(crate) fn with_retries<T>(
        &self,
        operation: &str,
        mut attempt: impl FnMut() -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut tries = 0;
        loop {
            match attempt() {
                Err(EngineError::Conflict(message)) if tries < self.max_retries => {
                    tries += 1;
                    warn!(operation, tries, %message, "conflict, retrying");
                }
                other => return other,
            }
        }
    }

    /// Record a payment/refund/adjustment (or originating sale/purchase)
    /// against one counterparty. See the sign-convention tables in
    /// [`crate::effects`].
    pub fn record_counterparty_txn(
        &self,
        counterparty_id: CounterpartyId,
        kind: TxnKind,
        amount: Decimal,
        reference_id: Option<Uuid>,
        description: Option<String>,
    ) -> EngineResult<CounterpartyTxn> {
        validate_amount(amount)?;
        let party = counterparty_id.party_kind();
        let effect = counterparty_effect(party, kind, amount).ok_or_else(|| {
            EngineError::InvalidArgument(format!("{kind} is not a valid {party} transaction"))
        })?;

        let mut keys = vec![LockKey::from(counterparty_id)];
        if effect.main_account.is_some() {
            keys.push(LockKey::MainAccount);
        }
        self.locks.with_locks(keys, || {
            self.with_retries("record_counterparty_txn", || {
                self.try_counterparty_txn(
                    counterparty_id,
                    kind,
                    amount,
                    effect,
                    reference_id,
                    description.clone(),
                )
            })
        })
    }

    fn try_counterparty_txn(
        &self,
        counterparty_id: CounterpartyId,
        kind: TxnKind,
        amount: Decimal,
        effect: CounterpartyEffect,
        reference_id: Option<Uuid>,
        description: Option<String>,
    ) -> EngineResult<CounterpartyTxn> {
        let reader = self.store.reader()?;
        let position = resolver::resolve_counterparty(&reader, counterparty_id)?;
        if let Some(reference) = reference_id {
            ensure_reference_exists(&reader, counterparty_id, reference)?;
        }
        let main_position = if effect.main_account.is_some() {
            Some(resolver::resolve_main(&reader)?)
        } else {
            None
        };
        drop(reader);

        let new_balance = position.balance + effect.balance_delta;
        let mut new_secondary = position.secondary + effect.secondary_delta;
        if counterparty_id.party_kind() == PartyKind::Supplier && new_secondary < Decimal::ZERO {
            new_secondary = Decimal::ZERO;
        }

        let entry = self.store.with_write_tx(|tx| {
            resolver::check_counterparty_head(tx, counterparty_id, position.head)?;
            let mut entry = CounterpartyTxn::new(counterparty_id, kind, amount);
            entry.balance_after = new_balance;
            entry.reference_id = reference_id;
            entry.description = description.clone();
            counterparty::append(tx, &mut entry)?;

            if let (Some((direction, source)), Some(main_position)) =
                (effect.main_account, main_position.as_ref())
            {
                resolver::check_main_head(tx, main_position.head)?;
                let mut mirror = MainAccountTxn::new(direction, source, amount);
                mirror.balance_after = main_position.balance + direction.signed(amount);
                mirror.source_id = Some(counterparty_id.uuid());
                mirror.reference_id = reference_id;
                mirror.description = description.clone();
                main_account::append(tx, &mut mirror)?;
                main_account::write_balance(tx, mirror.balance_after)?;
            }

            match counterparty_id {
                CounterpartyId::Customer(id) => {
                    party::update_customer_position(tx, id, new_balance, new_secondary)?
                }
                CounterpartyId::Supplier(id) => {
                    party::update_supplier_position(tx, id, new_balance, new_secondary)?
                }
            }

            if kind == TxnKind::Payment {
                if let Some(reference) = reference_id {
                    apply_payment_to_header(tx, counterparty_id, reference, amount)?;
                }
            }
            Ok::<_, EngineError>(entry)
        })?;

        info!(
            %counterparty_id,
            kind = %kind,
            %amount,
            sequence = entry.sequence,
            balance_after = %entry.balance_after,
            "recorded counterparty transaction"
        );
        Ok(entry)
    }

    /// Create a sale header and its originating ledger entry. Cash has not
    /// moved yet, so no main-account entry is written.
    pub fn record_sale(
        &self,
        customer_id: CustomerId,
        invoice_no: impl Into<String>,
        total: Decimal,
        description: Option<String>,
    ) -> EngineResult<(Sale, CounterpartyTxn)> {
        validate_amount(total)?;
        if total.is_zero() {
            return Err(EngineError::InvalidArgument(
                "sale total must be positive".into(),
            ));
        }
        let invoice_no = invoice_no.into();
        let counterparty_id = CounterpartyId::from(customer_id);
        self.locks
            .with_locks(vec![LockKey::from(counterparty_id)], || {
                self.with_retries("record_sale", || {
                    let reader = self.store.reader()?;
                    let position = resolver::resolve_counterparty(&reader, counterparty_id)?;
                    drop(reader);

                    let sale = Sale::new(customer_id, invoice_no.clone(), total);
                    let new_balance = position.balance + total;
                    let new_receivable = position.secondary + total;
                    let created = self.store.with_write_tx(|tx| {
                        resolver::check_counterparty_head(tx, counterparty_id, position.head)?;
                        invoice::insert_sale(tx, &sale)?;
                        let mut entry =
                            CounterpartyTxn::new(counterparty_id, TxnKind::Sale, total);
                        entry.balance_after = new_balance;
                        entry.reference_id = Some(sale.id.into());
                        entry.description = description.clone();
                        counterparty::append(tx, &mut entry)?;
                        party::update_customer_position(
                            tx,
                            customer_id,
                            new_balance,
                            new_receivable,
                        )?;
                        Ok::<_, EngineError>((sale.clone(), entry))
                    })?;
                    info!(
                        %customer_id,
                        invoice_no = %created.0.invoice_no,
                        total = %total,
                        "recorded sale"
                    );
                    Ok(created)
                })
            })
    }

    /// Create a purchase header and its originating ledger entry.
    pub fn record_purchase(
        &self,
        supplier_id: SupplierId,
        invoice_no: impl Into<String>,
        total: Decimal,
        description: Option<String>,
    ) -> EngineResult<(Purchase, CounterpartyTxn)> {
        validate_amount(total)?;
        if total.is_zero() {
            return Err(EngineError::InvalidArgument(
                "purchase total must be positive".into(),
            ));
        }
        let invoice_no = invoice_no.into();
        let counterparty_id = CounterpartyId::from(supplier_id);
        self.locks
            .with_locks(vec![LockKey::from(counterparty_id)], || {
                self.with_retries("record_purchase", || {
                    let reader = self.store.reader()?;
                    let position = resolver::resolve_counterparty(&reader, counterparty_id)?;
                    drop(reader);

                    let purchase = Purchase::new(supplier_id, invoice_no.clone(), total);
                    let new_balance = position.balance - total;
                    let new_debt = position.secondary + total;
                    let created = self.store.with_write_tx(|tx| {
                        resolver::check_counterparty_head(tx, counterparty_id, position.head)?;
                        invoice::insert_purchase(tx, &purchase)?;
                        let mut entry =
                            CounterpartyTxn::new(counterparty_id, TxnKind::Purchase, total);
                        entry.balance_after = new_balance;
                        entry.reference_id = Some(purchase.id.into());
                        entry.description = description.clone();
                        counterparty::append(tx, &mut entry)?;
                        party::update_supplier_position(tx, supplier_id, new_balance, new_debt)?;
                        Ok::<_, EngineError>((purchase.clone(), entry))
                    })?;
                    info!(
                        %supplier_id,
                        invoice_no = %created.0.invoice_no,
                        total = %total,
                        "recorded purchase"
                    );
                    Ok(created)
                })
            })
    }

    /// Record an expense directly against the main account.
    pub fn record_expense(
        &self,
        kind: ExpenseKind,
        amount: Decimal,
        description: Option<String>,
    ) -> EngineResult<MainAccountTxn> {
        validate_amount(amount)?;
        if amount.is_zero() {
            return Err(EngineError::InvalidArgument(
                "expense amount must be positive".into(),
            ));
        }
        self.locks.with_locks(vec![LockKey::MainAccount], || {
            self.with_retries("record_expense", || {
                let reader = self.store.reader()?;
                let position = resolver::resolve_main(&reader)?;
                drop(reader);

                let direction = kind.direction();
                let entry = self.store.with_write_tx(|tx| {
                    resolver::check_main_head(tx, position.head)?;
                    let mut entry = MainAccountTxn::new(direction, SourceKind::Expense, amount);
                    entry.balance_after = position.balance + direction.signed(amount);
                    entry.description = description.clone();
                    main_account::append(tx, &mut entry)?;
                    main_account::write_balance(tx, entry.balance_after)?;
                    Ok::<_, EngineError>(entry)
                })?;
                info!(
                    direction = %direction,
                    %amount,
                    balance_after = %entry.balance_after,
                    "recorded expense"
                );
                Ok(entry)
            })
        })
    }
}

fn ensure_reference_exists(
    conn: &rusqlite::Connection,
    counterparty_id: CounterpartyId,
    reference: Uuid,
) -> EngineResult<()> {
    let found = match counterparty_id.party_kind() {
        PartyKind::Customer => invoice::find_sale(conn, reference.into())?.is_some(),
        PartyKind::Supplier => invoice::find_purchase(conn, reference.into())?.is_some(),
    };
    if !found {
        return Err(EngineError::NotFound(format!(
            "referenced invoice {reference}"
        )));
    }
    Ok(())
}

/// Payments carrying an invoice reference also settle the header.
fn apply_payment_to_header(
    tx: &Transaction<'_>,
    counterparty_id: CounterpartyId,
    reference: Uuid,
    amount: Decimal,
) -> EngineResult<()> {
    match counterparty_id.party_kind() {
        PartyKind::Customer => {
            let sale = invoice::find_sale(tx, reference.into())?
                .ok_or_else(|| EngineError::NotFound(format!("referenced invoice {reference}")))?;
            let paid = sale.paid + amount;
            let status = if paid >= sale.total {
                InvoiceStatus::Paid
            } else {
                sale.status
            };
            invoice::update_sale_payment(tx, sale.id, paid, status)?;
        }
        PartyKind::Supplier => {
            let purchase = invoice::find_purchase(tx, reference.into())?
                .ok_or_else(|| EngineError::NotFound(format!("referenced invoice {reference}")))?;
            let paid = purchase.paid + amount;
            let status = if paid >= purchase.total {
                InvoiceStatus::Paid
            } else {
                purchase.status
            };
            invoice::update_purchase_payment(tx, purchase.id, paid, status)?;
        }
    }
    Ok(())
}

impl Engine {
    /// Register a customer with optional opening balance.
    pub fn create_customer(
        &self,
        name: impl Into<String>,
        phone: Option<String>,
        opening_balance: Option<Decimal>,
    ) -> EngineResult<Customer> {
        let mut customer = Customer::new(name);
        customer.phone = phone;
        if let Some(opening) = opening_balance {
            validate_amount(opening)?;
            customer = customer.with_opening_balance(opening);
        }
        self.store
            .with_write_tx(|tx| party::insert_customer(tx, &customer))?;
        info!(customer_id = %customer.id, name = %customer.name, "created customer");
        Ok(customer)
    }

    /// Register a supplier.
    pub fn create_supplier(
        &self,
        name: impl Into<String>,
        phone: Option<String>,
    ) -> EngineResult<Supplier> {
        let mut supplier = Supplier::new(name);
        supplier.phone = phone;
        self.store
            .with_write_tx(|tx| party::insert_supplier(tx, &supplier))?;
        info!(supplier_id = %supplier.id, name = %supplier.name, "created supplier");
        Ok(supplier)
    }

    pub fn customer(&self, id: CustomerId) -> EngineResult<Customer> {
        let conn = self.store.reader()?;
        party::find_customer(&conn, id)?
            .ok_or_else(|| EngineError::NotFound(format!("customer {id}")))
    }

    pub fn supplier(&self, id: SupplierId) -> EngineResult<Supplier> {
        let conn = self.store.reader()?;
        party::find_supplier(&conn, id)?
            .ok_or_else(|| EngineError::NotFound(format!("supplier {id}")))
    }

    /// Ledger history for one counterparty, oldest first.
    pub fn counterparty_ledger(
        &self,
        counterparty_id: CounterpartyId,
        limit: Option<usize>,
    ) -> EngineResult<Vec<CounterpartyTxn>> {
        let conn = self.store.reader()?;
        // Surface NotFound for unknown entities rather than an empty list.
        resolver::resolve_counterparty(&conn, counterparty_id)?;
        Ok(counterparty::list_for(&conn, counterparty_id, limit)?)
    }
}
