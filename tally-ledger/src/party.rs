//! Aggregate rows for customers and suppliers.

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tally_core::{Customer, CustomerId, Supplier, SupplierId};

use crate::codec::{parse_datetime, parse_decimal, parse_uuid};
use crate::StoreResult;

pub fn insert_customer(conn: &Connection, customer: &Customer) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO customers (
            id, name, phone, opening_balance, current_balance, receivable, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            customer.id.to_string(),
            customer.name,
            customer.phone,
            customer.opening_balance.to_string(),
            customer.current_balance.to_string(),
            customer.receivable.to_string(),
            customer.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_customer(conn: &Connection, id: CustomerId) -> StoreResult<Option<Customer>> {
    let row = conn
        .query_row(
            "SELECT id, name, phone, opening_balance, current_balance, receivable, created_at
             FROM customers WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;
    let Some((id, name, phone, opening, current, receivable, created_at)) = row else {
        return Ok(None);
    };
    Ok(Some(Customer {
        id: parse_uuid(&id)?.into(),
        name,
        phone,
        opening_balance: parse_decimal(&opening)?,
        current_balance: parse_decimal(&current)?,
        receivable: parse_decimal(&receivable)?,
        created_at: parse_datetime(&created_at)?,
    }))
}

/// Mutate the customer summary to match the new ledger state; called only
/// inside the same atomic unit as the ledger append.
pub fn update_customer_position(
    conn: &Connection,
    id: CustomerId,
    balance: Decimal,
    receivable: Decimal,
) -> StoreResult<()> {
    conn.execute(
        "UPDATE customers SET current_balance = ?1, receivable = ?2 WHERE id = ?3",
        params![balance.to_string(), receivable.to_string(), id.to_string()],
    )?;
    Ok(())
}

pub fn insert_supplier(conn: &Connection, supplier: &Supplier) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO suppliers (
            id, name, phone, opening_balance, current_balance, debt, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            supplier.id.to_string(),
            supplier.name,
            supplier.phone,
            supplier.opening_balance.to_string(),
            supplier.current_balance.to_string(),
            supplier.debt.to_string(),
            supplier.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_supplier(conn: &Connection, id: SupplierId) -> StoreResult<Option<Supplier>> {
    let row = conn
        .query_row(
            "SELECT id, name, phone, opening_balance, current_balance, debt, created_at
             FROM suppliers WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;
    let Some((id, name, phone, opening, current, debt, created_at)) = row else {
        return Ok(None);
    };
    Ok(Some(Supplier {
        id: parse_uuid(&id)?.into(),
        name,
        phone,
        opening_balance: parse_decimal(&opening)?,
        current_balance: parse_decimal(&current)?,
        debt: parse_decimal(&debt)?,
        created_at: parse_datetime(&created_at)?,
    }))
}

/// Mirror of [`update_customer_position`] for the supplier side.
pub fn update_supplier_position(
    conn: &Connection,
    id: SupplierId,
    balance: Decimal,
    debt: Decimal,
) -> StoreResult<()> {
    conn.execute(
        "UPDATE suppliers SET current_balance = ?1, debt = ?2 WHERE id = ?3",
        params![balance.to_string(), debt.to_string(), id.to_string()],
    )?;
    Ok(())
}
