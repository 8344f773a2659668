//! Sale/purchase headers and their line items.

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tally_core::{
    InvoiceStatus, Purchase, PurchaseId, PurchaseItem, Sale, SaleId, SaleItem,
};
use uuid::Uuid;

use crate::codec::{parse_datetime, parse_decimal, parse_enum, parse_uuid};
use crate::StoreResult;

pub fn insert_sale(conn: &Connection, sale: &Sale) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO sales (id, customer_id, invoice_no, total, paid, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            sale.id.to_string(),
            sale.customer_id.to_string(),
            sale.invoice_no,
            sale.total.to_string(),
            sale.paid.to_string(),
            sale.status.as_str(),
            sale.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_sale(conn: &Connection, id: SaleId) -> StoreResult<Option<Sale>> {
    let row = conn
        .query_row(
            "SELECT id, customer_id, invoice_no, total, paid, status, created_at
             FROM sales WHERE id = ?1",
            params![id.to_string()],
            header_row,
        )
        .optional()?;
    let Some((id, party, invoice_no, total, paid, status, created_at)) = row else {
        return Ok(None);
    };
    Ok(Some(Sale {
        id: parse_uuid(&id)?.into(),
        customer_id: parse_uuid(&party)?.into(),
        invoice_no,
        total: parse_decimal(&total)?,
        paid: parse_decimal(&paid)?,
        status: parse_enum(&status)?,
        created_at: parse_datetime(&created_at)?,
    }))
}

pub fn update_sale_payment(
    conn: &Connection,
    id: SaleId,
    paid: Decimal,
    status: InvoiceStatus,
) -> StoreResult<()> {
    conn.execute(
        "UPDATE sales SET paid = ?1, status = ?2 WHERE id = ?3",
        params![paid.to_string(), status.as_str(), id.to_string()],
    )?;
    Ok(())
}

pub fn insert_purchase(conn: &Connection, purchase: &Purchase) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO purchases (id, supplier_id, invoice_no, total, paid, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            purchase.id.to_string(),
            purchase.supplier_id.to_string(),
            purchase.invoice_no,
            purchase.total.to_string(),
            purchase.paid.to_string(),
            purchase.status.as_str(),
            purchase.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_purchase(conn: &Connection, id: PurchaseId) -> StoreResult<Option<Purchase>> {
    let row = conn
        .query_row(
            "SELECT id, supplier_id, invoice_no, total, paid, status, created_at
             FROM purchases WHERE id = ?1",
            params![id.to_string()],
            header_row,
        )
        .optional()?;
    let Some((id, party, invoice_no, total, paid, status, created_at)) = row else {
        return Ok(None);
    };
    Ok(Some(Purchase {
        id: parse_uuid(&id)?.into(),
        supplier_id: parse_uuid(&party)?.into(),
        invoice_no,
        total: parse_decimal(&total)?,
        paid: parse_decimal(&paid)?,
        status: parse_enum(&status)?,
        created_at: parse_datetime(&created_at)?,
    }))
}

pub fn update_purchase_payment(
    conn: &Connection,
    id: PurchaseId,
    paid: Decimal,
    status: InvoiceStatus,
) -> StoreResult<()> {
    conn.execute(
        "UPDATE purchases SET paid = ?1, status = ?2 WHERE id = ?3",
        params![paid.to_string(), status.as_str(), id.to_string()],
    )?;
    Ok(())
}

type HeaderRow = (String, String, String, String, String, String, String);

fn header_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HeaderRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

pub fn insert_sale_item(conn: &Connection, item: &SaleItem) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO sale_items (id, sale_id, product_id, quantity, unit_price, total, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            item.id.to_string(),
            item.sale_id.to_string(),
            item.product_id.to_string(),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.total.to_string(),
            item.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_sale_item(conn: &Connection, id: Uuid) -> StoreResult<Option<SaleItem>> {
    let row = conn
        .query_row(
            "SELECT id, sale_id, product_id, quantity, unit_price, total, created_at
             FROM sale_items WHERE id = ?1",
            params![id.to_string()],
            header_row,
        )
        .optional()?;
    let Some((id, sale_id, product_id, quantity, unit_price, total, created_at)) = row else {
        return Ok(None);
    };
    Ok(Some(SaleItem {
        id: parse_uuid(&id)?,
        sale_id: parse_uuid(&sale_id)?.into(),
        product_id: parse_uuid(&product_id)?.into(),
        quantity: parse_decimal(&quantity)?,
        unit_price: parse_decimal(&unit_price)?,
        total: parse_decimal(&total)?,
        created_at: parse_datetime(&created_at)?,
    }))
}

pub fn update_sale_item(conn: &Connection, item: &SaleItem) -> StoreResult<()> {
    conn.execute(
        "UPDATE sale_items SET product_id = ?1, quantity = ?2, unit_price = ?3, total = ?4
         WHERE id = ?5",
        params![
            item.product_id.to_string(),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.total.to_string(),
            item.id.to_string(),
        ],
    )?;
    Ok(())
}

pub fn delete_sale_item(conn: &Connection, id: Uuid) -> StoreResult<()> {
    conn.execute("DELETE FROM sale_items WHERE id = ?1", params![id.to_string()])?;
    Ok(())
}

pub fn list_sale_items(conn: &Connection, sale_id: SaleId) -> StoreResult<Vec<SaleItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, sale_id, product_id, quantity, unit_price, total, created_at
         FROM sale_items WHERE sale_id = ?1 ORDER BY created_at ASC",
    )?;
    let mut rows = stmt.query(params![sale_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let (id, sale_id, product_id, quantity, unit_price, total, created_at) = header_row(row)?;
        items.push(SaleItem {
            id: parse_uuid(&id)?,
            sale_id: parse_uuid(&sale_id)?.into(),
            product_id: parse_uuid(&product_id)?.into(),
            quantity: parse_decimal(&quantity)?,
            unit_price: parse_decimal(&unit_price)?,
            total: parse_decimal(&total)?,
            created_at: parse_datetime(&created_at)?,
        });
    }
    Ok(items)
}

pub fn insert_purchase_item(conn: &Connection, item: &PurchaseItem) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO purchase_items (id, purchase_id, product_id, quantity, unit_price, total, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            item.id.to_string(),
            item.purchase_id.to_string(),
            item.product_id.to_string(),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.total.to_string(),
            item.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_purchase_item(conn: &Connection, id: Uuid) -> StoreResult<Option<PurchaseItem>> {
    let row = conn
        .query_row(
            "SELECT id, purchase_id, product_id, quantity, unit_price, total, created_at
             FROM purchase_items WHERE id = ?1",
            params![id.to_string()],
            header_row,
        )
        .optional()?;
    let Some((id, purchase_id, product_id, quantity, unit_price, total, created_at)) = row else {
        return Ok(None);
    };
    Ok(Some(PurchaseItem {
        id: parse_uuid(&id)?,
        purchase_id: parse_uuid(&purchase_id)?.into(),
        product_id: parse_uuid(&product_id)?.into(),
        quantity: parse_decimal(&quantity)?,
        unit_price: parse_decimal(&unit_price)?,
        total: parse_decimal(&total)?,
        created_at: parse_datetime(&created_at)?,
    }))
}

pub fn update_purchase_item(conn: &Connection, item: &PurchaseItem) -> StoreResult<()> {
    conn.execute(
        "UPDATE purchase_items SET product_id = ?1, quantity = ?2, unit_price = ?3, total = ?4
         WHERE id = ?5",
        params![
            item.product_id.to_string(),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.total.to_string(),
            item.id.to_string(),
        ],
    )?;
    Ok(())
}

pub fn delete_purchase_item(conn: &Connection, id: Uuid) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM purchase_items WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(())
}
