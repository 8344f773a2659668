//! Product aggregate rows.

use rusqlite::{params, Connection, OptionalExtension};
use tally_core::{Product, ProductId};

use crate::codec::{parse_datetime, parse_decimal, parse_uuid};
use crate::StoreResult;

pub fn insert(conn: &Connection, product: &Product) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO products (
            id, name, sku, quantity, cost, price, avg_price,
            previous_cost, previous_price, previous_avg_price, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            product.id.to_string(),
            product.name,
            product.sku,
            product.quantity.to_string(),
            product.cost.to_string(),
            product.price.to_string(),
            product.avg_price.to_string(),
            product.previous_cost.to_string(),
            product.previous_price.to_string(),
            product.previous_avg_price.to_string(),
            product.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: ProductId) -> StoreResult<Option<Product>> {
    find_where(conn, "id = ?1", &id.to_string())
}

pub fn find_by_sku(conn: &Connection, sku: &str) -> StoreResult<Option<Product>> {
    find_where(conn, "sku = ?1", sku)
}

fn find_where(conn: &Connection, predicate: &str, value: &str) -> StoreResult<Option<Product>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT id, name, sku, quantity, cost, price, avg_price,
                        previous_cost, previous_price, previous_avg_price, created_at
                 FROM products WHERE {predicate}"
            ),
            params![value],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, String>(10)?,
                ))
            },
        )
        .optional()?;
    let Some((id, name, sku, quantity, cost, price, avg, prev_cost, prev_price, prev_avg, created)) =
        row
    else {
        return Ok(None);
    };
    Ok(Some(Product {
        id: parse_uuid(&id)?.into(),
        name,
        sku,
        quantity: parse_decimal(&quantity)?,
        cost: parse_decimal(&cost)?,
        price: parse_decimal(&price)?,
        avg_price: parse_decimal(&avg)?,
        previous_cost: parse_decimal(&prev_cost)?,
        previous_price: parse_decimal(&prev_price)?,
        previous_avg_price: parse_decimal(&prev_avg)?,
        created_at: parse_datetime(&created)?,
    }))
}

/// Overwrite the live quantity and price snapshot columns; called only
/// inside the same atomic unit as the movement append.
pub fn update_position(conn: &Connection, product: &Product) -> StoreResult<()> {
    conn.execute(
        "UPDATE products SET quantity = ?1, cost = ?2, price = ?3, avg_price = ?4,
            previous_cost = ?5, previous_price = ?6, previous_avg_price = ?7
         WHERE id = ?8",
        params![
            product.quantity.to_string(),
            product.cost.to_string(),
            product.price.to_string(),
            product.avg_price.to_string(),
            product.previous_cost.to_string(),
            product.previous_price.to_string(),
            product.previous_avg_price.to_string(),
            product.id.to_string(),
        ],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: ProductId) -> StoreResult<()> {
    conn.execute("DELETE FROM products WHERE id = ?1", params![id.to_string()])?;
    Ok(())
}
