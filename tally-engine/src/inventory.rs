//! Product aggregate updater: stock movements, line-item corrections, and
//! price/cost revaluations.

use rusqlite::Transaction;
use rust_decimal::Decimal;
use tally_core::{
    validate_amount, validate_quantity, MovementKind, Product, ProductId, PurchaseId,
    PurchaseItem, SaleId, SaleItem, StockMovement,
};
use tally_ledger::{invoice, product, stock};
use tracing::info;
use uuid::Uuid;

use crate::effects::{movement_delta, weighted_avg_cost, StockDirection};
use crate::locks::LockKey;
use crate::orchestrator::Engine;
use crate::resolver::{self, StockPosition};
use crate::{EngineError, EngineResult};

/// Caller-facing description of one stock movement to record.
#[derive(Clone, Debug)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub kind: MovementKind,
    /// Magnitude of the move; must be strictly positive.
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Only honored for adjustment/miscellaneous kinds; defaults inbound.
    pub direction: Option<StockDirection>,
    pub counterparty_id: Option<Uuid>,
    pub invoice_ref: Option<String>,
    pub description: Option<String>,
}

impl MovementRequest {
    pub fn new(
        product_id: ProductId,
        kind: MovementKind,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            product_id,
            kind,
            quantity,
            unit_price,
            direction: None,
            counterparty_id: None,
            invoice_ref: None,
            description: None,
        }
    }

    pub fn outbound(mut self) -> Self {
        self.direction = Some(StockDirection::Outbound);
        self
    }

    pub fn with_counterparty(mut self, counterparty_id: Uuid) -> Self {
        self.counterparty_id = Some(counterparty_id);
        self
    }

    pub fn with_invoice_ref(mut self, invoice_ref: impl Into<String>) -> Self {
        self.invoice_ref = Some(invoice_ref.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Direct price/cost/quantity edit outside a sale or purchase. Requires a
/// movement kind whenever a value actually changes.
#[derive(Clone, Debug, Default)]
pub struct RevaluationRequest {
    pub new_price: Option<Decimal>,
    pub new_cost: Option<Decimal>,
    pub new_quantity: Option<Decimal>,
    pub kind: Option<MovementKind>,
    pub description: Option<String>,
}

/// Internal, already-signed movement to apply inside an open transaction.
struct MovementPlan {
    kind: MovementKind,
    delta: Decimal,
    unit_price: Decimal,
    recompute_cost: bool,
    counterparty_id: Option<Uuid>,
    invoice_ref: Option<String>,
    description: Option<String>,
}

impl Engine {
    /// Record one stock movement and mutate the product aggregate in the
    /// same atomic unit.
    pub fn record_stock_movement(&self, request: MovementRequest) -> EngineResult<StockMovement> {
        validate_quantity(request.quantity)?;
        validate_amount(request.unit_price)?;
        self.locks()
            .with_locks(vec![LockKey::Product(request.product_id.into())], || {
                self.with_retries("record_stock_movement", || {
                    let reader = self.store().reader()?;
                    let position = resolver::resolve_stock(&reader, request.product_id)?;
                    drop(reader);

                    let delta = movement_delta(request.kind, request.quantity, request.direction);
                    let plan = MovementPlan {
                        kind: request.kind,
                        delta,
                        unit_price: request.unit_price,
                        recompute_cost: request.kind == MovementKind::Purchase,
                        counterparty_id: request.counterparty_id,
                        invoice_ref: request.invoice_ref.clone(),
                        description: request.description.clone(),
                    };
                    let movement = self
                        .store()
                        .with_write_tx(|tx| apply_movement(tx, &position, &plan))?;
                    info!(
                        product_id = %request.product_id,
                        kind = %request.kind,
                        delta = %movement.quantity,
                        stock_after = %movement.stock_after,
                        "recorded stock movement"
                    );
                    Ok(movement)
                })
            })
    }

    /// Add a line item to a sale: persists the item and moves stock out in
    /// the same atomic unit.
    pub fn add_sale_item(
        &self,
        sale_id: SaleId,
        product_id: ProductId,
        quantity: Decimal,
        unit_price: Option<Decimal>,
    ) -> EngineResult<SaleItem> {
        validate_quantity(quantity)?;
        self.locks()
            .with_locks(vec![LockKey::Product(product_id.into())], || {
                self.with_retries("add_sale_item", || {
                    let reader = self.store().reader()?;
                    let position = resolver::resolve_stock(&reader, product_id)?;
                    drop(reader);

                    let unit_price = unit_price.unwrap_or(position.product.price);
                    validate_amount(unit_price)?;
                    let item = self.store().with_write_tx(|tx| {
                        let sale = invoice::find_sale(tx, sale_id)?
                            .ok_or_else(|| EngineError::NotFound(format!("sale {sale_id}")))?;
                        let item = SaleItem::new(sale_id, product_id, quantity, unit_price);
                        let plan = MovementPlan {
                            kind: MovementKind::Sale,
                            delta: -quantity,
                            unit_price,
                            recompute_cost: false,
                            counterparty_id: Some(sale.customer_id.into()),
                            invoice_ref: Some(sale.invoice_no.clone()),
                            description: None,
                        };
                        apply_movement(tx, &position, &plan)?;
                        invoice::insert_sale_item(tx, &item)?;
                        Ok::<_, EngineError>(item)
                    })?;
                    info!(
                        %sale_id,
                        product_id = %product_id,
                        quantity = %quantity,
                        "added sale item"
                    );
                    Ok(item)
                })
            })
    }

    /// Edit a sale line item, applying the stock delta between the old and
    /// new effect in one step.
    pub fn update_sale_item(
        &self,
        item_id: Uuid,
        new_product_id: Option<ProductId>,
        new_quantity: Decimal,
        new_unit_price: Option<Decimal>,
    ) -> EngineResult<SaleItem> {
        validate_quantity(new_quantity)?;
        self.with_retries("update_sale_item", || {
            let reader = self.store().reader()?;
            let existing = invoice::find_sale_item(&reader, item_id)?
                .ok_or_else(|| EngineError::NotFound(format!("sale item {item_id}")))?;
            drop(reader);

            let old_product = existing.product_id;
            let target_product = new_product_id.unwrap_or(old_product);
            let keys = vec![
                LockKey::Product(old_product.into()),
                LockKey::Product(target_product.into()),
            ];
            self.locks().with_locks(keys, || {
                let reader = self.store().reader()?;
                let old_position = resolver::resolve_stock(&reader, old_product)?;
                let new_position = if target_product == old_product {
                    None
                } else {
                    Some(resolver::resolve_stock(&reader, target_product)?)
                };
                drop(reader);

                let unit_price = new_unit_price.unwrap_or(existing.unit_price);
                validate_amount(unit_price)?;
                let updated = self.store().with_write_tx(|tx| {
                    let current = invoice::find_sale_item(tx, item_id)?
                        .ok_or_else(|| EngineError::NotFound(format!("sale item {item_id}")))?;
                    if current.product_id != old_product {
                        return Err(EngineError::Conflict(
                            "sale item changed during write".into(),
                        ));
                    }
                    let sale = invoice::find_sale(tx, current.sale_id)?.ok_or_else(|| {
                        EngineError::NotFound(format!("sale {}", current.sale_id))
                    })?;

                    let mut updated = current.clone();
                    updated.product_id = target_product;
                    updated.quantity = new_quantity;
                    updated.unit_price = unit_price;
                    updated.total = new_quantity * unit_price;

                    match &new_position {
                        None => {
                            // Same product: old effect was -old_q, new is -new_q.
                            let delta = current.quantity - new_quantity;
                            if !delta.is_zero() {
                                let plan = correction_plan(
                                    delta,
                                    unit_price,
                                    sale.customer_id.into(),
                                    &sale.invoice_no,
                                    "sale item corrected",
                                );
                                apply_movement(tx, &old_position, &plan)?;
                            }
                        }
                        Some(new_position) => {
                            let undo = correction_plan(
                                current.quantity,
                                current.unit_price,
                                sale.customer_id.into(),
                                &sale.invoice_no,
                                "sale item moved off product",
                            );
                            apply_movement(tx, &old_position, &undo)?;
                            let apply = correction_plan(
                                -new_quantity,
                                unit_price,
                                sale.customer_id.into(),
                                &sale.invoice_no,
                                "sale item moved onto product",
                            );
                            apply_movement(tx, new_position, &apply)?;
                        }
                    }

                    invoice::update_sale_item(tx, &updated)?;
                    Ok(updated)
                })?;
                info!(%item_id, quantity = %new_quantity, "updated sale item");
                Ok(updated)
            })
        })
    }

    /// Remove a sale line item, restoring its stock effect.
    pub fn delete_sale_item(&self, item_id: Uuid) -> EngineResult<()> {
        self.with_retries("delete_sale_item", || {
            let reader = self.store().reader()?;
            let existing = invoice::find_sale_item(&reader, item_id)?
                .ok_or_else(|| EngineError::NotFound(format!("sale item {item_id}")))?;
            drop(reader);

            let product_id = existing.product_id;
            self.locks()
                .with_locks(vec![LockKey::Product(product_id.into())], || {
                    let reader = self.store().reader()?;
                    let position = resolver::resolve_stock(&reader, product_id)?;
                    drop(reader);

                    self.store().with_write_tx(|tx| {
                        let current = invoice::find_sale_item(tx, item_id)?.ok_or_else(|| {
                            EngineError::NotFound(format!("sale item {item_id}"))
                        })?;
                        if current.product_id != product_id {
                            return Err(EngineError::Conflict(
                                "sale item changed during write".into(),
                            ));
                        }
                        let sale = invoice::find_sale(tx, current.sale_id)?.ok_or_else(|| {
                            EngineError::NotFound(format!("sale {}", current.sale_id))
                        })?;
                        // Inverse of the item's original -quantity effect.
                        let plan = correction_plan(
                            current.quantity,
                            current.unit_price,
                            sale.customer_id.into(),
                            &sale.invoice_no,
                            "sale item removed",
                        );
                        apply_movement(tx, &position, &plan)?;
                        invoice::delete_sale_item(tx, item_id)?;
                        Ok(())
                    })?;
                    info!(%item_id, "deleted sale item");
                    Ok(())
                })
        })
    }

    /// Add a line item to a purchase: moves stock in and recomputes the
    /// weighted-average cost.
    pub fn add_purchase_item(
        &self,
        purchase_id: PurchaseId,
        product_id: ProductId,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> EngineResult<PurchaseItem> {
        validate_quantity(quantity)?;
        validate_amount(unit_price)?;
        self.locks()
            .with_locks(vec![LockKey::Product(product_id.into())], || {
                self.with_retries("add_purchase_item", || {
                    let reader = self.store().reader()?;
                    let position = resolver::resolve_stock(&reader, product_id)?;
                    drop(reader);

                    let item = self.store().with_write_tx(|tx| {
                        let purchase =
                            invoice::find_purchase(tx, purchase_id)?.ok_or_else(|| {
                                EngineError::NotFound(format!("purchase {purchase_id}"))
                            })?;
                        let item =
                            PurchaseItem::new(purchase_id, product_id, quantity, unit_price);
                        let plan = MovementPlan {
                            kind: MovementKind::Purchase,
                            delta: quantity,
                            unit_price,
                            recompute_cost: true,
                            counterparty_id: Some(purchase.supplier_id.into()),
                            invoice_ref: Some(purchase.invoice_no.clone()),
                            description: None,
                        };
                        apply_movement(tx, &position, &plan)?;
                        invoice::insert_purchase_item(tx, &item)?;
                        Ok::<_, EngineError>(item)
                    })?;
                    info!(
                        %purchase_id,
                        product_id = %product_id,
                        quantity = %quantity,
                        "added purchase item"
                    );
                    Ok(item)
                })
            })
    }

    /// Edit a purchase line item; the stock correction is the delta between
    /// the old and new inbound effect.
    pub fn update_purchase_item(
        &self,
        item_id: Uuid,
        new_product_id: Option<ProductId>,
        new_quantity: Decimal,
        new_unit_price: Option<Decimal>,
    ) -> EngineResult<PurchaseItem> {
        validate_quantity(new_quantity)?;
        self.with_retries("update_purchase_item", || {
            let reader = self.store().reader()?;
            let existing = invoice::find_purchase_item(&reader, item_id)?
                .ok_or_else(|| EngineError::NotFound(format!("purchase item {item_id}")))?;
            drop(reader);

            let old_product = existing.product_id;
            let target_product = new_product_id.unwrap_or(old_product);
            let keys = vec![
                LockKey::Product(old_product.into()),
                LockKey::Product(target_product.into()),
            ];
            self.locks().with_locks(keys, || {
                let reader = self.store().reader()?;
                let old_position = resolver::resolve_stock(&reader, old_product)?;
                let new_position = if target_product == old_product {
                    None
                } else {
                    Some(resolver::resolve_stock(&reader, target_product)?)
                };
                drop(reader);

                let unit_price = new_unit_price.unwrap_or(existing.unit_price);
                validate_amount(unit_price)?;
                let updated = self.store().with_write_tx(|tx| {
                    let current = invoice::find_purchase_item(tx, item_id)?.ok_or_else(|| {
                        EngineError::NotFound(format!("purchase item {item_id}"))
                    })?;
                    if current.product_id != old_product {
                        return Err(EngineError::Conflict(
                            "purchase item changed during write".into(),
                        ));
                    }
                    let purchase =
                        invoice::find_purchase(tx, current.purchase_id)?.ok_or_else(|| {
                            EngineError::NotFound(format!("purchase {}", current.purchase_id))
                        })?;

                    let mut updated = current.clone();
                    updated.product_id = target_product;
                    updated.quantity = new_quantity;
                    updated.unit_price = unit_price;
                    updated.total = new_quantity * unit_price;

                    match &new_position {
                        None => {
                            // Old effect was +old_q, new is +new_q.
                            let delta = new_quantity - current.quantity;
                            if !delta.is_zero() {
                                let plan = correction_plan(
                                    delta,
                                    unit_price,
                                    purchase.supplier_id.into(),
                                    &purchase.invoice_no,
                                    "purchase item corrected",
                                );
                                apply_movement(tx, &old_position, &plan)?;
                            }
                        }
                        Some(new_position) => {
                            let undo = correction_plan(
                                -current.quantity,
                                current.unit_price,
                                purchase.supplier_id.into(),
                                &purchase.invoice_no,
                                "purchase item moved off product",
                            );
                            apply_movement(tx, &old_position, &undo)?;
                            let apply = correction_plan(
                                new_quantity,
                                unit_price,
                                purchase.supplier_id.into(),
                                &purchase.invoice_no,
                                "purchase item moved onto product",
                            );
                            apply_movement(tx, new_position, &apply)?;
                        }
                    }

                    invoice::update_purchase_item(tx, &updated)?;
                    Ok(updated)
                })?;
                info!(%item_id, quantity = %new_quantity, "updated purchase item");
                Ok(updated)
            })
        })
    }

    /// Remove a purchase line item, undoing its inbound stock effect.
    pub fn delete_purchase_item(&self, item_id: Uuid) -> EngineResult<()> {
        self.with_retries("delete_purchase_item", || {
            let reader = self.store().reader()?;
            let existing = invoice::find_purchase_item(&reader, item_id)?
                .ok_or_else(|| EngineError::NotFound(format!("purchase item {item_id}")))?;
            drop(reader);

            let product_id = existing.product_id;
            self.locks()
                .with_locks(vec![LockKey::Product(product_id.into())], || {
                    let reader = self.store().reader()?;
                    let position = resolver::resolve_stock(&reader, product_id)?;
                    drop(reader);

                    self.store().with_write_tx(|tx| {
                        let current =
                            invoice::find_purchase_item(tx, item_id)?.ok_or_else(|| {
                                EngineError::NotFound(format!("purchase item {item_id}"))
                            })?;
                        if current.product_id != product_id {
                            return Err(EngineError::Conflict(
                                "purchase item changed during write".into(),
                            ));
                        }
                        let purchase = invoice::find_purchase(tx, current.purchase_id)?
                            .ok_or_else(|| {
                                EngineError::NotFound(format!("purchase {}", current.purchase_id))
                            })?;
                        let plan = correction_plan(
                            -current.quantity,
                            current.unit_price,
                            purchase.supplier_id.into(),
                            &purchase.invoice_no,
                            "purchase item removed",
                        );
                        apply_movement(tx, &position, &plan)?;
                        invoice::delete_purchase_item(tx, item_id)?;
                        Ok(())
                    })?;
                    info!(%item_id, "deleted purchase item");
                    Ok(())
                })
        })
    }

    /// Direct edit to a product's price, cost, or quantity. Rejected unless
    /// a movement kind accompanies an actual value change; a no-op edit
    /// writes nothing and returns `None`.
    pub fn revalue_product(
        &self,
        product_id: ProductId,
        request: RevaluationRequest,
    ) -> EngineResult<Option<StockMovement>> {
        if let Some(price) = request.new_price {
            validate_amount(price)?;
        }
        if let Some(cost) = request.new_cost {
            validate_amount(cost)?;
        }
        if let Some(quantity) = request.new_quantity {
            if quantity < Decimal::ZERO {
                return Err(EngineError::InvalidArgument(
                    "quantity must not be negative".into(),
                ));
            }
        }
        self.locks()
            .with_locks(vec![LockKey::Product(product_id.into())], || {
                self.with_retries("revalue_product", || {
                    let reader = self.store().reader()?;
                    let position = resolver::resolve_stock(&reader, product_id)?;
                    drop(reader);

                    let current = &position.product;
                    let price_changed =
                        request.new_price.is_some_and(|price| price != current.price);
                    let cost_changed = request.new_cost.is_some_and(|cost| cost != current.cost);
                    let quantity_changed = request
                        .new_quantity
                        .is_some_and(|quantity| quantity != current.quantity);
                    if !price_changed && !cost_changed && !quantity_changed {
                        return Ok(None);
                    }

                    let kind = request.kind.ok_or_else(|| {
                        EngineError::InvalidArgument(
                            "a movement kind is required when price, cost, or quantity changes"
                                .into(),
                        )
                    })?;
                    if !matches!(
                        kind,
                        MovementKind::Refund | MovementKind::Adjustment | MovementKind::Miscellaneous
                    ) {
                        return Err(EngineError::InvalidArgument(format!(
                            "{kind} cannot describe a direct product edit"
                        )));
                    }

                    let new_cost = request.new_cost.unwrap_or(current.cost);
                    let new_price = request.new_price.unwrap_or(current.price);
                    let delta = request
                        .new_quantity
                        .map(|quantity| quantity - current.quantity)
                        .unwrap_or(Decimal::ZERO);

                    let movement = self.store().with_write_tx(|tx| {
                        resolver::check_stock_head(tx, product_id, position.head)?;
                        let mut updated = position.product.clone();
                        let keep_avg = updated.avg_price;
                        shift_snapshots(&mut updated, new_cost, new_price, keep_avg);
                        updated.quantity += delta;

                        let mut movement = StockMovement::new(product_id, kind, delta);
                        movement.stock_after = updated.quantity;
                        movement.unit_price = new_cost;
                        movement.cost_price = updated.cost;
                        movement.sell_price = updated.price;
                        movement.avg_price = updated.avg_price;
                        movement.previous_cost = current.cost;
                        movement.previous_price = current.price;
                        movement.previous_avg_price = current.avg_price;
                        movement.total_amount = delta.abs() * new_cost;
                        movement.description = request.description.clone();
                        stock::append(tx, &mut movement)?;
                        product::update_position(tx, &updated)?;
                        Ok::<_, EngineError>(movement)
                    })?;
                    info!(
                        product_id = %product_id,
                        kind = %kind,
                        delta = %delta,
                        "revalued product"
                    );
                    Ok(Some(movement))
                })
            })
    }
}

impl Engine {
    /// Register a product; stock starts at zero.
    pub fn create_product(
        &self,
        name: impl Into<String>,
        sku: impl Into<String>,
        cost: Decimal,
        price: Decimal,
    ) -> EngineResult<Product> {
        validate_amount(cost)?;
        validate_amount(price)?;
        let item = Product::new(name, sku).with_prices(cost, price);
        self.store().with_write_tx(|tx| product::insert(tx, &item))?;
        info!(product_id = %item.id, sku = %item.sku, "created product");
        Ok(item)
    }

    pub fn product(&self, id: ProductId) -> EngineResult<Product> {
        let conn = self.store().reader()?;
        product::find(&conn, id)?.ok_or_else(|| EngineError::NotFound(format!("product {id}")))
    }

    pub fn product_by_sku(&self, sku: &str) -> EngineResult<Product> {
        let conn = self.store().reader()?;
        product::find_by_sku(&conn, sku)?
            .ok_or_else(|| EngineError::NotFound(format!("product with sku {sku}")))
    }

    /// Movement history for one product, oldest first.
    pub fn product_movements(&self, id: ProductId) -> EngineResult<Vec<StockMovement>> {
        let conn = self.store().reader()?;
        if product::find(&conn, id)?.is_none() {
            return Err(EngineError::NotFound(format!("product {id}")));
        }
        Ok(stock::list_for(&conn, id)?)
    }

    /// Delete a product. Refused while movements still reference it.
    pub fn delete_product(&self, id: ProductId) -> EngineResult<()> {
        self.locks()
            .with_locks(vec![LockKey::Product(id.into())], || {
                self.store().with_write_tx(|tx| {
                    if product::find(tx, id)?.is_none() {
                        return Err(EngineError::NotFound(format!("product {id}")));
                    }
                    let movements = stock::count_for(tx, id)?;
                    if movements > 0 {
                        return Err(EngineError::Conflict(format!(
                            "product {id} has {movements} recorded movements"
                        )));
                    }
                    product::delete(tx, id)?;
                    Ok(())
                })?;
                info!(product_id = %id, "deleted product");
                Ok(())
            })
    }
}

/// Compensating movement used by line-item corrections.
fn correction_plan(
    delta: Decimal,
    unit_price: Decimal,
    counterparty_id: Uuid,
    invoice_no: &str,
    note: &str,
) -> MovementPlan {
    MovementPlan {
        kind: MovementKind::Adjustment,
        delta,
        unit_price,
        recompute_cost: false,
        counterparty_id: Some(counterparty_id),
        invoice_ref: Some(invoice_no.to_string()),
        description: Some(note.to_string()),
    }
}

/// Append one movement and mutate the product aggregate. Runs inside the
/// caller's open transaction; validates the stock head and the
/// non-negative stock rule.
fn apply_movement(
    tx: &Transaction<'_>,
    position: &StockPosition,
    plan: &MovementPlan,
) -> EngineResult<StockMovement> {
    let current = &position.product;
    resolver::check_stock_head(tx, current.id, position.head)?;

    let new_quantity = current.quantity + plan.delta;
    if new_quantity < Decimal::ZERO {
        return Err(EngineError::InvalidArgument(format!(
            "insufficient stock for product {}: have {}, need {}",
            current.id,
            current.quantity,
            plan.delta.abs()
        )));
    }

    let (new_cost, new_avg) = if plan.recompute_cost {
        (
            plan.unit_price,
            weighted_avg_cost(
                current.quantity,
                current.avg_price,
                plan.delta,
                plan.unit_price,
            ),
        )
    } else {
        (current.cost, current.avg_price)
    };

    let mut updated = current.clone();
    let keep_price = updated.price;
    shift_snapshots(&mut updated, new_cost, keep_price, new_avg);
    updated.quantity = new_quantity;

    let mut movement = StockMovement::new(current.id, plan.kind, plan.delta);
    movement.stock_after = new_quantity;
    movement.unit_price = plan.unit_price;
    movement.cost_price = updated.cost;
    movement.sell_price = updated.price;
    movement.avg_price = updated.avg_price;
    movement.previous_cost = current.cost;
    movement.previous_price = current.price;
    movement.previous_avg_price = current.avg_price;
    movement.counterparty_id = plan.counterparty_id;
    movement.invoice_ref = plan.invoice_ref.clone();
    movement.total_amount = plan.delta.abs() * plan.unit_price;
    movement.description = plan.description.clone();
    stock::append(tx, &mut movement)?;
    product::update_position(tx, &updated)?;
    Ok(movement)
}

/// Shift current values into the `previous_*` snapshots for every field
/// that actually changes.
fn shift_snapshots(product: &mut Product, new_cost: Decimal, new_price: Decimal, new_avg: Decimal) {
    if new_cost != product.cost {
        product.previous_cost = product.cost;
        product.cost = new_cost;
    }
    if new_price != product.price {
        product.previous_price = product.price;
        product.price = new_price;
    }
    if new_avg != product.avg_price {
        product.previous_avg_price = product.avg_price;
        product.avg_price = new_avg;
    }
}
