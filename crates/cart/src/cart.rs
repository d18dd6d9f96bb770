use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sweetshop_core::{
    Aggregate, AggregateRoot, CartId, DomainError, Entity, Event, LineItemId, Money, ProductId,
    TaxRate, UserId, find_entity, find_entity_mut,
};

use crate::policy::PriceSnapshotPolicy;
use crate::summary::CartSummary;

/// Cart status lifecycle.
///
/// `Checkout` is the implicit in-transaction state between validation and
/// completion; the coordinator persists `Active -> Completed` in one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Active,
    Checkout,
    Completed,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Checkout => "checkout",
            CartStatus::Completed => "completed",
        }
    }
}

impl core::str::FromStr for CartStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CartStatus::Active),
            "checkout" => Ok(CartStatus::Checkout),
            "completed" => Ok(CartStatus::Completed),
            other => Err(DomainError::invalid_input(format!("unknown cart status '{other}'"))),
        }
    }
}

/// Cart line: product, quantity, locked-in unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub price_at_time: Money,
}

impl CartLineItem {
    /// Unrounded `price_at_time × quantity`; `None` past the decimal range.
    pub fn line_total(&self) -> Option<rust_decimal::Decimal> {
        self.price_at_time.checked_times(self.quantity)
    }
}

impl Entity for CartLineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: Cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: CartId,
    user_id: UserId,
    status: CartStatus,
    items: Vec<CartLineItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Cart {
    /// Fresh, empty active cart for a user.
    pub fn open(id: CartId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            status: CartStatus::Active,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Rebuild a cart from its persisted record.
    pub fn restore(
        id: CartId,
        user_id: UserId,
        status: CartStatus,
        items: Vec<CartLineItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        version: u64,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            items,
            created_at,
            updated_at,
            version,
        }
    }

    pub fn id_typed(&self) -> CartId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, CartStatus::Active)
    }

    pub fn line(&self, line_item_id: LineItemId) -> Option<&CartLineItem> {
        find_entity(&self.items, &line_item_id)
    }

    pub fn line_for_product(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|l| l.product_id == product_id)
    }
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AddItem.
///
/// `line_item_id` is only used when the product has no line yet; otherwise
/// the existing line grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub line_item_id: LineItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Stock reported by the ledger when the command was built.
    pub available: i64,
    pub policy: PriceSnapshotPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItemQuantity (absolute quantity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemQuantity {
    pub line_item_id: LineItemId,
    pub product_name: String,
    pub quantity: i64,
    pub available: i64,
    pub current_price: Money,
    pub policy: PriceSnapshotPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub line_item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCart {
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteCart {
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartCommand {
    AddItem(AddItem),
    UpdateItemQuantity(UpdateItemQuantity),
    RemoveItem(RemoveItem),
    Clear(ClearCart),
    Complete(CompleteCart),
}

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub cart_id: CartId,
    pub line_item_id: LineItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub price_at_time: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemQuantityChanged (carries the line's resulting snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantityChanged {
    pub cart_id: CartId,
    pub line_item_id: LineItemId,
    pub quantity: i64,
    pub price_at_time: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub cart_id: CartId,
    pub line_item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CartCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCleared {
    pub cart_id: CartId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CartCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCompleted {
    pub cart_id: CartId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    ItemAdded(ItemAdded),
    ItemQuantityChanged(ItemQuantityChanged),
    ItemRemoved(ItemRemoved),
    CartCleared(CartCleared),
    CartCompleted(CartCompleted),
}

impl Event for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded(_) => "cart.item_added",
            CartEvent::ItemQuantityChanged(_) => "cart.item_quantity_changed",
            CartEvent::ItemRemoved(_) => "cart.item_removed",
            CartEvent::CartCleared(_) => "cart.cleared",
            CartEvent::CartCompleted(_) => "cart.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CartEvent::ItemAdded(e) => e.occurred_at,
            CartEvent::ItemQuantityChanged(e) => e.occurred_at,
            CartEvent::ItemRemoved(e) => e.occurred_at,
            CartEvent::CartCleared(e) => e.occurred_at,
            CartEvent::CartCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::ItemAdded(e) => {
                self.items.push(CartLineItem {
                    id: e.line_item_id,
                    product_id: e.product_id,
                    quantity: e.quantity,
                    price_at_time: e.price_at_time,
                });
            }
            CartEvent::ItemQuantityChanged(e) => {
                if let Some(line) = self.items.iter_mut().find(|l| l.id == e.line_item_id) {
                    line.quantity = e.quantity;
                    line.price_at_time = e.price_at_time;
                }
            }
            CartEvent::ItemRemoved(e) => {
                self.items.retain(|l| l.id != e.line_item_id);
            }
            CartEvent::CartCleared(_) => {
                self.items.clear();
            }
            CartEvent::CartCompleted(_) => {
                self.status = CartStatus::Completed;
            }
        }

        self.updated_at = event.occurred_at();
        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.ensure_active()?;
        match command {
            CartCommand::AddItem(cmd) => self.handle_add_item(cmd),
            CartCommand::UpdateItemQuantity(cmd) => self.handle_update_quantity(cmd),
            CartCommand::RemoveItem(cmd) => self.handle_remove_item(cmd),
            CartCommand::Clear(cmd) => Ok(vec![CartEvent::CartCleared(CartCleared {
                cart_id: self.id,
                occurred_at: cmd.occurred_at,
            })]),
            CartCommand::Complete(cmd) => self.handle_complete(cmd),
        }
    }
}

impl Cart {
    fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(format!(
                "cart is {} and can no longer change",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn ensure_quantity(quantity: i64) -> Result<(), DomainError> {
        if quantity < 1 {
            return Err(DomainError::invalid_input("quantity must be at least 1"));
        }
        Ok(())
    }

    /// Refuse a line change whose cart totals would not fit a decimal, even
    /// at the highest tax rate.
    fn ensure_totals_fit(&self, changed: CartLineItem) -> Result<(), DomainError> {
        let mut lines = self.items.clone();
        match find_entity_mut(&mut lines, &changed.id) {
            Some(line) => *line = changed,
            None => lines.push(changed),
        }
        CartSummary::checked_of_lines(&lines, TaxRate::MAX)
            .map(|_| ())
            .ok_or_else(|| DomainError::invalid_input("cart total is too large"))
    }

    fn handle_add_item(&self, cmd: &AddItem) -> Result<Vec<CartEvent>, DomainError> {
        Self::ensure_quantity(cmd.quantity)?;

        match self.line_for_product(cmd.product_id) {
            Some(line) => {
                let cumulative = line
                    .quantity
                    .checked_add(cmd.quantity)
                    .ok_or_else(|| DomainError::invalid_input("quantity is too large"))?;
                if cumulative > cmd.available {
                    return Err(DomainError::insufficient_stock(
                        cmd.product_id,
                        cmd.product_name.clone(),
                        cmd.available,
                    ));
                }
                let price_at_time = cmd.policy.snapshot_after_change(
                    line.price_at_time,
                    cmd.unit_price,
                    line.quantity,
                    cumulative,
                );
                self.ensure_totals_fit(CartLineItem {
                    quantity: cumulative,
                    price_at_time,
                    ..line.clone()
                })?;
                Ok(vec![CartEvent::ItemQuantityChanged(ItemQuantityChanged {
                    cart_id: self.id,
                    line_item_id: line.id,
                    quantity: cumulative,
                    price_at_time,
                    occurred_at: cmd.occurred_at,
                })])
            }
            None => {
                if cmd.quantity > cmd.available {
                    return Err(DomainError::insufficient_stock(
                        cmd.product_id,
                        cmd.product_name.clone(),
                        cmd.available,
                    ));
                }
                if self.line(cmd.line_item_id).is_some() {
                    return Err(DomainError::conflict("line item id already used in this cart"));
                }
                self.ensure_totals_fit(CartLineItem {
                    id: cmd.line_item_id,
                    product_id: cmd.product_id,
                    quantity: cmd.quantity,
                    price_at_time: cmd.unit_price,
                })?;
                Ok(vec![CartEvent::ItemAdded(ItemAdded {
                    cart_id: self.id,
                    line_item_id: cmd.line_item_id,
                    product_id: cmd.product_id,
                    quantity: cmd.quantity,
                    price_at_time: cmd.unit_price,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }

    fn handle_update_quantity(
        &self,
        cmd: &UpdateItemQuantity,
    ) -> Result<Vec<CartEvent>, DomainError> {
        Self::ensure_quantity(cmd.quantity)?;

        let line = self
            .line(cmd.line_item_id)
            .ok_or_else(|| DomainError::not_found(format!("line item {}", cmd.line_item_id)))?;

        if cmd.quantity > cmd.available {
            return Err(DomainError::insufficient_stock(
                line.product_id,
                cmd.product_name.clone(),
                cmd.available,
            ));
        }

        let price_at_time = cmd.policy.snapshot_after_change(
            line.price_at_time,
            cmd.current_price,
            line.quantity,
            cmd.quantity,
        );
        self.ensure_totals_fit(CartLineItem {
            quantity: cmd.quantity,
            price_at_time,
            ..line.clone()
        })?;

        Ok(vec![CartEvent::ItemQuantityChanged(ItemQuantityChanged {
            cart_id: self.id,
            line_item_id: line.id,
            quantity: cmd.quantity,
            price_at_time,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_item(&self, cmd: &RemoveItem) -> Result<Vec<CartEvent>, DomainError> {
        if self.line(cmd.line_item_id).is_none() {
            return Err(DomainError::not_found(format!("line item {}", cmd.line_item_id)));
        }
        Ok(vec![CartEvent::ItemRemoved(ItemRemoved {
            cart_id: self.id,
            line_item_id: cmd.line_item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteCart) -> Result<Vec<CartEvent>, DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        Ok(vec![CartEvent::CartCompleted(CartCompleted {
            cart_id: self.id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
