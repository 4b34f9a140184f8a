//! Order lifecycle notifications.

use dealdrop_common::AppResult;
use dealdrop_db::entities::notification_record::{Priority, RecipientType};
use serde_json::Value;

use super::{number, opt_text, text};
use crate::domain::{DispatchResult, Event, EventType, NotificationDraft, NotificationMessage};
use crate::services::NotificationService;
use crate::validation::validate_order_event_payload;

const DEFAULT_CANCEL_REASON: &str = "Please contact the restaurant for more details.";
const DEFAULT_BUSINESS_NAME: &str = "the restaurant";

/// Fields every order handler reads.
struct OrderFields {
    order_id: String,
    customer_id: String,
    business_owner_id: String,
    amount: f64,
}

impl OrderFields {
    fn read(payload: &Value) -> AppResult<Self> {
        validate_order_event_payload(payload)?;
        Ok(Self {
            order_id: text(payload, "orderId"),
            customer_id: text(payload, "customerId"),
            business_owner_id: text(payload, "businessOwnerId"),
            amount: number(payload, "amount").unwrap_or_default(),
        })
    }

    /// First eight characters of the order id, as shown to staff.
    fn short_id(&self) -> String {
        self.order_id.chars().take(8).collect()
    }

    fn message(
        &self,
        event_type: EventType,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> NotificationMessage {
        NotificationMessage::new(title, body)
            .with_action_url(format!("dealdrop://orders/{}", self.order_id))
            .with_data("type", event_type.kind())
            .with_data("orderId", self.order_id.clone())
    }
}

/// Code the customer shows at pickup.
///
/// The explicit verification code when present, otherwise the first eight
/// characters of the order id upper-cased.
#[must_use]
pub fn pickup_code(payload: &Value, order_id: &str) -> String {
    opt_text(payload, "verificationCode")
        .unwrap_or_else(|| order_id.chars().take(8).collect::<String>().to_uppercase())
}

/// ORDER_CREATED: tell the business about a new order.
pub async fn handle_order_created(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    notify_business_of_order(service, event, EventType::OrderCreated).await
}

/// ORDER_PAID: tell the business the order has been paid.
pub async fn handle_order_paid(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    notify_business_of_order(service, event, EventType::OrderPaid).await
}

async fn notify_business_of_order(
    service: &NotificationService,
    event: &Event,
    event_type: EventType,
) -> AppResult<DispatchResult> {
    let order = OrderFields::read(&event.payload)?;
    let customer = opt_text(&event.payload, "customerName").unwrap_or_else(|| "A customer".into());

    let (title, body) = match event_type {
        EventType::OrderPaid => (
            "Order paid".to_string(),
            format!(
                "Payment of ${:.2} received for order #{}",
                order.amount,
                order.short_id()
            ),
        ),
        _ => (
            "New order received".to_string(),
            format!(
                "{customer} placed order #{} for ${:.2}",
                order.short_id(),
                order.amount
            ),
        ),
    };

    let message = order
        .message(event_type, title, body)
        .with_data("amount", format!("{:.2}", order.amount));
    let draft = NotificationDraft::new(event, event_type, RecipientType::Business);

    service
        .send_to_user(&order.business_owner_id, &message, draft, Priority::High)
        .await
}

/// ORDER_CONFIRMED: tell the customer the order was accepted.
pub async fn handle_order_confirmed(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    let order = OrderFields::read(&event.payload)?;
    let code = pickup_code(&event.payload, &order.order_id);
    let business = business_name(&event.payload);

    let mut body = format!("{business} accepted your order. Your pickup code is {code}.");
    if let Some(minutes) = number(&event.payload, "estimatedMinutes") {
        body.push_str(&format!(" Ready in about {minutes:.0} minutes."));
    }

    let message = order
        .message(EventType::OrderConfirmed, "Order confirmed", body)
        .with_data("pickupCode", code);
    let draft = NotificationDraft::new(event, EventType::OrderConfirmed, RecipientType::Customer);

    service
        .send_to_user(&order.customer_id, &message, draft, Priority::High)
        .await
}

/// ORDER_READY: tell the customer to come and collect.
pub async fn handle_order_ready(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    let order = OrderFields::read(&event.payload)?;
    let code = pickup_code(&event.payload, &order.order_id);
    let business = business_name(&event.payload);

    let message = order
        .message(
            EventType::OrderReady,
            "Your order is ready",
            format!("Pick it up at {business} with code {code}."),
        )
        .with_data("pickupCode", code);
    let draft = NotificationDraft::new(event, EventType::OrderReady, RecipientType::Customer);

    service
        .send_to_user(&order.customer_id, &message, draft, Priority::Urgent)
        .await
}

/// ORDER_COMPLETED: thank the customer and confirm to the business.
///
/// Two independent sends whose results are summed.
pub async fn handle_order_completed(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    let order = OrderFields::read(&event.payload)?;
    let business = business_name(&event.payload);

    let customer_message = order.message(
        EventType::OrderCompleted,
        "Enjoy your meal!",
        format!("Thanks for picking up your order from {business}."),
    );
    let customer_draft =
        NotificationDraft::new(event, EventType::OrderCompleted, RecipientType::Customer);
    let mut result = service
        .send_to_user(
            &order.customer_id,
            &customer_message,
            customer_draft,
            Priority::Normal,
        )
        .await?;

    let business_message = order
        .message(
            EventType::OrderCompleted,
            "Order completed",
            format!(
                "Order #{} was picked up. Total: ${:.2}",
                order.short_id(),
                order.amount
            ),
        )
        .with_data("amount", format!("{:.2}", order.amount));
    let business_draft =
        NotificationDraft::new(event, EventType::OrderCompleted, RecipientType::Business);
    let business_result = service
        .send_to_user(
            &order.business_owner_id,
            &business_message,
            business_draft,
            Priority::Low,
        )
        .await?;

    result.merge(business_result);
    Ok(result)
}

/// ORDER_CANCELLED: tell the customer, with the reason if one was given.
pub async fn handle_order_cancelled(
    service: &NotificationService,
    event: &Event,
) -> AppResult<DispatchResult> {
    let order = OrderFields::read(&event.payload)?;
    let reason =
        opt_text(&event.payload, "reason").unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());

    let message = order.message(
        EventType::OrderCancelled,
        "Order cancelled",
        format!("Your order #{} was cancelled. {reason}", order.short_id()),
    );
    let draft = NotificationDraft::new(event, EventType::OrderCancelled, RecipientType::Customer);

    service
        .send_to_user(&order.customer_id, &message, draft, Priority::High)
        .await
}

fn business_name(payload: &Value) -> String {
    opt_text(payload, "businessName").unwrap_or_else(|| DEFAULT_BUSINESS_NAME.to_string())
}
