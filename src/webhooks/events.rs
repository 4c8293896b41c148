//! Webhook event catalogue.
//!
//! Maps upstream event type strings (`transfer.completed`, ...) to the
//! category that handles them. The lookup table is built once.

use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Customer,
    KycLink,
    Transfer,
    ExternalAccount,
    BridgeWallet,
    Card,
    CardTransaction,
    VirtualAccount,
    StaticMemo,
    LiquidationAddress,
}

impl EventCategory {
    pub const ALL: [EventCategory; 10] = [
        EventCategory::Customer,
        EventCategory::KycLink,
        EventCategory::Transfer,
        EventCategory::ExternalAccount,
        EventCategory::BridgeWallet,
        EventCategory::Card,
        EventCategory::CardTransaction,
        EventCategory::VirtualAccount,
        EventCategory::StaticMemo,
        EventCategory::LiquidationAddress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Customer => "customer",
            EventCategory::KycLink => "kyc_link",
            EventCategory::Transfer => "transfer",
            EventCategory::ExternalAccount => "external_account",
            EventCategory::BridgeWallet => "bridge_wallet",
            EventCategory::Card => "card",
            EventCategory::CardTransaction => "card_transaction",
            EventCategory::VirtualAccount => "virtual_account",
            EventCategory::StaticMemo => "static_memo",
            EventCategory::LiquidationAddress => "liquidation_address",
        }
    }

    /// Event types belonging to this category.
    pub fn event_types(&self) -> &'static [&'static str] {
        match self {
            EventCategory::Customer => &["customer.created", "customer.updated", "customer.deleted"],
            EventCategory::KycLink => &[
                "kyc_link.created",
                "kyc_link.approved",
                "kyc_link.rejected",
                "kyc_link.under_review",
                "kyc_link.incomplete",
            ],
            EventCategory::Transfer => &[
                "transfer.created",
                "transfer.pending",
                "transfer.completed",
                "transfer.failed",
                "transfer.cancelled",
                "transfer.funds_received",
                "transfer.payment_submitted",
                "transfer.payment_completed",
            ],
            EventCategory::ExternalAccount => &[
                "external_account.created",
                "external_account.updated",
                "external_account.deleted",
            ],
            EventCategory::BridgeWallet => &["bridge_wallet.created", "bridge_wallet.updated"],
            EventCategory::Card => &["card.created", "card.activated", "card.frozen", "card.closed"],
            EventCategory::CardTransaction => &[
                "card_transaction.pending",
                "card_transaction.completed",
                "card_transaction.declined",
                "card_transaction.refunded",
            ],
            EventCategory::VirtualAccount => &[
                "virtual_account.created",
                "virtual_account.updated",
                "virtual_account.deactivated",
                "virtual_account.reactivated",
                "virtual_account.funds_received",
            ],
            EventCategory::StaticMemo => &[
                "static_memo.created",
                "static_memo.updated",
                "static_memo.funds_received",
            ],
            EventCategory::LiquidationAddress => &[
                "liquidation_address.created",
                "liquidation_address.updated",
                "liquidation_address.funds_received",
            ],
        }
    }

    /// Category of a known event type.
    pub fn of(event_type: &str) -> Option<EventCategory> {
        static TABLE: OnceLock<HashMap<&'static str, EventCategory>> = OnceLock::new();
        TABLE
            .get_or_init(|| {
                EventCategory::ALL
                    .iter()
                    .flat_map(|category| category.event_types().iter().map(move |t| (*t, *category)))
                    .collect()
            })
            .get(event_type)
            .copied()
    }
}
