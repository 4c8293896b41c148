//! Static gateway route list.
//!
//! Gateway paths use hyphens, upstream paths use underscores. Order matters:
//! the first route matching (method, path) wins, so literal paths precede
//! parameterized siblings.

use serde::Serialize;

use crate::bridge::Method;

/// One gateway endpoint and the upstream path it forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub method: Method,
    pub gateway: &'static str,
    pub upstream: &'static str,
    /// Forward the JSON request body.
    pub forwards_body: bool,
    /// Append the raw inbound query string to the upstream path.
    pub forwards_query: bool,
    pub group: &'static str,
    pub description: &'static str,
}

impl RouteSpec {
    const fn new(
        method: Method,
        gateway: &'static str,
        upstream: &'static str,
        group: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            method,
            gateway,
            upstream,
            forwards_body: method.is_mutating(),
            forwards_query: false,
            group,
            description,
        }
    }

    const fn with_query(mut self) -> Self {
        self.forwards_query = true;
        self
    }

    const fn without_body(mut self) -> Self {
        self.forwards_body = false;
        self
    }
}

use Method::{Delete, Get, Patch, Post, Put};

const fn get(g: &'static str, u: &'static str, group: &'static str, d: &'static str) -> RouteSpec {
    RouteSpec::new(Get, g, u, group, d)
}

const fn list(g: &'static str, u: &'static str, group: &'static str, d: &'static str) -> RouteSpec {
    RouteSpec::new(Get, g, u, group, d).with_query()
}

const fn post(g: &'static str, u: &'static str, group: &'static str, d: &'static str) -> RouteSpec {
    RouteSpec::new(Post, g, u, group, d)
}

const fn action(g: &'static str, u: &'static str, group: &'static str, d: &'static str) -> RouteSpec {
    RouteSpec::new(Post, g, u, group, d).without_body()
}

const fn put(g: &'static str, u: &'static str, group: &'static str, d: &'static str) -> RouteSpec {
    RouteSpec::new(Put, g, u, group, d)
}

const fn patch(g: &'static str, u: &'static str, group: &'static str, d: &'static str) -> RouteSpec {
    RouteSpec::new(Patch, g, u, group, d)
}

const fn delete(g: &'static str, u: &'static str, group: &'static str, d: &'static str) -> RouteSpec {
    RouteSpec::new(Delete, g, u, group, d)
}

pub static ROUTES: &[RouteSpec] = &[
    // Customers
    post("/api/customers/tos-links", "/tos_links", "customers", "Create a terms of service link for a new customer"),
    post("/api/customers", "/customers", "customers", "Create a customer"),
    list("/api/customers", "/customers", "customers", "List customers"),
    get("/api/customers/{id}", "/customers/{id}", "customers", "Get a customer"),
    put("/api/customers/{id}", "/customers/{id}", "customers", "Replace a customer"),
    patch("/api/customers/{id}", "/customers/{id}", "customers", "Update a customer"),
    delete("/api/customers/{id}", "/customers/{id}", "customers", "Delete a customer"),
    get("/api/customers/{id}/kyc-link", "/customers/{id}/kyc_link", "customers", "Get the customer's KYC link"),
    get("/api/customers/{id}/tos-link", "/customers/{id}/tos_link", "customers", "Get the customer's terms of service link"),
    // KYC links
    post("/api/kyc-links", "/kyc_links", "kyc_links", "Create a KYC link"),
    list("/api/kyc-links", "/kyc_links", "kyc_links", "List KYC links"),
    get("/api/kyc-links/{id}", "/kyc_links/{id}", "kyc_links", "Get a KYC link"),
    // External accounts
    post("/api/customers/{id}/external-accounts", "/customers/{id}/external_accounts", "external_accounts", "Create an external bank account"),
    list("/api/customers/{id}/external-accounts", "/customers/{id}/external_accounts", "external_accounts", "List external accounts"),
    get("/api/customers/{id}/external-accounts/{accountId}", "/customers/{id}/external_accounts/{accountId}", "external_accounts", "Get an external account"),
    put("/api/customers/{id}/external-accounts/{accountId}", "/customers/{id}/external_accounts/{accountId}", "external_accounts", "Update an external account"),
    delete("/api/customers/{id}/external-accounts/{accountId}", "/customers/{id}/external_accounts/{accountId}", "external_accounts", "Delete an external account"),
    action("/api/customers/{id}/external-accounts/{accountId}/reactivate", "/customers/{id}/external_accounts/{accountId}/reactivate", "external_accounts", "Reactivate an external account"),
    // Wallets
    post("/api/customers/{id}/wallets", "/customers/{id}/wallets", "wallets", "Create a custodial wallet"),
    list("/api/customers/{id}/wallets", "/customers/{id}/wallets", "wallets", "List wallets"),
    get("/api/customers/{id}/wallets/{walletId}", "/customers/{id}/wallets/{walletId}", "wallets", "Get a wallet"),
    // Transfers
    post("/api/transfers", "/transfers", "transfers", "Create a transfer"),
    list("/api/transfers", "/transfers", "transfers", "List transfers"),
    get("/api/transfers/{id}", "/transfers/{id}", "transfers", "Get a transfer"),
    put("/api/transfers/{id}", "/transfers/{id}", "transfers", "Update a transfer"),
    delete("/api/transfers/{id}", "/transfers/{id}", "transfers", "Cancel a transfer"),
    // Virtual accounts
    post("/api/customers/{id}/virtual-accounts", "/customers/{id}/virtual_accounts", "virtual_accounts", "Create a virtual account"),
    list("/api/customers/{id}/virtual-accounts", "/customers/{id}/virtual_accounts", "virtual_accounts", "List virtual accounts"),
    get("/api/customers/{id}/virtual-accounts/{accountId}", "/customers/{id}/virtual_accounts/{accountId}", "virtual_accounts", "Get a virtual account"),
    put("/api/customers/{id}/virtual-accounts/{accountId}", "/customers/{id}/virtual_accounts/{accountId}", "virtual_accounts", "Update a virtual account"),
    action("/api/customers/{id}/virtual-accounts/{accountId}/deactivate", "/customers/{id}/virtual_accounts/{accountId}/deactivate", "virtual_accounts", "Deactivate a virtual account"),
    action("/api/customers/{id}/virtual-accounts/{accountId}/reactivate", "/customers/{id}/virtual_accounts/{accountId}/reactivate", "virtual_accounts", "Reactivate a virtual account"),
    list("/api/customers/{id}/virtual-accounts/{accountId}/history", "/customers/{id}/virtual_accounts/{accountId}/history", "virtual_accounts", "Virtual account activity history"),
    // Static memos
    post("/api/customers/{id}/static-memos", "/customers/{id}/static_memos", "static_memos", "Create a static memo"),
    list("/api/customers/{id}/static-memos", "/customers/{id}/static_memos", "static_memos", "List static memos"),
    get("/api/customers/{id}/static-memos/{memoId}", "/customers/{id}/static_memos/{memoId}", "static_memos", "Get a static memo"),
    put("/api/customers/{id}/static-memos/{memoId}", "/customers/{id}/static_memos/{memoId}", "static_memos", "Update a static memo"),
    list("/api/customers/{id}/static-memos/{memoId}/history", "/customers/{id}/static_memos/{memoId}/history", "static_memos", "Static memo activity history"),
    // Liquidation addresses
    post("/api/customers/{id}/liquidation-addresses", "/customers/{id}/liquidation_addresses", "liquidation_addresses", "Create a liquidation address"),
    list("/api/customers/{id}/liquidation-addresses", "/customers/{id}/liquidation_addresses", "liquidation_addresses", "List liquidation addresses"),
    get("/api/customers/{id}/liquidation-addresses/{addressId}", "/customers/{id}/liquidation_addresses/{addressId}", "liquidation_addresses", "Get a liquidation address"),
    put("/api/customers/{id}/liquidation-addresses/{addressId}", "/customers/{id}/liquidation_addresses/{addressId}", "liquidation_addresses", "Update a liquidation address"),
    // Prefunded accounts
    get("/api/prefunded-accounts", "/developers/prefunded_accounts", "prefunded_accounts", "List prefunded accounts"),
    get("/api/prefunded-accounts/{id}", "/developers/prefunded_accounts/{id}", "prefunded_accounts", "Get a prefunded account"),
    // Cards
    post("/api/cards", "/cards", "cards", "Issue a card"),
    list("/api/cards", "/cards", "cards", "List cards"),
    get("/api/cards/{id}", "/cards/{id}", "cards", "Get a card"),
    put("/api/cards/{id}", "/cards/{id}", "cards", "Update a card"),
    // Plaid
    post("/api/plaid/link-tokens", "/plaid/link_tokens", "plaid", "Create a Plaid link token"),
    post("/api/plaid/external-accounts", "/plaid/external_accounts", "plaid", "Exchange a Plaid token for an external account"),
    // Exchange rates
    list("/api/exchange-rates", "/exchange_rates", "exchange_rates", "Current exchange rates"),
    // Lists
    get("/api/lists/currencies", "/lists/currencies", "lists", "Supported currencies"),
    get("/api/lists/chains", "/lists/chains", "lists", "Supported chains"),
    get("/api/lists/countries", "/lists/countries", "lists", "Supported countries"),
    // Webhook management
    post("/api/webhooks", "/webhooks", "webhooks", "Register a webhook endpoint"),
    list("/api/webhooks", "/webhooks", "webhooks", "List webhook endpoints"),
    get("/api/webhooks/{id}", "/webhooks/{id}", "webhooks", "Get a webhook endpoint"),
    put("/api/webhooks/{id}", "/webhooks/{id}", "webhooks", "Update a webhook endpoint"),
    delete("/api/webhooks/{id}", "/webhooks/{id}", "webhooks", "Delete a webhook endpoint"),
    list("/api/webhooks/{id}/events", "/webhooks/{id}/events", "webhooks", "Upcoming webhook events"),
    list("/api/webhooks/{id}/logs", "/webhooks/{id}/logs", "webhooks", "Webhook delivery logs"),
    post("/api/webhooks/{id}/send", "/webhooks/{id}/send", "webhooks", "Send a test webhook event"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::PathTemplate;
    use std::collections::HashSet;

    #[test]
    fn test_no_duplicate_routes() {
        let mut seen = HashSet::new();
        for route in ROUTES {
            assert!(
                seen.insert((route.method, route.gateway)),
                "duplicate route {} {}",
                route.method,
                route.gateway
            );
        }
        assert_eq!(ROUTES.len(), 62);
    }

    #[test]
    fn test_templates_share_params() {
        for route in ROUTES {
            let gateway = PathTemplate::parse(route.gateway);
            let upstream = PathTemplate::parse(route.upstream);
            let mut g: Vec<_> = gateway.params().collect();
            let mut u: Vec<_> = upstream.params().collect();
            g.sort_unstable();
            u.sort_unstable();
            assert_eq!(g, u, "{} {}", route.method, route.gateway);
            assert!(route.gateway.starts_with("/api/"));
        }
    }

    #[test]
    fn test_only_reads_forward_queries() {
        for route in ROUTES.iter().filter(|r| r.forwards_query) {
            assert_eq!(route.method, Method::Get);
        }
        for route in ROUTES.iter().filter(|r| r.forwards_body) {
            assert!(route.method.is_mutating());
        }
    }
}
