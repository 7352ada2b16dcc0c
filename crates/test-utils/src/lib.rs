//! Shared test fixtures for tokenfit crates.
//!
//! Provides realistic property-management payloads (bookings, listings,
//! financial transactions) at controllable sizes so shaping tests can hit
//! specific token-budget regimes without hand-writing large JSON blobs.

use serde_json::{json, Map, Value};

/// A compact booking with the seven essential fields plus a little extra.
pub fn sample_booking(id: u64) -> Value {
    json!({
        "id": id,
        "guestName": "Ada Lovelace",
        "guestEmail": "ada@example.com",
        "checkIn": "2026-09-01",
        "checkOut": "2026-09-08",
        "listingId": 4021,
        "status": "confirmed",
        "totalPrice": 1834.50,
        "currency": "EUR",
        "channel": "direct"
    })
}

/// A booking padded to `extra_fields` additional wide fields.
///
/// Useful for pushing an object over a soft threshold: each padding field
/// carries ~200 characters of value.
pub fn wide_booking(id: u64, extra_fields: usize) -> Value {
    let mut object = match sample_booking(id) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    object.insert(
        "guestAddress".to_string(),
        json!({"street": "12 Analytical Way", "city": "London", "countryCode": "GB"}),
    );
    for i in 0..extra_fields {
        object.insert(
            format!("channelMetadata{i}"),
            Value::String("x".repeat(200)),
        );
    }
    Value::Object(object)
}

/// A listing with nested address data.
pub fn sample_listing(id: u64) -> Value {
    json!({
        "id": id,
        "name": format!("Seaside flat {id}"),
        "address": {"city": "Lisbon", "countryCode": "PT", "street": "Rua Nova 3"},
        "bedroomsNumber": 2,
        "basePrice": 120.0,
        "status": "active",
        "amenities": ["wifi", "kitchen", "washer"],
        "description": "Bright two-bedroom flat near the water."
    })
}

/// A single financial transaction.
pub fn sample_transaction(id: u64) -> Value {
    json!({
        "id": id,
        "bookingId": 9000 + id,
        "type": "payout",
        "amount": 412.75,
        "currency": "EUR",
        "date": "2026-08-15",
        "status": "settled",
        "processorReference": format!("ch_{id:012}"),
        "feeBreakdown": {"processing": 12.10, "platform": 20.60, "tax": 4.93},
        "memo": "Nightly rate x7 minus channel commission and cleaning adjustment."
    })
}

/// A collection of `n` transactions.
pub fn sample_transactions(n: usize) -> Value {
    Value::Array((0..n as u64).map(sample_transaction).collect())
}

/// A financial report with aggregates and an embedded transaction list.
pub fn sample_report(transactions: usize) -> Value {
    json!({
        "reportId": "2026-08",
        "periodStart": "2026-08-01",
        "periodEnd": "2026-08-31",
        "currency": "EUR",
        "totalRevenue": 48120.30,
        "totalExpenses": 9314.12,
        "netIncome": 38806.18,
        "occupancyRate": 0.87,
        "transactions": sample_transactions(transactions),
    })
}

/// Unwrap a JSON value into its object map, panicking otherwise.
pub fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}
