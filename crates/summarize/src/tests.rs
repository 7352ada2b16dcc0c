use super::*;
use tokenfit_estimate::estimate_tokens;
use tokenfit_test_utils::{sample_booking, sample_transactions, wide_booking};

fn budget(soft: usize, hard: usize) -> TokenBudget {
    TokenBudget::new(soft, hard).expect("valid budget")
}

fn booking_details() -> DetailsAvailable {
    DetailsAvailable::by_id("/bookings/{id}", "id")
}

fn registry() -> FieldSetRegistry {
    FieldSetRegistry::with_defaults()
}

#[test]
fn payload_under_soft_threshold_passes_through_unchanged() {
    let payload = sample_booking(1);
    let original = payload.clone();
    let shaped = maybe_summarize(
        payload,
        &budget(4000, 12000),
        &registry(),
        "booking",
        booking_details(),
    );
    match shaped {
        Shaped::Full(value) => assert_eq!(value, original),
        Shaped::Preview(_) => panic!("small payload must not be summarized"),
    }
}

#[test]
fn oversized_booking_becomes_a_preview_within_the_cap() {
    /*
    GIVEN a booking far over the soft threshold
    WHEN summarized against soft=4000, hard=12000
    THEN the result is a preview envelope whose estimate respects the cap
         and whose summary keeps only essential fields
    */
    let payload = wide_booking(7, 120);
    let cap = budget(4000, 12000);
    assert!(estimate_tokens(&payload) > cap.soft_threshold);

    let shaped = maybe_summarize(payload, &cap, &registry(), "booking", booking_details());
    let Shaped::Preview(envelope) = shaped else {
        panic!("expected preview");
    };
    assert_eq!(envelope.meta.kind, "preview");
    assert!(envelope.meta.projected_fields <= envelope.meta.total_fields);
    assert!(estimate_tokens_of(&envelope) <= cap.hard_cap);

    let summary = envelope.summary.as_object().expect("object summary");
    assert_eq!(summary.get("id"), Some(&serde_json::json!(7)));
    assert!(summary.get("guestName").is_some());
    assert!(
        summary.get("channelMetadata0").is_none(),
        "padding fields must not survive projection"
    );
}

#[test]
fn preview_estimate_respects_hard_cap_across_budgets() {
    let registry = registry();
    for (soft, hard) in [(200, 400), (500, 900), (1000, 2500), (4000, 12000)] {
        let cap = budget(soft, hard);
        let shaped = maybe_summarize(
            wide_booking(3, 150),
            &cap,
            &registry,
            "booking",
            booking_details(),
        );
        if let Shaped::Preview(envelope) = shaped {
            assert!(
                estimate_tokens_of(&envelope) <= cap.hard_cap,
                "cap violated for budget {soft}/{hard}"
            );
        }
    }
}

#[test]
fn oversized_collection_is_truncated_with_true_count_in_meta() {
    /*
    GIVEN 100 transactions whose projection still exceeds the hard cap
    WHEN summarized
    THEN trailing elements are dropped until the envelope fits, and meta
         reports the original count of 100
    */
    let payload = sample_transactions(100);
    let cap = budget(500, 2000);
    let shaped = maybe_summarize(
        payload,
        &cap,
        &registry(),
        "financial_transaction",
        DetailsAvailable::by_id("/financial/transactions/{id}", "id"),
    );
    let Shaped::Preview(envelope) = shaped else {
        panic!("expected preview");
    };

    let kept = envelope.summary.as_array().expect("array summary").len();
    assert!(kept >= 1, "at least one element must survive");
    assert!(kept < 100, "collection should have been truncated");
    assert_eq!(envelope.meta.original_count, Some(100));
    assert_eq!(envelope.meta.returned_count, Some(kept as u64));
    assert!(estimate_tokens_of(&envelope) <= cap.hard_cap);
}

#[test]
fn collection_that_fits_after_projection_is_not_truncated() {
    let payload = sample_transactions(20);
    let shaped = maybe_summarize(
        payload,
        &budget(500, 12000),
        &registry(),
        "financial_transaction",
        DetailsAvailable::by_id("/financial/transactions/{id}", "id"),
    );
    let Shaped::Preview(envelope) = shaped else {
        panic!("expected preview");
    };
    assert_eq!(envelope.summary.as_array().map(Vec::len), Some(20));
    assert_eq!(envelope.meta.original_count, Some(20));
    assert_eq!(envelope.meta.returned_count, None);
}

#[test]
fn paginated_wrapper_keys_survive_summarization() {
    let payload = serde_json::json!({
        "items": sample_transactions(60),
        "next_cursor": "opaque",
        "meta": {"page_size": 60, "has_more": true},
    });
    let shaped = maybe_summarize(
        payload,
        &budget(500, 3000),
        &registry(),
        "financial_transaction",
        DetailsAvailable::by_id("/financial/transactions/{id}", "id"),
    );
    let Shaped::Preview(envelope) = shaped else {
        panic!("expected preview");
    };
    let summary = envelope.summary.as_object().expect("wrapped summary");
    assert!(summary.contains_key("items"));
    assert_eq!(summary.get("next_cursor"), Some(&serde_json::json!("opaque")));
    assert_eq!(envelope.meta.original_count, Some(60));
}

#[test]
fn hard_cap_squeezes_projection_down_to_identifier_only() {
    let payload = wide_booking(9, 50);
    let cap = budget(10, 60);
    let shaped = maybe_summarize(payload, &cap, &registry(), "booking", booking_details());
    let Shaped::Preview(envelope) = shaped else {
        panic!("expected preview");
    };
    assert_eq!(
        envelope.summary,
        serde_json::json!({"id": 9}),
        "only the identifier should survive"
    );
    assert_eq!(envelope.meta.projected_fields, 1);
}

#[test]
fn absurd_cap_still_yields_a_sparse_envelope() {
    // A cap below the envelope skeleton cannot be honored literally, but
    // the service must still emit a valid preview rather than fail.
    let shaped = maybe_summarize(
        wide_booking(2, 50),
        &budget(5, 20),
        &registry(),
        "booking",
        booking_details(),
    );
    let Shaped::Preview(envelope) = shaped else {
        panic!("expected preview");
    };
    assert_eq!(envelope.summary, serde_json::json!({}));
    assert_eq!(envelope.meta.projected_fields, 0);
}

#[test]
fn registry_miss_with_identifier_projects_id_only() {
    let payload = serde_json::json!({
        "id": 77,
        "notes": "n".repeat(30_000),
    });
    let shaped = maybe_summarize(
        payload,
        &budget(400, 2000),
        &registry(),
        "webhook_event",
        DetailsAvailable::by_id("/webhooks/{id}", "id"),
    );
    let Shaped::Preview(envelope) = shaped else {
        panic!("expected preview");
    };
    assert_eq!(envelope.summary, serde_json::json!({"id": 77}));
}

#[test]
fn registry_miss_without_identifier_passes_through() {
    let payload = serde_json::json!({"blob": "b".repeat(30_000)});
    let original = payload.clone();
    let shaped = maybe_summarize(
        payload,
        &budget(400, 2000),
        &registry(),
        "webhook_event",
        DetailsAvailable::by_id("/webhooks/{id}", "id"),
    );
    assert_eq!(shaped, Shaped::Full(original));
}

#[test]
fn oversized_scalar_passes_through_for_the_backstop() {
    let payload = serde_json::Value::String("s".repeat(30_000));
    let original = payload.clone();
    let shaped = maybe_summarize(
        payload,
        &budget(400, 2000),
        &registry(),
        "booking",
        booking_details(),
    );
    assert_eq!(shaped, Shaped::Full(original));
}

#[test]
fn preview_is_never_nested() {
    // Run a preview's serialized form back through the service with a
    // generous budget: it fits and must come back as-is, not re-wrapped.
    let first = maybe_summarize(
        wide_booking(4, 120),
        &budget(400, 12000),
        &registry(),
        "booking",
        booking_details(),
    );
    let wire = first.into_value();
    let again = maybe_summarize(
        wire.clone(),
        &budget(4000, 12000),
        &registry(),
        "booking",
        booking_details(),
    );
    assert_eq!(again, Shaped::Full(wire));
}
