use super::*;
use crate::test_support::{
    catalog, closed_base_url, company_json, http_transport, page_of, MockApi, ScriptedTransport,
};
use async_trait::async_trait;
use serde_json::json;
use shared::domain::{Company, CompanyId};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

fn company_store(transport: Arc<dyn ApiTransport>) -> ResourceStore<Company> {
    ResourceStore::new(transport, catalog())
}

fn names(store: &ResourceStore<Company>) -> Vec<String> {
    store.items().into_iter().map(|c| c.name).collect()
}

#[tokio::test]
async fn list_replaces_items_and_pagination() {
    let transport = ScriptedTransport::new();
    transport.push_ok(page_of(
        vec![
            company_json(1, "Andes Cargo", "20100000001"),
            company_json(2, "Pacific Freight", "20100000002"),
        ],
        2,
        2,
        7,
    ));
    let store = company_store(transport.clone());

    store.list(2, 2, None).await.expect("list");

    assert_eq!(names(&store), vec!["Andes Cargo", "Pacific Freight"]);
    let pagination = store.pagination();
    assert_eq!(pagination.current_page, 2);
    assert_eq!(pagination.total_pages, 4);
    assert_eq!(pagination.total_records, 7);
    assert!(!store.is_loading());
    assert_eq!(store.error_message(), None);

    let requests = transport.requests();
    assert_eq!(requests[0].path(), "companies/enabled");
    assert_eq!(requests[0].query_value("page"), Some("2"));
    assert_eq!(requests[0].query_value("limit"), Some("2"));
    assert_eq!(requests[0].query_value("term"), None);
}

#[tokio::test]
async fn search_with_blank_term_lists_instead() {
    let transport = ScriptedTransport::new();
    let store = company_store(transport.clone());

    store.search("   ", 3, 10, None).await.expect("blank search");
    store.search(" andes ", 3, 10, Some("carrier")).await.expect("search");

    let requests = transport.requests();
    assert_eq!(requests[0].path(), "companies/enabled");
    assert_eq!(requests[0].query_value("term"), None);
    assert_eq!(requests[1].path(), "companies/search");
    assert_eq!(requests[1].query_value("term"), Some("andes"));
    assert_eq!(requests[1].query_value("page"), Some("3"));
    assert_eq!(requests[1].query_value("type"), Some("carrier"));
}

#[tokio::test]
async fn null_data_yields_an_empty_page() {
    let transport = ScriptedTransport::new();
    transport.push_ok(page_of(vec![company_json(1, "Andes Cargo", "1")], 1, 10, 1));
    transport.push_ok(Envelope::ok(Value::Null));
    let store = company_store(transport.clone());

    store.list(1, 10, None).await.expect("first list");
    store.list(1, 10, None).await.expect("second list");
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn failure_keeps_previous_items_and_sets_message() {
    let transport = ScriptedTransport::new();
    transport.push_ok(page_of(vec![company_json(1, "Andes Cargo", "1")], 1, 10, 1));
    transport.push_ok(
        Envelope::<Value>::failed(400, "").with_messages(["identification must be numeric", "email is invalid"]),
    );
    let store = company_store(transport.clone());
    let mut events = store.subscribe();

    store.list(1, 10, None).await.expect("first list");
    let err = store.search("x", 1, 10, None).await.expect_err("domain failure");

    assert!(matches!(err, StoreError::Domain { status_code: 400, .. }));
    let expected = "Identification number must be numeric, Email address is invalid";
    assert_eq!(err.user_message(), expected);
    assert_eq!(store.error_message().as_deref(), Some(expected));
    assert_eq!(names(&store), vec!["Andes Cargo"]);
    assert!(!store.is_loading());

    let mut raised = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let StoreEvent::ErrorRaised { operation, message } = event {
            raised.push((operation, message));
        }
    }
    assert_eq!(raised, vec![(Operation::Search, expected.to_string())]);
}

#[tokio::test]
async fn next_operation_clears_the_previous_error() {
    let transport = ScriptedTransport::new();
    transport.push_ok(Envelope::failed(500, "boom"));
    let store = company_store(transport.clone());

    store.list(1, 10, None).await.expect_err("failure");
    assert_eq!(store.error_message().as_deref(), Some("boom"));

    store.list(1, 10, None).await.expect("recovered");
    assert_eq!(store.error_message(), None);
}

#[tokio::test]
async fn http_error_bodies_and_network_failures_are_surfaced() {
    let api = MockApi::new();
    api.respond_json(500, &json!({"statusCode": 500, "error": "identification duplicated"}))
        .await;
    let base_url = api.clone().spawn().await;
    let store = company_store(http_transport(&base_url));

    let err = store.list(1, 10, None).await.expect_err("500");
    assert_eq!(err.user_message(), "Identification number duplicated");

    let offline = company_store(http_transport(&closed_base_url().await));
    let err = offline.list(1, 10, None).await.expect_err("offline");
    assert_eq!(err.user_message(), "Something went wrong");
    assert_eq!(offline.error_message().as_deref(), Some("Something went wrong"));
    assert!(!offline.is_loading());
}

#[tokio::test]
async fn loading_is_raised_while_in_flight() {
    let (api, gate) = MockApi::new().gated();
    api.respond_json(
        200,
        &serde_json::to_value(page_of(vec![company_json(1, "Andes Cargo", "1")], 1, 10, 1))
            .expect("page json"),
    )
    .await;
    let base_url = api.clone().spawn().await;
    let store = Arc::new(company_store(http_transport(&base_url)));

    let task = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.list(1, 10, None).await })
    };
    api.wait_for_requests(1).await;
    assert!(store.is_loading());
    assert!(store.snapshot().is_loading);

    gate.notify_one();
    task.await.expect("join").expect("list");
    assert!(!store.is_loading());
    assert_eq!(names(&store), vec!["Andes Cargo"]);
}

#[tokio::test]
async fn cancelled_request_still_lowers_loading() {
    let (api, _gate) = MockApi::new().gated();
    let base_url = api.clone().spawn().await;
    let store = Arc::new(company_store(http_transport(&base_url)));

    let task = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.list(1, 10, None).await })
    };
    api.wait_for_requests(1).await;
    assert!(store.is_loading());

    task.abort();
    assert!(task.await.expect_err("aborted").is_cancelled());
    assert!(!store.is_loading());
}

/// First request blocks until released; later ones answer at once.
struct SlowFirstTransport {
    calls: AtomicUsize,
    release: Notify,
}

#[async_trait]
impl ApiTransport for SlowFirstTransport {
    async fn send(&self, _request: ApiRequest) -> Result<Envelope<Value>, TransportError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.release.notified().await;
            return Ok(page_of(vec![company_json(1, "stale", "1")], 1, 10, 1));
        }
        Ok(page_of(vec![company_json(2, "fresh", "2")], 1, 10, 1))
    }
}

#[tokio::test]
async fn superseded_responses_are_discarded() {
    let transport = Arc::new(SlowFirstTransport {
        calls: AtomicUsize::new(0),
        release: Notify::new(),
    });
    let store = Arc::new(company_store(transport.clone()));

    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.search("an", 1, 10, None).await })
    };
    while transport.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    store.search("andes", 1, 10, None).await.expect("fresh search");
    assert_eq!(names(&store), vec!["fresh"]);
    assert!(store.is_loading(), "slow request still in flight");

    transport.release.notify_one();
    slow.await.expect("join").expect("slow search");
    assert_eq!(names(&store), vec!["fresh"]);
    assert!(!store.is_loading());
    assert_eq!(
        store.last_query().and_then(|q| q.term).as_deref(),
        Some("andes")
    );
}

#[tokio::test]
async fn create_and_update_do_not_touch_items() {
    let transport = ScriptedTransport::new();
    transport.push_ok(page_of(vec![company_json(1, "Andes Cargo", "1")], 1, 10, 1));
    transport.push_ok(Envelope::ok(company_json(2, "Pacific Freight", "2")));
    transport.push_ok(Envelope::ok(json!({"affected": 1})));
    let store = company_store(transport.clone());
    store.list(1, 10, None).await.expect("list");

    let created = store
        .create(&json!({"name": "Pacific Freight"}))
        .await
        .expect("create");
    assert_eq!(created.map(|c| c.id), Some(CompanyId(2)));

    let updated = store
        .update(CompanyId(1), &json!({"name": "Andes Cargo SAC"}))
        .await
        .expect("update");
    assert!(updated.is_none(), "undecodable data is tolerated");

    assert_eq!(names(&store), vec!["Andes Cargo"]);
    let posts = transport.requests_with(Method::Post);
    assert_eq!(posts[0].path(), "companies");
    assert_eq!(posts[0].body, Some(json!({"name": "Pacific Freight"})));
    let puts = transport.requests_with(Method::Put);
    assert_eq!(puts[0].path(), "companies/1");
}

struct Unencodable;

impl Serialize for Unencodable {
    fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("unsupported payload"))
    }
}

#[tokio::test]
async fn unencodable_payload_fails_inside_the_loading_cycle() {
    let transport = ScriptedTransport::new();
    let store = company_store(transport.clone());
    let mut events = store.subscribe();

    let err = store.create(&Unencodable).await.expect_err("encode failure");

    assert!(matches!(
        err,
        StoreError::Transport {
            source: TransportError::Encode(_),
            ..
        }
    ));
    assert_eq!(store.error_message().as_deref(), Some("Something went wrong"));
    assert!(!store.is_loading());
    assert!(transport.requests().is_empty());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            StoreEvent::LoadingChanged(true),
            StoreEvent::ErrorRaised {
                operation: Operation::Create,
                message: "Something went wrong".into(),
            },
            StoreEvent::LoadingChanged(false),
        ]
    );
}

#[tokio::test]
async fn remove_locally_only_after_confirmed_delete() {
    let transport = ScriptedTransport::new();
    transport.push_ok(page_of(
        vec![company_json(1, "Andes Cargo", "1"), company_json(2, "Pacific Freight", "2")],
        1,
        10,
        2,
    ));
    transport.push_ok(Envelope::failed(409, "Company has active vehicles"));
    transport.push_ok(Envelope::ok(Value::Null));
    let store = company_store(transport.clone()).with_delete_policy(DeletePolicy::RemoveLocally);
    store.list(1, 10, None).await.expect("list");
    let mut events = store.subscribe();

    let err = store.delete(CompanyId(1)).await.expect_err("rejected delete");
    assert_eq!(err.user_message(), "Company has active vehicles");
    assert_eq!(names(&store), vec!["Andes Cargo", "Pacific Freight"]);

    store.delete(CompanyId(1)).await.expect("delete");
    assert_eq!(names(&store), vec!["Pacific Freight"]);
    assert_eq!(transport.requests_with(Method::Delete).len(), 2);

    let mut removed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let StoreEvent::ItemRemoved { id } = event {
            removed.push(id);
        }
    }
    assert_eq!(removed, vec!["1".to_string()]);
}

#[tokio::test]
async fn refetch_policy_leaves_items_for_the_caller() {
    let transport = ScriptedTransport::new();
    transport.push_ok(page_of(vec![company_json(1, "Andes Cargo", "1")], 1, 10, 1));
    let store = company_store(transport.clone());
    store.list(1, 10, None).await.expect("list");

    store.delete(CompanyId(1)).await.expect("delete");
    assert_eq!(names(&store), vec!["Andes Cargo"]);
    assert_eq!(transport.requests_with(Method::Delete)[0].path(), "companies/1");
}

#[tokio::test]
async fn lookup_reports_missing_records_as_none() {
    let transport = ScriptedTransport::new();
    transport.push_ok(Envelope::ok(company_json(4, "Andes Cargo", "20100000001")));
    transport.push_ok(Envelope::failed(404, "Company not found"));
    transport.push(Err(TransportError::Status {
        status: 404,
        body: None,
    }));
    let store = company_store(transport.clone());

    let found = store
        .lookup_by_identification(" 20100000001 ")
        .await
        .expect("lookup");
    assert_eq!(found.map(|c| c.id), Some(CompanyId(4)));

    assert!(store.lookup_by_identification("999").await.expect("domain 404").is_none());
    assert!(store.lookup_by_identification("998").await.expect("http 404").is_none());
    assert_eq!(store.error_message(), None);
    assert!(store.items().is_empty());

    let requests = transport.requests();
    assert_eq!(requests[0].segments, vec!["companies", "identification", "20100000001"]);
}

#[tokio::test]
async fn lookup_failures_other_than_not_found_are_errors() {
    let transport = ScriptedTransport::new();
    transport.push_ok(Envelope::failed(500, "lookup unavailable"));
    let store = company_store(transport);

    let err = store
        .lookup_by_identification("123")
        .await
        .expect_err("500");
    assert_eq!(err.user_message(), "lookup unavailable");
    assert_eq!(store.error_message().as_deref(), Some("lookup unavailable"));
}

#[tokio::test]
async fn refresh_repeats_the_last_query() {
    let transport = ScriptedTransport::new();
    let store = company_store(transport.clone()).with_default_page_size(20);

    store.refresh().await.expect("initial refresh");
    store.search("pacific", 2, 5, None).await.expect("search");
    store.refresh().await.expect("refresh");

    let requests = transport.requests();
    assert_eq!(requests[0].query_value("limit"), Some("20"));
    assert_eq!(requests[2].path(), "companies/search");
    assert_eq!(requests[2].query_value("term"), Some("pacific"));
    assert_eq!(requests[2].query_value("page"), Some("2"));
}
