//! Catalog-level integration tests for the DNS front-end.
//!
//! These go through Hickory's full `Catalog` →
//! `RequestHandler::handle_request()` → `Authority::search()` pipeline
//! with wire-format queries. No root or network privileges required.

mod common;

use common::*;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;

#[tokio::test]
async fn a_query_returns_all_live_bindings() {
    let ns = make_nameserver("node-1");
    ns.add_entry("web.cluster.local", "c1", ip("10.0.0.1"))
        .await
        .unwrap();
    ns.add_entry("web.cluster.local", "c2", ip("10.0.0.2"))
        .await
        .unwrap();

    let catalog = build_catalog(ns);
    let msg = execute_query(&catalog, "web.cluster.local.", RecordType::A, 1).await;

    assert_a_response(&msg, &[ip("10.0.0.1"), ip("10.0.0.2")]);
}

#[tokio::test]
async fn a_query_is_authoritative_with_configured_ttl() {
    let ns = make_nameserver("node-1");
    ns.add_entry("web.cluster.local", "c1", ip("10.0.0.1"))
        .await
        .unwrap();

    let catalog = build_catalog(ns);
    let msg = execute_query(&catalog, "web.cluster.local.", RecordType::A, 2).await;

    assert!(msg.authoritative());
    assert_eq!(msg.answers().len(), 1);
    assert_eq!(msg.answers()[0].ttl(), TTL);
}

#[tokio::test]
async fn a_query_unknown_name_is_nxdomain() {
    let catalog = build_catalog(make_nameserver("node-1"));

    let msg = execute_query(&catalog, "missing.cluster.local.", RecordType::A, 3).await;

    assert_response_code(&msg, ResponseCode::NXDomain);
    assert!(extract_a_ips(&msg).is_empty());
}

#[tokio::test]
async fn a_query_is_case_insensitive() {
    let ns = make_nameserver("node-1");
    ns.add_entry("Web.Cluster.Local", "c1", ip("10.0.0.1"))
        .await
        .unwrap();

    let catalog = build_catalog(ns);
    let msg = execute_query(&catalog, "WEB.cluster.LOCAL.", RecordType::A, 4).await;

    assert_a_response(&msg, &[ip("10.0.0.1")]);
}

#[tokio::test]
async fn tombstoned_binding_disappears_from_answers() {
    let ns = make_nameserver("node-1");
    ns.add_entry("web.cluster.local", "c1", ip("10.0.0.1"))
        .await
        .unwrap();
    ns.add_entry("web.cluster.local", "c2", ip("10.0.0.2"))
        .await
        .unwrap();
    ns.container_died("c1");

    let catalog = build_catalog(ns);
    let msg = execute_query(&catalog, "web.cluster.local.", RecordType::A, 5).await;

    assert_a_response(&msg, &[ip("10.0.0.2")]);
}

#[tokio::test]
async fn shuffled_answers_are_a_permutation_of_the_bindings() {
    let ns = make_nameserver("node-1");
    let expected: Vec<_> = (1..=8).map(|i| ip(&format!("10.0.0.{i}"))).collect();
    for (i, addr) in expected.iter().enumerate() {
        ns.add_entry("web.cluster.local", &format!("c{i}"), *addr)
            .await
            .unwrap();
    }

    let catalog = build_catalog(ns);
    for id in 0..10 {
        let msg = execute_query(&catalog, "web.cluster.local.", RecordType::A, id).await;
        // Whatever order the shuffle lands on, the answer set is intact.
        assert_a_response(&msg, &expected);
    }
}

#[tokio::test]
async fn aaaa_query_under_the_zone_returns_no_records() {
    let ns = make_nameserver("node-1");
    ns.add_entry("web.cluster.local", "c1", ip("10.0.0.1"))
        .await
        .unwrap();

    let catalog = build_catalog(ns);
    let msg = execute_query(&catalog, "web.cluster.local.", RecordType::AAAA, 6).await;

    assert_response_code(&msg, ResponseCode::NoError);
    assert!(msg.answers().is_empty());
}

#[tokio::test]
async fn ptr_query_resolves_address_back_to_hostname() {
    let ns = make_nameserver("node-1");
    ns.add_entry("web.cluster.local", "c1", ip("10.0.0.1"))
        .await
        .unwrap();

    let catalog = build_catalog(ns);
    let msg = execute_query(&catalog, "1.0.0.10.in-addr.arpa.", RecordType::PTR, 7).await;

    assert_response_code(&msg, ResponseCode::NoError);
    assert_eq!(extract_ptr_names(&msg), vec!["web.cluster.local.".to_string()]);
}

#[tokio::test]
async fn ptr_query_unknown_address_is_nxdomain() {
    let catalog = build_catalog(make_nameserver("node-1"));

    let msg = execute_query(&catalog, "9.0.0.10.in-addr.arpa.", RecordType::PTR, 8).await;

    assert_response_code(&msg, ResponseCode::NXDomain);
}

#[tokio::test]
async fn gossiped_entries_are_served_like_local_ones() {
    let publisher = make_nameserver("node-1");
    publisher
        .add_entry("db.cluster.local", "c9", ip("10.0.0.9"))
        .await
        .unwrap();

    let resolver = make_nameserver("node-2");
    exchange(&publisher, &resolver);

    let catalog = build_catalog(resolver);
    let msg = execute_query(&catalog, "db.cluster.local.", RecordType::A, 9).await;

    assert_a_response(&msg, &[ip("10.0.0.9")]);
}
