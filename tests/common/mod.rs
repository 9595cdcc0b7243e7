//! Shared test infrastructure for the integration suites.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{AuthorityObject, Catalog, MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use overlay_dns::authority::{ClusterAuthority, ReverseAuthority};
use overlay_dns::gossip::{GossipData, GossipSender};
use overlay_dns::{NameError, Nameserver};

// --- Constants ---

pub const DOMAIN: &str = "cluster.local.";
pub const TTL: u32 = 60;
pub const RETENTION: Duration = Duration::from_secs(600);

// --- Gossip transport doubles ---

/// Transport that drops every broadcast on the floor.
pub struct NoopGossip;

#[async_trait]
impl GossipSender for NoopGossip {
    async fn broadcast(&self, _data: GossipData) -> Result<(), NameError> {
        Ok(())
    }
}

/// Transport that remembers every broadcast payload for inspection.
pub struct RecordingGossip {
    pub sent: Mutex<Vec<GossipData>>,
}

impl RecordingGossip {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl GossipSender for RecordingGossip {
    async fn broadcast(&self, data: GossipData) -> Result<(), NameError> {
        self.sent.lock().unwrap().push(data);
        Ok(())
    }
}

/// Build a nameserver named `peer` with a no-op transport attached.
pub fn make_nameserver(peer: &str) -> Arc<Nameserver> {
    let ns = Arc::new(Nameserver::new(peer, RETENTION));
    ns.set_gossip(Arc::new(NoopGossip));
    ns
}

/// Deliver one anti-entropy round from `from` to `to`.
pub fn exchange(from: &Nameserver, to: &Nameserver) {
    let payload = from.gossip().encode().expect("encode snapshot");
    to.on_gossip(&payload).expect("merge snapshot");
}

/// Run anti-entropy both ways until the two nameservers agree.
pub fn converge(a: &Nameserver, b: &Nameserver) {
    exchange(a, b);
    exchange(b, a);
}

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// Implements `ResponseHandler` so it can be passed to
/// `Catalog::handle_request()`. The response is serialized via
/// `MessageResponse::destructive_emit()` and stored as raw wire-format
/// bytes, which can then be parsed with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Catalog construction ---

/// Build a catalog with the forward and reverse authorities over `ns`.
pub fn build_catalog(ns: Arc<Nameserver>) -> Catalog {
    let forward = ClusterAuthority::new(DOMAIN, TTL, Arc::clone(&ns))
        .expect("failed to create forward authority");
    let reverse =
        ReverseAuthority::new(TTL, ns).expect("failed to create reverse authority");

    let mut catalog = Catalog::new();
    let forward: Arc<dyn AuthorityObject> = Arc::new(forward);
    catalog.upsert(forward.origin().clone(), vec![forward]);
    let reverse: Arc<dyn AuthorityObject> = Arc::new(reverse);
    catalog.upsert(reverse.origin().clone(), vec![reverse]);
    catalog
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

/// Build a full `Request` from a UDP client.
pub fn build_request(name: &str, record_type: RecordType, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, id);
    let msg = parse_message_request(&bytes);
    let src: SocketAddr = "10.0.0.99:12345".parse().unwrap();
    Request::new(msg, src, Protocol::Udp)
}

/// Execute a query through the catalog and return the parsed response.
pub async fn execute_query(
    catalog: &Catalog,
    name: &str,
    record_type: RecordType,
    id: u16,
) -> Message {
    let request = build_request(name, record_type, id);
    let handler = TestResponseHandler::new();
    catalog.handle_request(&request, handler.clone()).await;
    handler.into_message()
}

// --- Response helpers ---

/// Extract A addresses from a response.
pub fn extract_a_ips(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(Ipv4Addr::from(*a)),
            _ => None,
        })
        .collect()
}

/// Extract PTR targets from a response.
pub fn extract_ptr_names(msg: &Message) -> Vec<String> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::PTR(ptr) => Some(ptr.0.to_string()),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}

/// Assert response is successful with exactly the expected IPs,
/// irrespective of answer order (the server shuffles).
pub fn assert_a_response(msg: &Message, expected_ips: &[Ipv4Addr]) {
    assert_response_code(msg, ResponseCode::NoError);
    let mut actual = extract_a_ips(msg);
    actual.sort();
    let mut expected: Vec<Ipv4Addr> = expected_ips.to_vec();
    expected.sort();
    assert_eq!(
        actual, expected,
        "A records mismatch.\nactual:   {:?}\nexpected: {:?}",
        actual, expected
    );
}
