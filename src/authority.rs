//! Hickory DNS authorities backed by the nameserver.
//!
//! Two zones are served: the configured cluster domain answers A
//! queries from the replicated entry set, and `in-addr.arpa.` answers
//! PTR queries through the reverse index. Answers are shuffled so
//! clients spread load across replicas of a name.

use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, PTR};
use hickory_proto::rr::{DNSClass, LowerName, Name, RData, Record, RecordSet, RecordType};
use hickory_server::authority::{
    Authority, LookupControlFlow, LookupError, LookupOptions, LookupRecords, MessageRequest,
    UpdateResult, ZoneType,
};
use hickory_server::server::RequestInfo;
use rand::seq::SliceRandom;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::entry::fqdn;
use crate::error::NameError;
use crate::metrics::{self, QueryResult, Timer};
use crate::nameserver::Nameserver;

/// Forward authority for the cluster domain: A records out of the
/// replicated entry set.
pub struct ClusterAuthority {
    origin: LowerName,
    ns: Arc<Nameserver>,
    ttl: u32,
}

impl ClusterAuthority {
    /// Create an authority serving `domain` from the given nameserver.
    pub fn new(domain: &str, ttl: u32, ns: Arc<Nameserver>) -> Result<Self, NameError> {
        let origin = Name::from_ascii(domain)?.into();

        Ok(Self { origin, ns, ttl })
    }

    /// Build A records for the given name, one per address, in the
    /// order handed in.
    fn build_a_records(&self, name: Name, addrs: &[Ipv4Addr]) -> RecordSet {
        let mut record_set = RecordSet::new(name.clone(), RecordType::A, 0);

        for addr in addrs {
            let mut record =
                Record::from_rdata(name.clone(), self.ttl, RData::A(A::from(*addr)));
            record.set_dns_class(DNSClass::IN);
            record_set.insert(record, 0);
        }

        record_set
    }
}

#[async_trait]
impl Authority for ClusterAuthority {
    type Lookup = LookupRecords;

    fn zone_type(&self) -> ZoneType {
        ZoneType::Primary
    }

    fn is_axfr_allowed(&self) -> bool {
        false
    }

    fn origin(&self) -> &LowerName {
        &self.origin
    }

    async fn lookup(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        let timer = Timer::start();
        let rtype_str = format!("{:?}", rtype);
        let qname = fqdn(&name.to_string());

        trace!(name = %qname, rtype = ?rtype, "DNS lookup");

        match rtype {
            RecordType::A => {
                let mut addrs = self.ns.lookup(&qname);
                if addrs.is_empty() {
                    debug!(name = %qname, "A lookup: no records found");
                    metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
                    LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NXDomain)))
                } else {
                    addrs.shuffle(&mut rand::thread_rng());
                    debug!(name = %qname, count = addrs.len(), "A lookup: returning records");
                    metrics::record_a_ips_returned(addrs.len());
                    metrics::record_query(&rtype_str, QueryResult::Success, timer.elapsed());
                    let dns_name = Name::from(name.clone());
                    let record_set = Arc::new(self.build_a_records(dns_name, &addrs));
                    LookupControlFlow::Break(Ok(LookupRecords::new(lookup_options, record_set)))
                }
            }
            _ => {
                trace!(name = %qname, rtype = ?rtype, "unsupported record type");
                metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
            }
        }
    }

    async fn search(
        &self,
        request_info: RequestInfo<'_>,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        self.lookup(
            request_info.query.name(),
            request_info.query.query_type(),
            lookup_options,
        )
        .await
    }

    async fn get_nsec_records(
        &self,
        _name: &LowerName,
        _lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        // DNSSEC not supported
        LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
    }

    async fn update(&self, _update: &MessageRequest) -> UpdateResult<bool> {
        // Dynamic updates not supported
        Err(ResponseCode::NotImp)
    }
}

/// Reverse authority for `in-addr.arpa.`: PTR records out of the
/// reverse index over the same entry set.
pub struct ReverseAuthority {
    origin: LowerName,
    ns: Arc<Nameserver>,
    ttl: u32,
}

impl ReverseAuthority {
    /// Create the reverse authority.
    pub fn new(ttl: u32, ns: Arc<Nameserver>) -> Result<Self, NameError> {
        let origin = Name::from_ascii("in-addr.arpa.")?.into();

        Ok(Self { origin, ns, ttl })
    }

    fn build_ptr_record(&self, name: Name, hostname: Name) -> RecordSet {
        let mut record_set = RecordSet::new(name.clone(), RecordType::PTR, 0);
        let mut record = Record::from_rdata(name, self.ttl, RData::PTR(PTR(hostname)));
        record.set_dns_class(DNSClass::IN);
        record_set.insert(record, 0);
        record_set
    }
}

/// Parse a `d.c.b.a.in-addr.arpa.` name back into the address `a.b.c.d`.
fn reverse_name_to_ip(name: &str) -> Option<Ipv4Addr> {
    let octets = name.strip_suffix(".in-addr.arpa.")?;
    let mut parts = octets.split('.').rev();
    let a: u8 = parts.next()?.parse().ok()?;
    let b: u8 = parts.next()?.parse().ok()?;
    let c: u8 = parts.next()?.parse().ok()?;
    let d: u8 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::new(a, b, c, d))
}

#[async_trait]
impl Authority for ReverseAuthority {
    type Lookup = LookupRecords;

    fn zone_type(&self) -> ZoneType {
        ZoneType::Primary
    }

    fn is_axfr_allowed(&self) -> bool {
        false
    }

    fn origin(&self) -> &LowerName {
        &self.origin
    }

    async fn lookup(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        let timer = Timer::start();
        let rtype_str = format!("{:?}", rtype);
        let qname = fqdn(&name.to_string());

        if rtype != RecordType::PTR {
            trace!(name = %qname, rtype = ?rtype, "unsupported record type");
            metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
            return LookupControlFlow::Break(Err(LookupError::ResponseCode(
                ResponseCode::NoError,
            )));
        }

        let Some(addr) = reverse_name_to_ip(&qname) else {
            debug!(name = %qname, "PTR lookup: not a v4 reverse name");
            metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
            return LookupControlFlow::Break(Err(LookupError::ResponseCode(
                ResponseCode::NXDomain,
            )));
        };

        match self.ns.reverse_lookup(addr) {
            Ok(hostname) => {
                let target = match Name::from_ascii(&hostname) {
                    Ok(target) => target,
                    Err(err) => {
                        debug!(name = %qname, hostname = %hostname, error = %err, "PTR lookup: stored hostname unparsable");
                        metrics::record_query(&rtype_str, QueryResult::Error, timer.elapsed());
                        return LookupControlFlow::Break(Err(LookupError::ResponseCode(
                            ResponseCode::ServFail,
                        )));
                    }
                };
                debug!(name = %qname, hostname = %hostname, "PTR lookup: returning record");
                metrics::record_query(&rtype_str, QueryResult::Success, timer.elapsed());
                let dns_name = Name::from(name.clone());
                let record_set = Arc::new(self.build_ptr_record(dns_name, target));
                LookupControlFlow::Break(Ok(LookupRecords::new(lookup_options, record_set)))
            }
            Err(_) => {
                debug!(name = %qname, addr = %addr, "PTR lookup: no binding");
                metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NXDomain)))
            }
        }
    }

    async fn search(
        &self,
        request_info: RequestInfo<'_>,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        self.lookup(
            request_info.query.name(),
            request_info.query.query_type(),
            lookup_options,
        )
        .await
    }

    async fn get_nsec_records(
        &self,
        _name: &LowerName,
        _lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
    }

    async fn update(&self, _update: &MessageRequest) -> UpdateResult<bool> {
        Err(ResponseCode::NotImp)
    }
}
