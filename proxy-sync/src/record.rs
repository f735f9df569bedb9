//! Proxy host records and the field-role table
//!
//! Records are carried as opaque JSON objects. The only keys the sync
//! interprets are `id` (to address a record on its own server) and
//! `domain_names` (the natural key used to pair records across servers).
//! Which keys are copied, compared, or ignored is decided by [`FieldTable`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Keys copied into the create payload, in payload order
pub const COPIED_ON_CREATE: &[&str] = &[
    "domain_names",
    "forward_host",
    "forward_port",
    "forward_scheme",
    "caching_enabled",
    "ssl_forced",
    "allow_websocket_upgrade",
    "block_exploits",
    "certificate_id",
    "advanced_config",
    "access_list_id",
    "http2_support",
    "enabled",
    "locations",
    "hsts_enabled",
    "hsts_subdomains",
];

/// Server-assigned keys that never take part in the comparison
pub const EXCLUDED_FROM_COMPARISON: &[&str] = &["id", "meta", "created_on", "modified_on"];

/// Server-side identifier of a record, rendered as it appears in API paths
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostId(String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One proxy host as returned by the management API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyHost(Map<String, Value>);

impl ProxyHost {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Record id, if it is a number or a non-empty string
    pub fn id(&self) -> Option<HostId> {
        match self.0.get("id")? {
            Value::Number(n) => Some(HostId(n.to_string())),
            Value::String(s) if !s.is_empty() => Some(HostId(s.clone())),
            _ => None,
        }
    }

    /// Ordered domain list; a missing or malformed key is treated as empty
    pub fn domain_names(&self) -> &[Value] {
        self.0
            .get("domain_names")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pairing key: a non-empty `domain_names` array, or `None`
    pub fn domain_key(&self) -> Option<&[Value]> {
        match self.0.get("domain_names") {
            Some(Value::Array(domains)) if !domains.is_empty() => Some(domains.as_slice()),
            _ => None,
        }
    }

    /// Exact, order-sensitive match on `domain_names`.
    ///
    /// Records without a pairing key never match anything.
    pub fn same_domains(&self, other: &ProxyHost) -> bool {
        match (self.domain_key(), other.domain_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Comma-joined domains for log lines
    pub fn label(&self) -> String {
        self.domain_names()
            .iter()
            .map(|d| match d {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `scheme://host:port` of the backend this host forwards to
    pub fn forward_target(&self) -> String {
        let part = |key: &str| match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        format!(
            "{}://{}:{}",
            part("forward_scheme"),
            part("forward_host"),
            part("forward_port")
        )
    }
}

impl From<Value> for ProxyHost {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }
}

/// How a record key is treated by the sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Compared, and copied into the create payload
    CopiedOnCreate,
    /// Neither compared nor copied
    Excluded,
    /// Compared only
    Compared,
}

/// Field-role table driving comparison and create payloads
#[derive(Debug, Clone)]
pub struct FieldTable {
    copied: Vec<String>,
    excluded: Vec<String>,
}

impl Default for FieldTable {
    fn default() -> Self {
        Self {
            copied: COPIED_ON_CREATE.iter().map(|s| s.to_string()).collect(),
            excluded: EXCLUDED_FROM_COMPARISON.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FieldTable {
    /// Default table with extra keys excluded from comparison.
    ///
    /// Copied keys cannot be excluded; such entries are dropped.
    pub fn with_ignored<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for key in extra {
            let key = key.into();
            if table.copied.contains(&key) {
                tracing::warn!("Ignoring '{}' in ignore_fields: it is copied on create", key);
                continue;
            }
            if !table.excluded.contains(&key) {
                table.excluded.push(key);
            }
        }
        table
    }

    pub fn role(&self, key: &str) -> FieldRole {
        if self.copied.iter().any(|k| k == key) {
            FieldRole::CopiedOnCreate
        } else if self.excluded.iter().any(|k| k == key) {
            FieldRole::Excluded
        } else {
            FieldRole::Compared
        }
    }

    /// First non-excluded key of `source` whose value differs on `destination`.
    ///
    /// Keys are visited in the source record's key order. A key missing from
    /// the destination is a difference; keys only the destination has are not.
    pub fn first_difference<'a>(
        &self,
        source: &'a ProxyHost,
        destination: &ProxyHost,
    ) -> Option<&'a str> {
        source
            .fields()
            .iter()
            .filter(|(key, _)| self.role(key) != FieldRole::Excluded)
            .find(|(key, value)| destination.get(key) != Some(*value))
            .map(|(key, _)| key.as_str())
    }

    /// Create request body: exactly the copied keys present on `source`
    pub fn create_payload(&self, source: &ProxyHost) -> Map<String, Value> {
        self.copied
            .iter()
            .filter_map(|key| source.get(key).map(|v| (key.clone(), v.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn host(value: Value) -> ProxyHost {
        ProxyHost::from(value)
    }

    fn full_host(id: i64, port: i64) -> ProxyHost {
        host(json!({
            "id": id,
            "created_on": "2024-01-01 00:00:00",
            "modified_on": "2024-01-02 00:00:00",
            "owner_user_id": 1,
            "domain_names": ["x.com", "www.x.com"],
            "forward_host": "10.0.0.5",
            "forward_port": port,
            "forward_scheme": "http",
            "caching_enabled": false,
            "ssl_forced": true,
            "allow_websocket_upgrade": true,
            "block_exploits": true,
            "certificate_id": 3,
            "advanced_config": "",
            "access_list_id": 0,
            "http2_support": true,
            "enabled": true,
            "locations": [],
            "hsts_enabled": false,
            "hsts_subdomains": false,
            "meta": {"letsencrypt_agree": true}
        }))
    }

    #[test]
    fn test_id_rendering() {
        assert_eq!(host(json!({"id": 42})).id(), Some(HostId::new("42")));
        assert_eq!(host(json!({"id": "abc"})).id(), Some(HostId::new("abc")));
        assert_eq!(host(json!({"id": null})).id(), None);
        assert_eq!(host(json!({})).id(), None);
    }

    #[test]
    fn test_domain_match_is_order_sensitive() {
        let a = host(json!({"domain_names": ["a.com", "b.com"]}));
        let b = host(json!({"domain_names": ["b.com", "a.com"]}));
        let c = host(json!({"domain_names": ["a.com", "b.com"]}));
        assert!(!a.same_domains(&b));
        assert!(a.same_domains(&c));
        assert_eq!(a.label(), "a.com,b.com");
    }

    #[test]
    fn test_records_without_domains_never_pair() {
        let missing = host(json!({"id": 1}));
        let empty = host(json!({"id": 2, "domain_names": []}));
        let malformed = host(json!({"id": 3, "domain_names": "x.com"}));

        assert_eq!(missing.domain_key(), None);
        assert_eq!(empty.domain_key(), None);
        assert_eq!(malformed.domain_key(), None);
        assert!(!missing.same_domains(&empty));
        assert!(!empty.same_domains(&empty.clone()));
        assert!(!malformed.same_domains(&malformed.clone()));
        assert!(host(json!({"domain_names": ["a.com"]})).domain_key().is_some());
    }

    #[test]
    fn test_roles() {
        let table = FieldTable::default();
        assert_eq!(table.role("forward_port"), FieldRole::CopiedOnCreate);
        assert_eq!(table.role("modified_on"), FieldRole::Excluded);
        assert_eq!(table.role("owner_user_id"), FieldRole::Compared);

        let table = FieldTable::with_ignored(["owner_user_id", "forward_host"]);
        assert_eq!(table.role("owner_user_id"), FieldRole::Excluded);
        assert_eq!(table.role("forward_host"), FieldRole::CopiedOnCreate);
    }

    #[test]
    fn test_excluded_keys_do_not_count() {
        let source = full_host(1, 8080);
        let mut dest = full_host(77, 8080);
        if let Some(Value::Object(meta)) = dest.0.get_mut("meta") {
            meta.insert("nginx_online".into(), json!(true));
        }
        dest.0.insert("created_on".into(), json!("2020-05-05 00:00:00"));

        assert_eq!(FieldTable::default().first_difference(&source, &dest), None);
    }

    #[test]
    fn test_first_difference_reports_key() {
        let source = full_host(1, 8080);
        let dest = full_host(2, 80);
        assert_eq!(
            FieldTable::default().first_difference(&source, &dest),
            Some("forward_port")
        );
    }

    #[test]
    fn test_missing_destination_key_is_difference() {
        let source = full_host(1, 8080);
        let mut dest = full_host(2, 8080);
        dest.0.remove("hsts_subdomains");
        assert_eq!(
            FieldTable::default().first_difference(&source, &dest),
            Some("hsts_subdomains")
        );
    }

    #[test]
    fn test_create_payload_projection() {
        let payload = FieldTable::default().create_payload(&full_host(9, 8080));
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();

        assert_eq!(payload.len(), COPIED_ON_CREATE.len());
        for key in COPIED_ON_CREATE {
            assert!(keys.contains(key), "payload missing {}", key);
        }
        assert!(!payload.contains_key("id"));
        assert!(!payload.contains_key("meta"));
        assert!(!payload.contains_key("owner_user_id"));
        assert_eq!(payload["forward_port"], json!(8080));
    }

    #[test]
    fn test_forward_target() {
        assert_eq!(full_host(1, 8080).forward_target(), "http://10.0.0.5:8080");
    }
}
