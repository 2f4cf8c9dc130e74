//! Route parameter extraction and query string parsing
//!
//! This module provides types for working with parameters extracted from route
//! patterns (like `:id`) and query strings (like `?page=1&sort=name`).

use std::collections::{BTreeMap, HashMap};

/// Route parameters extracted from path segments
///
/// # Example
///
/// ```
/// use pagekit::RouteParams;
///
/// // Route pattern: /items/:id
/// // Matched path: /items/123
/// let mut params = RouteParams::new();
/// params.insert("id".to_string(), "123".to_string());
///
/// assert_eq!(params.get("id"), Some(&"123".to_string()));
/// assert_eq!(params.get_as::<i32>("id"), Some(123));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// Create new empty route params
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from hashmap
    pub fn from_map(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Get a parameter value as a string
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Get a parameter and parse it as a specific type
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    /// Insert a parameter
    pub fn insert(&mut self, key: String, value: String) {
        self.params.insert(key, value);
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Get all parameters as a reference to the HashMap
    pub fn all(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Iterate over all parameters
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters parsed from a location's query string
///
/// Keys are single-valued (the last occurrence wins) and kept sorted, so that
/// serializing the same logical query always yields the same string. That
/// canonical form is what makes repeated navigations to the same
/// path-plus-query idempotent.
///
/// # Example
///
/// ```
/// use pagekit::QueryParams;
///
/// let query = QueryParams::from_query_string("page=1&sort=name");
///
/// assert_eq!(query.get("page"), Some(&"1".to_string()));
/// assert_eq!(query.get_as::<i32>("page"), Some(1));
/// assert_eq!(query.to_query_string(), "page=1&sort=name");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, String>,
}

impl QueryParams {
    /// Create new empty query params
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a query string
    ///
    /// Keys and values are percent-decoded. A repeated key keeps its last
    /// value. Pairs without `=` are treated as empty-valued and dropped.
    pub fn from_query_string(query: &str) -> Self {
        let mut params = BTreeMap::new();

        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                let key = decode_uri_component(key);
                let value = decode_uri_component(value);
                if !key.is_empty() && !value.is_empty() {
                    params.insert(key, value);
                }
            }
        }

        Self { params }
    }

    /// Get the value for a parameter
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Get parameter parsed as a specific type
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Insert a parameter, replacing any previous value
    ///
    /// An empty value removes the key instead: absent and empty are the same
    /// thing in a query string, and keeping them merged is what lets
    /// `update_query` prune cleared filters.
    pub fn insert(&mut self, key: String, value: String) {
        if value.is_empty() {
            self.params.remove(&key);
        } else {
            self.params.insert(key, value);
        }
    }

    /// Remove a parameter
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.params.remove(key)
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Merge another set of parameters into this one
    ///
    /// Incoming empty values delete the key, everything else replaces it.
    pub fn merge(&mut self, other: &QueryParams) {
        for (key, value) in &other.params {
            self.insert(key.clone(), value.clone());
        }
    }

    /// Serialize to the canonical query string
    ///
    /// Keys appear in sorted order with percent-encoded keys and values.
    /// Returns an empty string when there are no parameters.
    pub fn to_query_string(&self) -> String {
        let pairs: Vec<String> = self
            .params
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    encode_uri_component(key),
                    encode_uri_component(value)
                )
            })
            .collect();

        pairs.join("&")
    }

    /// Iterate over all parameters in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of parameter keys
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.insert(key, value);
        }
        query
    }
}

/// Percent-encode a URI component
pub(crate) fn encode_uri_component(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => result.push_str(&format!("%{:02X}", byte)),
        }
    }
    result
}

/// Percent-decode a URI component
///
/// Malformed escapes are kept verbatim rather than rejected; `+` decodes to a
/// space for form-encoded compatibility.
pub(crate) fn decode_uri_component(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes();

    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hex: String = iter.by_ref().take(2).map(|b| b as char).collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) if hex.len() == 2 => bytes.push(byte),
                    _ => {
                        bytes.push(b'%');
                        bytes.extend(hex.bytes());
                    }
                }
            }
            b'+' => bytes.push(b' '),
            _ => bytes.push(b),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

// ============================================================================
// Tests
// ============================================================================
