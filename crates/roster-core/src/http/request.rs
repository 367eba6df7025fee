//! Request options and response bodies

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Method, headers and body for one call
///
/// The pipeline never mutates these; it works on a copy that carries the
/// Authorization header. Header names are kept exactly as supplied.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HashMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Add or replace a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach an opaque body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a JSON body, adding `Content-Type: application/json` unless a
    /// content type was already set
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> crate::Result<Self> {
        self.body = Some(serde_json::to_vec(value)?);
        let has_content_type = self
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            self.headers
                .insert("Content-Type".to_string(), "application/json".to_string());
        }
        Ok(self)
    }
}

/// A response body, parsed according to its content type
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// `application/json` responses
    Json(Value),
    /// Everything else
    Text(String),
}

impl ResponseBody {
    /// Text form used for the debug snippet
    pub fn to_snippet_source(&self) -> String {
        match self {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
        }
    }

    /// Convert into a JSON value; text becomes a JSON string
    pub fn into_value(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }

    /// Deserialize into a caller-declared type; text decodes as a JSON string
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            ResponseBody::Json(value) => T::deserialize(value),
            ResponseBody::Text(text) => T::deserialize(Value::String(text.clone())),
        }
    }
}

/// A successful response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}
