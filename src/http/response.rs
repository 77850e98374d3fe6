use crate::error::ServerError;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl Response {
    pub fn new(status: u16) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn body<T: AsRef<[u8]>>(&mut self, body: T) -> &mut Self {
        self.body = body.as_ref().to_vec();
        self
    }

    pub fn header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        self.headers
            .insert(name.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    pub fn headers(&mut self, headers: HashMap<String, String>) -> &mut Self {
        self.headers.extend(headers);
        self
    }

    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, ServerError> {
        let json = serde_json::to_vec(value)
            .map_err(|e| ServerError::InternalError(format!("JSON serialization error: {}", e)))?;
        self.header("Content-Type", "application/json");
        self.body = json;
        Ok(self)
    }

    pub fn ok<T: Serialize>(data: &T) -> Result<Response, ServerError> {
        let mut response = Response::new(200);
        response.json(data)?;
        Ok(response)
    }

    pub fn created<T: Serialize>(data: &T) -> Result<Response, ServerError> {
        let mut response = Response::new(201);
        response.json(data)?;
        Ok(response)
    }

    pub fn no_content() -> Response {
        Response::new(204)
    }

    pub fn text<T: AsRef<str>>(content: T) -> Response {
        let mut response = Response::new(200);
        response
            .header("Content-Type", "text/plain")
            .body(content.as_ref());
        response
    }

    pub fn html<T: AsRef<[u8]>>(content: T) -> Response {
        let mut response = Response::new(200);
        response.header("Content-Type", "text/html").body(content);
        response
    }

    pub fn redirect(location: &str) -> Response {
        let mut response = Response::new(302);
        response.header("Location", location);
        response
    }

    /// Converts an error into its boundary response. Internal errors get
    /// a fixed generic body; the detail is for the log only.
    pub fn error(err: &ServerError) -> Response {
        let status = err.status_code();
        let message = if err.is_internal() {
            "Internal server error".to_string()
        } else {
            err.to_string()
        };
        let mut response = Response::new(status);
        let body = serde_json::json!({
            "error": { "message": message.clone(), "status": status }
        });
        if response.json(&body).is_err() {
            // Serializing a literal cannot realistically fail; degrade to plain text.
            response.header("Content-Type", "text/plain").body(message);
        }
        response
    }
}

#[macro_export]
macro_rules! ok_json {
    ($($json:tt)+) => {{
        let mut response = $crate::http::Response::new(200);
        response.json(&$crate::json!($($json)+))?;
        Ok(response)
    }};
}

#[macro_export]
macro_rules! created_json {
    ($($json:tt)+) => {{
        let mut response = $crate::http::Response::new(201);
        response.json(&$crate::json!($($json)+))?;
        Ok(response)
    }};
}
