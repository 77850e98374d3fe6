//! The application: per-request dispatch and the accept loop.
//!
//! A request flows `method recognized? -> route matched? -> handler
//! chain`, falling back to static assets and the SPA shell for GET/HEAD
//! misses. Errors and panics anywhere in handler code are caught at this
//! single boundary, logged, and converted to responses that never leak
//! internal detail; the accept loop itself never dies from handler
//! failures.

use crate::assets::AssetResolver;
use crate::error::ServerError;
use crate::handler::HttpResponse;
use crate::http::{Body, Method, Request, Response};
use crate::router::RouteTable;
use crate::state::AppState;
use futures::FutureExt;
use std::collections::HashMap;
use std::io::Error;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use rustls::ServerConfig as RustlsConfig;
use tokio_rustls::TlsAcceptor;
use std::fs::File;
use std::io::BufReader as StdBufReader;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

type ErrorHandler = Arc<dyn Fn(&ServerError) -> Response + Send + Sync>;

/// TLS configuration for HTTPS support.
pub struct TlsConfig {
    cert_file: PathBuf,
    key_file: PathBuf,
}

impl TlsConfig {
    pub fn new<P: AsRef<Path>>(cert_file: P, key_file: P) -> Self {
        Self {
            cert_file: cert_file.as_ref().to_path_buf(),
            key_file: key_file.as_ref().to_path_buf(),
        }
    }

    fn load_certs(&self) -> Result<Vec<CertificateDer<'static>>, Box<dyn std::error::Error>> {
        let cert_file = File::open(&self.cert_file)?;
        let mut reader = StdBufReader::new(cert_file);
        let certs = rustls_pemfile::certs(&mut reader)
            .filter_map(|result| result.ok())
            .collect();
        Ok(certs)
    }

    fn load_key(&self) -> Result<PrivateKeyDer<'static>, Box<dyn std::error::Error>> {
        let key_file = File::open(&self.key_file)?;
        let mut reader = StdBufReader::new(key_file);
        let key = rustls_pemfile::private_key(&mut reader)?
            .ok_or("No private key found")?;
        Ok(key)
    }
}

/// The server: an immutable route table, the asset resolver, and shared
/// state, driven by a per-connection dispatch loop.
///
/// The route table is built before the application exists and handed in
/// by value; there is no runtime registration.
#[derive(Clone)]
pub struct Application {
    pub max_connections: usize,
    table: Arc<RouteTable>,
    assets: Option<Arc<AssetResolver>>,
    state: AppState,
    on_error: Option<ErrorHandler>,
    tls_config: Option<Arc<TlsConfig>>,
}

impl Application {
    pub fn new(table: RouteTable) -> Self {
        Self {
            max_connections: 256,
            table: Arc::new(table),
            assets: None,
            state: AppState::new(),
            on_error: None,
            tls_config: None,
        }
    }

    pub fn max_connections(&mut self, max_connections: usize) -> &mut Self {
        self.max_connections = max_connections;
        self
    }

    /// Serves built assets from `dir`, with `shell` (relative to `dir`)
    /// as the SPA fallback document for unmatched GET/HEAD paths.
    pub fn assets(&mut self, dir: &str, shell: &str) -> &mut Self {
        self.assets = Some(Arc::new(AssetResolver::new(dir, shell)));
        self
    }

    /// Registers an application-wide value, retrievable by type from any
    /// request via `req.state.get::<T>()`.
    pub fn state<T>(&mut self, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.state.insert(value);
        self
    }

    /// Overrides the default error-to-response conversion.
    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&ServerError) -> Response + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Configures TLS termination.
    pub fn with_tls<P: AsRef<Path>>(&mut self, cert_file: P, key_file: P) -> &mut Self {
        self.tls_config = Some(Arc::new(TlsConfig::new(cert_file, key_file)));
        self
    }

    /// Starts accepting connections. Blocks the calling thread.
    pub fn listen(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let runtime = Runtime::new()?;
        runtime.block_on(async {
            let listener = TcpListener::bind(addr).await?;
            let connection_counter = Arc::new(AtomicUsize::new(0));

            let scheme = if self.tls_config.is_some() { "https" } else { "http" };
            tracing::info!(%addr, scheme, "server listening");

            let tls_acceptor = if let Some(tls_config) = &self.tls_config {
                let certs = tls_config.load_certs()?;
                let key = tls_config.load_key()?;
                let config = RustlsConfig::builder()
                    .with_no_client_auth()
                    .with_single_cert(certs, key)?;
                Some(TlsAcceptor::from(Arc::new(config)))
            } else {
                None
            };

            loop {
                let counter = Arc::clone(&connection_counter);
                if counter.load(Ordering::Relaxed) >= self.max_connections {
                    tracing::warn!("max connections reached");
                    // Back off instead of spinning until a slot frees.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }

                match listener.accept().await {
                    Ok((stream, _)) => {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let app = self.clone();
                        let counter = Arc::clone(&counter);
                        let acceptor = tls_acceptor.clone();

                        tokio::spawn(async move {
                            let result = if let Some(acceptor) = acceptor {
                                match acceptor.accept(stream).await {
                                    Ok(tls_stream) => app.handle_connection(tls_stream).await,
                                    Err(e) => {
                                        tracing::warn!(error = %e, "TLS handshake failed");
                                        Ok(())
                                    }
                                }
                            } else {
                                app.handle_connection(stream).await
                            };

                            if let Err(e) = result {
                                tracing::warn!(error = %e, "connection error");
                            }
                            counter.fetch_sub(1, Ordering::Relaxed);
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                }
            }
        })
    }

    async fn handle_connection<S>(&self, mut stream: S) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf_reader = BufReader::new(&mut stream);
        let mut request_line = String::new();
        buf_reader.read_line(&mut request_line).await?;

        if request_line.is_empty() {
            return Ok(());
        }

        let mut parts = request_line.trim().split_whitespace();
        let (method_token, full_path) = match (parts.next(), parts.next()) {
            (Some(method), Some(path)) => (method.to_string(), path),
            _ => {
                let err = ServerError::BadRequest("Malformed request line".to_string());
                return Self::write_response(&mut stream, &Response::error(&err)).await;
            }
        };

        let mut path_parts = full_path.split('?');
        let path = path_parts.next().unwrap_or("/").to_string();
        let path = path.trim_end_matches('/').to_string();
        let path = if path.is_empty() { "/".to_string() } else { path };
        let query = path_parts
            .next()
            .map(Self::parse_query)
            .unwrap_or_default();

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            buf_reader.read_line(&mut line).await?;

            if line.trim().is_empty() {
                break;
            }

            if let Some((key, value)) = line.trim().split_once(':') {
                headers.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }

        // Unrecognized methods never reach the table or the fallback.
        let Some(method) = Method::parse(&method_token) else {
            return Self::write_response(&mut stream, &Response::error(&ServerError::NotFound))
                .await;
        };

        let mut body = Vec::new();
        let content_type = headers
            .get("content-type")
            .cloned()
            .unwrap_or_else(|| "none".to_owned());
        if let Some(content_length) = headers.get("content-length") {
            if let Ok(length) = content_length.parse::<usize>() {
                body.reserve(length);
                let mut take = buf_reader.take(length as u64);
                take.read_to_end(&mut body).await?;
            }
        }

        let request = Request {
            method,
            path,
            query,
            headers,
            body: Body::from_bytes(&content_type, body),
            params: HashMap::new(),
            data: HashMap::new(),
            state: self.state.clone(),
        };

        let response = self.dispatch(request).await;
        Self::write_response(&mut stream, &response).await
    }

    /// Runs one request through match, chain, and fallback, converting
    /// every failure mode into a response. This is the error boundary.
    pub async fn dispatch(&self, req: Request) -> Response {
        let method = req.method;
        let outcome = AssertUnwindSafe(self.route(req)).catch_unwind().await;
        let outcome = outcome.unwrap_or_else(|err| {
            let panic_msg = if let Some(msg) = err.downcast_ref::<&str>() {
                msg.to_string()
            } else if let Some(msg) = err.downcast_ref::<String>() {
                msg.clone()
            } else {
                "Unknown panic".to_string()
            };
            Err(ServerError::PanicError(panic_msg))
        });

        let mut response = match outcome {
            Ok(response) => response,
            Err(err) => {
                if err.is_internal() {
                    tracing::error!(error = %err, "request failed");
                }
                self.handle_error(&err)
            }
        };
        if method == Method::HEAD {
            response.body.clear();
        }
        response
    }

    async fn route(&self, mut req: Request) -> HttpResponse {
        let path = req.path.clone();
        let method = req.method;

        if let Some(matched) = self.table.match_route(method, &path) {
            req.params = matched.params;
            return matched.entry.chain.run(req).await;
        }
        // HEAD is served by the GET route with the body stripped after
        // the boundary.
        if method == Method::HEAD {
            if let Some(matched) = self.table.match_route(Method::GET, &path) {
                req.params = matched.params;
                return matched.entry.chain.run(req).await;
            }
        }

        if let Some(assets) = &self.assets {
            if let Some(response) = assets.resolve(method, &path) {
                return Ok(response);
            }
        }
        Err(ServerError::NotFound)
    }

    fn handle_error(&self, error: &ServerError) -> Response {
        if let Some(handler) = &self.on_error {
            handler(error)
        } else {
            Response::error(error)
        }
    }

    async fn write_response<S>(stream: &mut S, response: &Response) -> Result<(), Error>
    where
        S: AsyncWrite + Unpin,
    {
        let mut head = format!("HTTP/1.1 {}\r\n", response.status);
        response.headers.iter().for_each(|(name, value)| {
            head += &format!("{}: {}\r\n", name, value);
        });
        head += &format!("Content-Length: {}\r\n\r\n", response.body.len());
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(&response.body).await?;
        Ok(())
    }

    fn parse_query(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|s| !s.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Some((
                    urlencoding::decode(key).ok()?.into_owned(),
                    urlencoding::decode(value).ok()?.into_owned(),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_request_line_gets_a_400() {
        let app = Application::new(RouteTable::new());
        let (mut client, server) = tokio::io::duplex(1024);

        client.write_all(b"GARBAGE\r\n\r\n").await.unwrap();
        app.handle_connection(server).await.unwrap();

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert!(out.starts_with("HTTP/1.1 400"), "got: {out}");
    }

    #[tokio::test]
    async fn unrecognized_method_gets_a_404() {
        let app = Application::new(RouteTable::new());
        let (mut client, server) = tokio::io::duplex(1024);

        client.write_all(b"BREW /coffee HTTP/1.1\r\n\r\n").await.unwrap();
        app.handle_connection(server).await.unwrap();

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert!(out.starts_with("HTTP/1.1 404"), "got: {out}");
    }
}
