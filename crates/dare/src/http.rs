//! HTTP transport for the DARE service
//!
//! Creation and execution are asynchronous on the server: a POST answers with a
//! `Location` header, and a GET on that location returns 204 until the
//! resource is ready. The transport hides this by polling.

use dare_core::Config;
use std::fmt;
use std::thread;
use std::time::Duration;
use url::form_urlencoded;

use crate::error::{DareError, Result};

/// Status the server uses for "still working"
pub const NO_CONTENT: u16 = 204;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const XML_CONTENT_TYPE: &str = "application/xml";
const JSON_CONTENT_TYPE: &str = "application/json";

fn is_successful(status: u16) -> bool {
    (200..300).contains(&status)
}

/// HTTP verbs used against the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// A request as handed to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the first header with the given name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The parts of a response the client cares about
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

/// Something that can execute a single HTTP request
pub trait HttpBackend {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Backend using a blocking reqwest client
pub struct ReqwestBackend {
    client: reqwest::blocking::Client,
}

impl ReqwestBackend {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!("dare/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl HttpBackend for ReqwestBackend {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text()?;

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

/// Form parameters, where each key may carry several values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormParams {
    params: Vec<(String, Vec<String>)>,
}

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to a single value
    pub fn with(self, key: &str, value: impl Into<String>) -> Self {
        self.with_all(key, [value.into()])
    }

    /// Bind `key` to every value in `values`, one pair each
    pub fn with_all<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => existing.extend(values),
            None => self.params.push((key.to_string(), values)),
        }
        self
    }

    /// Flattened key/value pairs in insertion order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// `application/x-www-form-urlencoded` body
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.pairs() {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

/// Body of a POST to the service
#[derive(Debug, Clone, PartialEq)]
pub enum PostBody {
    Form(FormParams),
    Xml(String),
}

/// Issues requests against the service and waits for asynchronous results
pub struct Transport {
    backend: Box<dyn HttpBackend>,
    poll_interval: Duration,
    max_polls: Option<u32>,
    sleeper: Box<dyn Fn(Duration)>,
}

impl Transport {
    pub fn new(backend: impl HttpBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            poll_interval: Duration::from_secs(2),
            max_polls: None,
            sleeper: Box::new(thread::sleep),
        }
    }

    /// Transport over reqwest, tuned by the user's configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = ReqwestBackend::new(config.request_timeout())?;
        Ok(Self::new(backend)
            .with_poll_interval(config.poll_interval())
            .with_max_polls(config.max_polls))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Replace how the transport waits between polls
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = %request.method, url = %request.url, "request");
        let response = self.backend.send(&request)?;
        tracing::debug!(status = response.status, url = %request.url, "response");
        Ok(response)
    }

    /// POST a body; fails unless the status is in [200,300)
    pub fn post(&self, url: &str, body: &PostBody) -> Result<HttpResponse> {
        let request = match body {
            PostBody::Form(params) => HttpRequest::new(Method::Post, url)
                .header("Content-Type", FORM_CONTENT_TYPE)
                .body(params.encode()),
            PostBody::Xml(xml) => HttpRequest::new(Method::Post, url)
                .header("Content-Type", XML_CONTENT_TYPE)
                .body(xml.clone()),
        };

        let response = self.send(request)?;
        if !is_successful(response.status) {
            return Err(DareError::RemoteRequestFailed {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    pub fn post_form(&self, url: &str, params: &FormParams) -> Result<HttpResponse> {
        self.post(url, &PostBody::Form(params.clone()))
    }

    pub fn post_xml(&self, url: &str, xml: &str) -> Result<HttpResponse> {
        self.post(url, &PostBody::Xml(xml.to_string()))
    }

    /// POST and return the `Location` of the resource the server created
    pub fn post_for_location(&self, url: &str, body: &PostBody) -> Result<String> {
        self.post(url, body)?
            .location
            .ok_or_else(|| DareError::MissingLocation {
                url: url.to_string(),
            })
    }

    /// GET `url`, polling while the server answers 204.
    ///
    /// Returns `None` when the final status is outside [200,300).
    pub fn get(&self, url: &str, accept: &str) -> Result<Option<HttpResponse>> {
        let request = HttpRequest::new(Method::Get, url).header("Accept", accept);

        let mut attempts: u32 = 1;
        let mut response = self.send(request.clone())?;
        while response.status == NO_CONTENT {
            if let Some(max) = self.max_polls {
                if attempts >= max {
                    return Err(DareError::PollLimitExceeded {
                        url: url.to_string(),
                        attempts,
                    });
                }
            }
            tracing::debug!(url, attempt = attempts, "not ready yet, polling again");
            (self.sleeper)(self.poll_interval);
            response = self.send(request.clone())?;
            attempts += 1;
        }

        if !is_successful(response.status) {
            tracing::warn!(url, status = response.status, "resource unavailable");
            return Ok(None);
        }
        Ok(Some(response))
    }

    /// GET `url` as JSON, polling while it isn't ready
    pub fn get_json(&self, url: &str) -> Result<Option<serde_json::Value>> {
        match self.get(url, JSON_CONTENT_TYPE)? {
            Some(response) => Ok(Some(serde_json::from_str(&response.body)?)),
            None => Ok(None),
        }
    }

    /// DELETE `url`; the response is not inspected
    pub fn delete(&self, url: &str) -> Result<()> {
        self.send(HttpRequest::new(Method::Delete, url))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Backend replaying canned responses and recording every request
    #[derive(Clone, Default)]
    pub struct ScriptedBackend {
        responses: Rc<RefCell<VecDeque<HttpResponse>>>,
        requests: Rc<RefCell<Vec<HttpRequest>>>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, status: u16, body: &str) -> &Self {
            self.responses.borrow_mut().push_back(HttpResponse {
                status,
                location: None,
                body: body.to_string(),
            });
            self
        }

        pub fn respond_created(&self, location: &str) -> &Self {
            self.responses.borrow_mut().push_back(HttpResponse {
                status: 201,
                location: Some(location.to_string()),
                body: String::new(),
            });
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.borrow().clone()
        }
    }

    impl HttpBackend for ScriptedBackend {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(request.clone());
            let response = self.responses.borrow_mut().pop_front();
            Ok(response.unwrap_or_else(|| {
                panic!("no scripted response for {} {}", request.method, request.url)
            }))
        }
    }

    /// Transport over `backend` that records its sleeps instead of sleeping
    pub fn transport(backend: &ScriptedBackend) -> (Transport, Rc<RefCell<Vec<Duration>>>) {
        let sleeps = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&sleeps);
        let transport = Transport::new(backend.clone())
            .with_sleeper(move |d| recorded.borrow_mut().push(d));
        (transport, sleeps)
    }
}
