//! Exact-match request router.
//!
//! A route table is assembled once at startup through the builder and is
//! immutable afterwards: each (method, path) pair maps to a statically typed
//! handler function and a named access policy. Dispatch runs the request
//! through parse → resolve → authorize → handler → serialize, short-circuits
//! OPTIONS with a bare 200 before resolution, and stamps CORS headers on
//! every response, preflight and errors included.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;

use crate::auth::policy::Policy;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::http::request::{ApiRequest, Params};
use crate::http::response::Reply;

/// Per-request slice of state a handler receives alongside the context.
#[derive(Debug)]
pub struct RequestContext {
    pub params: Params,
    pub bearer: Option<String>,
}

pub type HandlerFuture = BoxFuture<'static, Result<Reply, ApiError>>;
pub type Handler = fn(Arc<AppContext>, RequestContext) -> HandlerFuture;

#[derive(Clone, Copy)]
struct Route {
    policy: Policy,
    handler: Handler,
}

pub struct RouteTable {
    routes: HashMap<(Method, String), Route>,
}

pub struct RouteTableBuilder {
    routes: HashMap<(Method, String), Route>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder {
            routes: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run one request to completion and serialize the outcome.
    pub async fn dispatch(&self, ctx: Arc<AppContext>, request: ApiRequest) -> Response {
        // CORS preflight never reaches route resolution.
        if request.method == Method::OPTIONS {
            return with_cors(StatusCode::OK.into_response());
        }

        let response = match self.handle(ctx, request).await {
            Ok(reply) => reply.into_response(),
            Err(err) => err.into_response(),
        };
        with_cors(response)
    }

    async fn handle(&self, ctx: Arc<AppContext>, request: ApiRequest) -> Result<Reply, ApiError> {
        let key = (request.method.clone(), request.path.clone());
        let route = self
            .routes
            .get(&key)
            .ok_or_else(|| ApiError::not_found("Route not found"))?;

        route
            .policy
            .authorize(&ctx, request.bearer.as_deref())
            .await?;

        let req_ctx = RequestContext {
            params: request.params,
            bearer: request.bearer,
        };
        (route.handler)(ctx, req_ctx).await
    }
}

impl RouteTableBuilder {
    fn add(mut self, method: Method, path: &str, policy: Policy, handler: Handler) -> Self {
        let key = (method, path.to_string());
        if self.routes.contains_key(&key) {
            panic!("duplicate route: {} {}", key.0, key.1);
        }
        self.routes.insert(key, Route { policy, handler });
        self
    }

    pub fn get(self, path: &str, policy: Policy, handler: Handler) -> Self {
        self.add(Method::GET, path, policy, handler)
    }

    pub fn post(self, path: &str, policy: Policy, handler: Handler) -> Self {
        self.add(Method::POST, path, policy, handler)
    }

    pub fn put(self, path: &str, policy: Policy, handler: Handler) -> Self {
        self.add(Method::PUT, path, policy, handler)
    }

    pub fn delete(self, path: &str, policy: Policy, handler: Handler) -> Self {
        self.add(Method::DELETE, path, policy, handler)
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            routes: self.routes,
        }
    }
}

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Stamp the CORS and Allow headers every response carries.
fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(
            "Content-Type, Access-Control-Allow-Headers, Authorization, X-Requested-With",
        ),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::store::Store;
    use axum::http::{HeaderMap, Uri};
    use serde_json::{json, Value};

    fn ping(_ctx: Arc<AppContext>, _req: RequestContext) -> HandlerFuture {
        Box::pin(async { Ok(Reply::ok(json!("pong"))) })
    }

    fn echo_params(_ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
        Box::pin(async move { Ok(Reply::created(Value::Object(req.params))) })
    }

    fn lazy_context() -> Arc<AppContext> {
        let config = AppConfig::from_env();
        let store = Store::connect_lazy(&config.database).expect("lazy pool");
        Arc::new(AppContext::new(config, store))
    }

    fn table() -> RouteTable {
        RouteTable::builder()
            .get("/ping", Policy::Guest, ping)
            .post("/echo", Policy::Guest, echo_params)
            .get("/secret", Policy::Auth, ping)
            .build()
    }

    fn request(method: Method, target: &str, body: &[u8]) -> ApiRequest {
        let uri: Uri = target.parse().unwrap();
        ApiRequest::from_parts(method, &uri, &HeaderMap::new(), body)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_is_a_404_with_a_message() {
        let response = table()
            .dispatch(lazy_context(), request(Method::GET, "/unknown/path", b""))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body, json!({"message": "Route not found", "code": 404}));
    }

    #[tokio::test]
    async fn method_must_match_as_well_as_path() {
        let response = table()
            .dispatch(lazy_context(), request(Method::POST, "/ping", b""))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn options_short_circuits_with_a_bare_200() {
        let response = table()
            .dispatch(lazy_context(), request(Method::OPTIONS, "/anything/at/all", b""))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn every_response_carries_cors_headers() {
        let response = table()
            .dispatch(lazy_context(), request(Method::GET, "/nope", b""))
            .await;
        for name in [
            header::ALLOW,
            header::ACCESS_CONTROL_ALLOW_METHODS,
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        ] {
            assert!(response.headers().contains_key(&name), "missing {}", name);
        }
    }

    #[tokio::test]
    async fn guest_route_returns_the_handler_value_verbatim() {
        let response = table()
            .dispatch(lazy_context(), request(Method::GET, "/ping", b""))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!("pong"));
    }

    #[tokio::test]
    async fn handlers_see_body_parameters_and_choose_their_status() {
        let response = table()
            .dispatch(
                lazy_context(),
                request(Method::POST, "/echo", br#"{"name": "Beverages", "tax": 8}"#),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await, json!({"name": "Beverages", "tax": 8}));
    }

    #[tokio::test]
    async fn protected_route_without_a_bearer_is_rejected_before_dispatch() {
        let response = table()
            .dispatch(lazy_context(), request(Method::GET, "/secret", b""))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Token not found");
        assert_eq!(body["code"], 401);
    }

    #[test]
    #[should_panic(expected = "duplicate route")]
    fn duplicate_registration_fails_at_construction() {
        let _ = RouteTable::builder()
            .get("/ping", Policy::Guest, ping)
            .get("/ping", Policy::Guest, ping)
            .build();
    }
}
