// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Entry Builder
//!
//! Turns one request/response cycle into a [`LogEntry`]. Building is pure
//! apart from the timestamp and the shared [`RequestCounter`], performs no
//! I/O and runs on the caller's thread.
//!
//! ## Field Population
//!
//! Every addition is first-write-wins unless stated otherwise:
//!
//! ```text
//! always          isRequestLog, sourceContext, elapsedMilliseconds,
//!                 requestCount, serviceName
//! ctx             httpMethod, absoluteUri, pathInfo, ipAddress, forwardedFor,
//!                 referer, session, items, statusCode, statusDescription,
//!                 responseStatusSummary
//! ctx, open       userAuthId, sessionId
//! body allowed    requestDto, formData (ctx, open), rawBody (body tracking)
//! success         responseDto (response tracking)
//! error           level, statusCode (overwritten), errorCode, errorMessage,
//!                 stackTrace, exception, exceptionSource, exceptionData
//! appender        any key not yet present
//! headers         header-{name} unless the value is already recorded
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::entry::{LogEntry, LogLevel, PropertyValue};
use crate::hooks::Hooks;
use crate::request::{ErrorResponse, RequestContext, RequestPayload, Response};

pub const HTTP_MESSAGE_TEMPLATE: &str =
    "HTTP {httpMethod} {pathInfo} responded {statusCode} in {elapsedMilliseconds}ms";

pub const SOURCE_CONTEXT: &str = "request_logs";

/// Items the host uses internally for session caching, duration timing and
/// trace id propagation. They are never copied into `items`.
pub const RESERVED_ITEM_KEYS: [&str; 3] =
    ["__session", "_requestDurationStopwatch", "x-mac-requestId"];

/// Item or cookie carrying the authenticated user id.
pub const USER_AUTH_ID_KEY: &str = "X-UAId";

/// Process-wide sequence of built entries.
#[derive(Debug, Default)]
pub struct RequestCounter(AtomicU64);

impl RequestCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter and returns the new value.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug)]
pub struct EntryBuilder {
    config: Arc<Config>,
    hooks: Hooks,
    counter: Arc<RequestCounter>,
}

impl EntryBuilder {
    #[must_use]
    pub fn new(config: Arc<Config>, hooks: Hooks, counter: Arc<RequestCounter>) -> Self {
        EntryBuilder {
            config,
            hooks,
            counter,
        }
    }

    #[must_use]
    pub fn counter(&self) -> &Arc<RequestCounter> {
        &self.counter
    }

    #[must_use]
    pub fn build(
        &self,
        ctx: Option<&dyn RequestContext>,
        payload: Option<&RequestPayload>,
        response: Option<&Response>,
        duration: Duration,
    ) -> LogEntry {
        let mut entry = LogEntry::new();
        entry.set_message_template(HTTP_MESSAGE_TEMPLATE);

        self.add_common(&mut entry, duration);

        if let Some(ctx) = ctx {
            self.add_request(&mut entry, ctx);
        }

        // Without a context there is no open response to read from.
        let is_open = ctx.is_some_and(|c| !c.is_response_closed());
        if let Some(ctx) = ctx.filter(|_| is_open) {
            add_identity(&mut entry, ctx);
        }

        if let Some(payload) = payload {
            self.add_body(&mut entry, ctx, payload, is_open);
        }

        match response {
            Some(Response::Error(error)) => {
                if self.config.error_tracking {
                    add_error(&mut entry, error);
                }
            }
            Some(Response::Success(body)) => {
                if self.config.response_tracking {
                    entry.insert_if_absent("responseDto", body.clone());
                }
            }
            None => {
                if self.config.response_tracking {
                    entry.insert_if_absent("responseDto", PropertyValue::Null);
                }
            }
        }

        if let Some(append) = &self.hooks.append_properties {
            for (key, value) in append(ctx, payload, response, duration) {
                entry.insert_if_absent(key, value);
            }
        }

        if let Some(ctx) = ctx {
            add_headers(&mut entry, ctx);
        }

        entry
    }

    #[allow(clippy::cast_precision_loss)]
    fn add_common(&self, entry: &mut LogEntry, duration: Duration) {
        entry.insert_if_absent("isRequestLog", "True");
        entry.insert_if_absent("sourceContext", SOURCE_CONTEXT);
        entry.insert_if_absent(
            "elapsedMilliseconds",
            duration.as_nanos() as f64 / 1_000_000.0,
        );
        entry.insert_if_absent("requestCount", self.counter.next().to_string());
        entry.insert_if_absent("serviceName", self.config.service_name.as_str());
    }

    fn add_request(&self, entry: &mut LogEntry, ctx: &dyn RequestContext) {
        entry.insert_if_absent("httpMethod", ctx.verb());
        entry.insert_if_absent("absoluteUri", ctx.absolute_uri());
        entry.insert_if_absent("pathInfo", ctx.path_info());
        entry.insert_if_absent("ipAddress", ctx.remote_addr());
        entry.insert_if_absent("forwardedFor", ctx.header("X-Forwarded-For"));
        entry.insert_if_absent("referer", ctx.header("Referer"));

        let session = if self.config.session_tracking {
            ctx.existing_session()
        } else {
            None
        };
        entry.insert_if_absent("session", session);

        let items: BTreeMap<String, PropertyValue> = ctx
            .items()
            .iter()
            .filter(|(key, _)| !RESERVED_ITEM_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), PropertyValue::Opaque(value.clone())))
            .collect();
        entry.insert_if_absent("items", items);

        entry.insert_if_absent("statusCode", ctx.response_status_code());
        entry.insert_if_absent("statusDescription", ctx.response_status_description());
        entry.insert_if_absent("responseStatusSummary", ctx.response_status_summary());
    }

    fn add_body(
        &self,
        entry: &mut LogEntry,
        ctx: Option<&dyn RequestContext>,
        payload: &RequestPayload,
        is_open: bool,
    ) {
        if self.config.hides_body_for(&payload.request_type) {
            return;
        }

        entry.insert_if_absent("requestDto", payload.body.clone());

        let Some(ctx) = ctx else {
            return;
        };
        if is_open {
            entry.insert_if_absent("formData", ctx.form_data().cloned());
        }
        if self.config.request_body_tracking {
            entry.insert_if_absent("rawBody", ctx.raw_body());
        }
    }
}

fn add_identity(entry: &mut LogEntry, ctx: &dyn RequestContext) {
    let from_items = ctx
        .items()
        .get(USER_AUTH_ID_KEY)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let user_auth_id = ctx
        .user_auth_id()
        .map(str::to_string)
        .or(from_items)
        .or_else(|| ctx.cookie(USER_AUTH_ID_KEY).map(str::to_string));

    entry.insert_if_absent("userAuthId", user_auth_id);
    entry.insert_if_absent("sessionId", ctx.session_id());
}

fn add_error(entry: &mut LogEntry, error: &ErrorResponse) {
    let level = if (400..500).contains(&error.status_code) {
        LogLevel::Warning
    } else {
        LogLevel::Error
    };
    entry.set_level(level);
    entry.set_property("statusCode", error.status_code);
    entry.insert_if_absent("errorCode", error.error_code.as_deref());
    entry.insert_if_absent("errorMessage", error.message.as_deref());
    entry.insert_if_absent("stackTrace", error.stack_trace.as_deref());

    if let Some(exception) = &error.exception {
        match &exception.inner {
            Some(inner) => {
                entry.set_exception(inner.to_string());
                entry.insert_if_absent("exceptionSource", inner.source.as_deref());
                entry.insert_if_absent("exceptionData", inner.data.clone());
            }
            None => entry.set_exception(exception.to_string()),
        }
    }
}

fn add_headers(entry: &mut LogEntry, ctx: &dyn RequestContext) {
    for (name, value) in ctx.headers() {
        if !entry.contains_str_value(value) {
            entry.insert_if_absent(format!("header-{name}"), value.as_str());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::request::{ExceptionInfo, RequestSnapshot};

    fn builder_with(config: Config, hooks: Hooks) -> EntryBuilder {
        EntryBuilder::new(Arc::new(config), hooks, Arc::new(RequestCounter::new()))
    }

    fn builder() -> EntryBuilder {
        builder_with(Config::default(), Hooks::default())
    }

    fn users_request() -> RequestSnapshot {
        RequestSnapshot::new("GET", "http://localhost:8080/users/42", "/users/42")
    }

    fn payload(kind: &str) -> RequestPayload {
        RequestPayload::new(kind, json!({"id": 42}))
    }

    fn prop<'a>(entry: &'a LogEntry, key: &str) -> &'a PropertyValue {
        entry
            .property(key)
            .unwrap_or_else(|| panic!("missing property {key}"))
    }

    #[test]
    fn test_counter_returns_post_increment_value() {
        let counter = RequestCounter::new();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn test_users_scenario() {
        let ctx = users_request();
        let entry = builder().build(
            Some(&ctx),
            Some(&payload("GetUser")),
            Some(&Response::Success(json!({"name": "Ada"}))),
            Duration::from_micros(12_500),
        );

        assert_eq!(entry.message_template(), HTTP_MESSAGE_TEMPLATE);
        assert_eq!(entry.level(), LogLevel::Debug);
        assert_eq!(prop(&entry, "httpMethod").as_str(), Some("GET"));
        assert_eq!(prop(&entry, "pathInfo").as_str(), Some("/users/42"));
        assert_eq!(prop(&entry, "statusCode").as_i64(), Some(200));
        assert_eq!(prop(&entry, "elapsedMilliseconds").as_f64(), Some(12.5));
        assert_eq!(prop(&entry, "isRequestLog").as_str(), Some("True"));
        assert_eq!(prop(&entry, "sourceContext").as_str(), Some(SOURCE_CONTEXT));
        assert_eq!(prop(&entry, "requestCount").as_str(), Some("1"));
        assert_eq!(prop(&entry, "serviceName").as_str(), Some("request-logs"));
        assert_eq!(prop(&entry, "requestDto"), &PropertyValue::Opaque(json!({"id": 42})));
        assert!(prop(&entry, "session").is_null());
        assert!(entry.property("responseDto").is_none());
        assert!(entry.property("rawBody").is_none());
    }

    #[test]
    fn test_without_context_only_common_fields() {
        let entry = builder().build(None, None, None, Duration::ZERO);
        let keys: Vec<&str> = entry.properties().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "elapsedMilliseconds",
                "isRequestLog",
                "requestCount",
                "serviceName",
                "sourceContext"
            ]
        );
    }

    #[test]
    fn test_reserved_items_are_stripped() {
        let ctx = users_request()
            .with_item("__session", json!({"secret": true}))
            .with_item("_requestDurationStopwatch", json!(123))
            .with_item("x-mac-requestId", json!("abc"))
            .with_item("tenant", json!("acme"))
            .with_item("password", json!("kept"));
        let entry = builder().build(Some(&ctx), None, None, Duration::ZERO);

        let PropertyValue::Map(items) = prop(&entry, "items") else {
            panic!("items should be a map");
        };
        let keys: Vec<&str> = items.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["password", "tenant"]);
    }

    #[test]
    fn test_session_only_when_tracking_enabled() {
        let mut ctx = users_request();
        ctx.session = Some(json!({"userName": "ada"}));

        let entry = builder().build(Some(&ctx), None, None, Duration::ZERO);
        assert!(prop(&entry, "session").is_null());

        let config = Config {
            session_tracking: true,
            ..Default::default()
        };
        let entry = builder_with(config, Hooks::default()).build(Some(&ctx), None, None, Duration::ZERO);
        assert_eq!(
            prop(&entry, "session"),
            &PropertyValue::Opaque(json!({"userName": "ada"}))
        );
    }

    #[test]
    fn test_identity_only_while_response_open() {
        let mut ctx = users_request();
        ctx.session_id = Some("sess-1".to_string());
        ctx.cookies
            .insert(USER_AUTH_ID_KEY.to_string(), "user-7".to_string());

        let entry = builder().build(Some(&ctx), None, None, Duration::ZERO);
        assert_eq!(prop(&entry, "userAuthId").as_str(), Some("user-7"));
        assert_eq!(prop(&entry, "sessionId").as_str(), Some("sess-1"));

        ctx.response_closed = true;
        let entry = builder().build(Some(&ctx), None, None, Duration::ZERO);
        assert!(entry.property("userAuthId").is_none());
        assert!(entry.property("sessionId").is_none());
    }

    #[test]
    fn test_user_auth_id_prefers_item_over_cookie() {
        let mut ctx = users_request().with_item(USER_AUTH_ID_KEY, json!("from-item"));
        ctx.cookies
            .insert(USER_AUTH_ID_KEY.to_string(), "from-cookie".to_string());
        let entry = builder().build(Some(&ctx), None, None, Duration::ZERO);
        assert_eq!(prop(&entry, "userAuthId").as_str(), Some("from-item"));
    }

    #[test]
    fn test_hidden_body_types_omit_body_fields() {
        let config = Config {
            request_body_tracking: true,
            ..Default::default()
        };
        let mut ctx = users_request();
        ctx.form_data = Some(BTreeMap::from([("user".to_string(), "ada".to_string())]));
        ctx.raw_body = Some("user=ada&password=hunter2".to_string());

        let entry = builder_with(config.clone(), Hooks::default()).build(
            Some(&ctx),
            Some(&payload("Authenticate")),
            None,
            Duration::ZERO,
        );
        assert!(entry.property("requestDto").is_none());
        assert!(entry.property("formData").is_none());
        assert!(entry.property("rawBody").is_none());

        let entry = builder_with(config, Hooks::default()).build(
            Some(&ctx),
            Some(&payload("UpdateProfile")),
            None,
            Duration::ZERO,
        );
        assert!(entry.property("requestDto").is_some());
        assert!(entry.property("formData").is_some());
        assert_eq!(
            prop(&entry, "rawBody").as_str(),
            Some("user=ada&password=hunter2")
        );
    }

    #[test]
    fn test_empty_hide_set_always_logs_body() {
        let config = Config {
            hide_request_body_for_types: HashSet::new(),
            ..Default::default()
        };
        let entry = builder_with(config, Hooks::default()).build(
            None,
            Some(&payload("Authenticate")),
            None,
            Duration::ZERO,
        );
        assert!(entry.property("requestDto").is_some());
        assert!(entry.property("formData").is_none());
    }

    #[test]
    fn test_form_data_requires_open_response() {
        let mut ctx = users_request();
        ctx.form_data = Some(BTreeMap::new());
        ctx.response_closed = true;
        let entry = builder().build(Some(&ctx), Some(&payload("Search")), None, Duration::ZERO);
        assert!(entry.property("requestDto").is_some());
        assert!(entry.property("formData").is_none());
    }

    #[test]
    fn test_response_dto_only_when_tracking() {
        let response = Response::Success(json!([1, 2, 3]));
        let entry = builder().build(None, None, Some(&response), Duration::ZERO);
        assert!(entry.property("responseDto").is_none());

        let config = Config {
            response_tracking: true,
            ..Default::default()
        };
        let entry = builder_with(config.clone(), Hooks::default()).build(
            None,
            None,
            Some(&response),
            Duration::ZERO,
        );
        assert_eq!(prop(&entry, "responseDto"), &PropertyValue::Opaque(json!([1, 2, 3])));

        let entry = builder_with(config, Hooks::default()).build(None, None, None, Duration::ZERO);
        assert!(prop(&entry, "responseDto").is_null());
    }

    #[test]
    fn test_client_error_is_warning() {
        let ctx = users_request();
        let response = Response::Error(ErrorResponse::new(404, "NotFound", "no such user"));
        let entry = builder().build(Some(&ctx), None, Some(&response), Duration::ZERO);

        assert_eq!(entry.level(), LogLevel::Warning);
        assert_eq!(prop(&entry, "statusCode").as_i64(), Some(404));
        assert_eq!(prop(&entry, "errorCode").as_str(), Some("NotFound"));
        assert_eq!(prop(&entry, "errorMessage").as_str(), Some("no such user"));
        assert!(prop(&entry, "stackTrace").is_null());
        assert!(entry.exception().is_none());
    }

    #[test]
    fn test_server_error_is_error() {
        let response = Response::Error(ErrorResponse::new(500, "Boom", "exploded"));
        let entry = builder().build(None, None, Some(&response), Duration::ZERO);
        assert_eq!(entry.level(), LogLevel::Error);
        assert_eq!(prop(&entry, "statusCode").as_i64(), Some(500));

        let response = Response::Error(ErrorResponse::new(302, "Odd", "not an error code"));
        let entry = builder().build(None, None, Some(&response), Duration::ZERO);
        assert_eq!(entry.level(), LogLevel::Error);
    }

    #[test]
    fn test_error_tracking_disabled_leaves_entry_untouched() {
        let config = Config {
            error_tracking: false,
            response_tracking: true,
            ..Default::default()
        };
        let response = Response::Error(ErrorResponse::new(500, "Boom", "exploded"));
        let entry =
            builder_with(config, Hooks::default()).build(None, None, Some(&response), Duration::ZERO);
        assert_eq!(entry.level(), LogLevel::Debug);
        assert!(entry.property("errorCode").is_none());
        assert!(entry.property("responseDto").is_none());
    }

    #[test]
    fn test_exception_with_inner_cause() {
        let mut inner = ExceptionInfo::new("TimeoutError", "db timed out");
        inner.source = Some("orders-db".to_string());
        inner.data.insert("query".to_string(), "select 1".to_string());
        let response = Response::Error(
            ErrorResponse::new(503, "Unavailable", "try later")
                .with_exception(ExceptionInfo::new("ServiceError", "wrapped").with_inner(inner)),
        );
        let entry = builder().build(None, None, Some(&response), Duration::ZERO);

        assert_eq!(entry.exception(), Some("TimeoutError: db timed out"));
        assert_eq!(prop(&entry, "exceptionSource").as_str(), Some("orders-db"));
        let PropertyValue::Map(data) = prop(&entry, "exceptionData") else {
            panic!("exceptionData should be a map");
        };
        assert_eq!(data.get("query").and_then(PropertyValue::as_str), Some("select 1"));
    }

    #[test]
    fn test_exception_without_inner_cause() {
        let response = Response::Error(
            ErrorResponse::new(500, "Boom", "exploded")
                .with_exception(ExceptionInfo::new("PanicError", "index out of range")),
        );
        let entry = builder().build(None, None, Some(&response), Duration::ZERO);
        assert_eq!(entry.exception(), Some("PanicError: index out of range"));
        assert!(entry.property("exceptionSource").is_none());
    }

    #[test]
    fn test_appender_never_overwrites() {
        let hooks = Hooks::new().with_append_properties(|_, _, _, _| {
            BTreeMap::from([
                ("statusCode".to_string(), PropertyValue::from(999u16)),
                ("tenant".to_string(), PropertyValue::from("acme")),
            ])
        });
        let ctx = users_request();
        let entry = builder_with(Config::default(), hooks).build(Some(&ctx), None, None, Duration::ZERO);
        assert_eq!(prop(&entry, "statusCode").as_i64(), Some(200));
        assert_eq!(prop(&entry, "tenant").as_str(), Some("acme"));
    }

    #[test]
    fn test_appender_receives_inputs() {
        let seen = Arc::new(Mutex::new(None));
        let seen_by_hook = Arc::clone(&seen);
        let hooks = Hooks::new().with_append_properties(move |ctx, payload, _, duration| {
            *seen_by_hook.lock().unwrap() = Some((
                ctx.map(|c| c.path_info().to_string()),
                payload.map(|p| p.request_type.to_string()),
                duration,
            ));
            BTreeMap::new()
        });
        let ctx = users_request();
        let _ = builder_with(Config::default(), hooks).build(
            Some(&ctx),
            Some(&payload("GetUser")),
            None,
            Duration::from_millis(3),
        );
        assert_eq!(
            *seen.lock().unwrap(),
            Some((
                Some("/users/42".to_string()),
                Some("GetUser".to_string()),
                Duration::from_millis(3)
            ))
        );
    }

    #[test]
    fn test_headers_dedupe_by_value() {
        let ctx = users_request()
            .with_header("Referer", "https://example.com/")
            .with_header("Accept", "application/json")
            .with_header("X-Echo", "GET");
        let entry = builder().build(Some(&ctx), None, None, Duration::ZERO);

        assert_eq!(prop(&entry, "referer").as_str(), Some("https://example.com/"));
        assert!(entry.property("header-Referer").is_none());
        assert!(entry.property("header-X-Echo").is_none());
        assert_eq!(
            prop(&entry, "header-Accept").as_str(),
            Some("application/json")
        );
    }

    #[test]
    fn test_property_keys_are_sorted() {
        let ctx = users_request()
            .with_header("Zebra", "z")
            .with_header("Accept", "a");
        let entry = builder().build(
            Some(&ctx),
            Some(&payload("GetUser")),
            Some(&Response::Error(ErrorResponse::new(418, "Teapot", "short and stout"))),
            Duration::from_millis(1),
        );
        let keys: Vec<&String> = entry.properties().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_request_count_increments_per_build() {
        let builder = builder();
        let first = builder.build(None, None, None, Duration::ZERO);
        let second = builder.build(None, None, None, Duration::ZERO);
        assert_eq!(prop(&first, "requestCount").as_str(), Some("1"));
        assert_eq!(prop(&second, "requestCount").as_str(), Some("2"));
    }
}
