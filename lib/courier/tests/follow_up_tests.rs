//! Redirects, authentication and retry-after follow-ups over a scripted transport.

mod support;

use std::io::Cursor;

use assert2::{check, let_assert};
use courier::middleware::BasicAuthenticator;
use courier::{Client, Error, Method, Proxy, Request, RequestBody, Url};
use support::{MockServer, Reply};

fn get(url: &str) -> Request {
    Request::get(url).expect("valid request")
}

fn post(url: &str, body: RequestBody) -> Request {
    Request::builder(Url::parse(url).expect("url"))
        .post(body)
        .build()
        .expect("valid request")
}

#[test]
fn redirect_to_same_authority_issues_one_follow_up() {
    let server = MockServer::new();
    server
        .reply(Reply::new(302).header("Location", "http://a/b"))
        .reply(Reply::new(200).body("done"));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 200);
    let_assert!(Some(prior) = response.prior_response());
    check!(prior.code() == 302);
    check!(prior.body().is_none());
    check!(response.request().url().as_str() == "http://a/b");
    check!(response.text().expect("text") == "done");

    let exchanges = server.exchanges();
    check!(exchanges.len() == 2);
    let_assert!(Some(follow_up) = exchanges.get(1));
    check!(follow_up.method == "GET");
    check!(follow_up.url == "http://a/b");

    // Same authority: the allocation is reused.
    check!(server.acquired() == vec!["http://a:80".to_string()]);
    check!(server.released() == 1);
}

#[test]
fn redirect_to_another_authority_reacquires() {
    let server = MockServer::new();
    server
        .reply(Reply::new(301).header("Location", "http://b:8080/x"))
        .reply(Reply::new(200));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 200);
    check!(server.acquired() == vec!["http://a:80".to_string(), "http://b:8080".to_string()]);
    check!(server.released() == 2);
}

#[test]
fn redirect_back_to_same_path_reuses_the_allocation() {
    let server = MockServer::new();
    server
        .reply(Reply::new(301).header("Location", "/p"))
        .reply(Reply::new(200));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(response) = client.execute(get("http://a/p")));
    check!(response.code() == 200);
    check!(server.acquired() == vec!["http://a:80".to_string()]);
    check!(server.streams() == 2);
    check!(server.released() == 1);
}

#[test]
fn streamed_body_is_not_resent_for_503() {
    let server = MockServer::new();
    server.reply(Reply::new(503).header("Retry-After", "0"));
    let client = Client::builder(server.clone()).build();
    let body = RequestBody::stream(Some("text/plain"), 5, Cursor::new(b"hello".to_vec()));

    let_assert!(Err(error) = client.execute(post("http://a/", body)));
    check!(matches!(error, Error::UnrepeatableBody { status: 503 }));
    check!(error.is_policy());
    check!(error.to_string() == "cannot retry streamed HTTP body (status 503)");

    let exchanges = server.exchanges();
    check!(exchanges.len() == 1);
    check!(exchanges.first().map(|e| e.body.as_slice()) == Some(&b"hello"[..]));
    check!(server.released() == 1);
}

#[test]
fn repeatable_body_is_resent_for_503_retry_after_zero() {
    let server = MockServer::new();
    server
        .reply(Reply::new(503).header("Retry-After", "0"))
        .reply(Reply::new(201));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(response) = client.execute(post("http://a/", RequestBody::text("hi"))));
    check!(response.code() == 201);
    let bodies: Vec<_> = server.exchanges().into_iter().map(|e| e.body).collect();
    check!(bodies == vec![b"hi".to_vec(), b"hi".to_vec()]);
}

#[test]
fn service_unavailable_with_delay_is_final() {
    let server = MockServer::new();
    server.reply(Reply::new(503).header("Retry-After", "120"));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 503);
    check!(server.exchanges().len() == 1);
}

#[test]
fn consecutive_408_is_not_retried_twice() {
    let server = MockServer::new();
    server.reply(Reply::new(408)).reply(Reply::new(408));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 408);
    check!(response.prior_response().map(courier::Response::code) == Some(408));
    check!(server.exchanges().len() == 2);
}

#[test]
fn request_timeout_is_final_when_retries_are_disabled() {
    let server = MockServer::new();
    server.reply(Reply::new(408));
    let client = Client::builder(server.clone())
        .retry_on_connection_failure(false)
        .build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 408);
    check!(server.exchanges().len() == 1);
}

#[test]
fn twenty_first_follow_up_is_rejected() {
    let server = MockServer::new();
    for _ in 0..21 {
        server.reply(Reply::new(302).header("Location", "/next"));
    }
    let client = Client::builder(server.clone()).build();

    let_assert!(Err(Error::TooManyFollowUps { count }) = client.execute(get("http://a/")));
    check!(count == 21);
    // The original request plus 20 accepted follow-ups.
    check!(server.exchanges().len() == 21);
    check!(server.pending_steps() == 0);
}

#[test]
fn authorization_is_dropped_across_hosts() {
    let server = MockServer::new();
    server
        .reply(Reply::new(302).header("Location", "http://other/"))
        .reply(Reply::new(200));
    let client = Client::builder(server.clone()).build();
    let request = get("http://a/")
        .new_builder()
        .header("Authorization", "X")
        .build()
        .expect("valid");

    let_assert!(Ok(_) = client.execute(request));
    let exchanges = server.exchanges();
    check!(exchanges.first().and_then(|e| e.header("Authorization")) == Some("X"));
    check!(exchanges.get(1).and_then(|e| e.header("Authorization")).is_none());
}

#[test]
fn authorization_is_kept_on_same_host() {
    let server = MockServer::new();
    server
        .reply(Reply::new(302).header("Location", "/elsewhere"))
        .reply(Reply::new(200));
    let client = Client::builder(server.clone()).build();
    let request = get("http://a/")
        .new_builder()
        .header("Authorization", "X")
        .build()
        .expect("valid");

    let_assert!(Ok(_) = client.execute(request));
    let exchanges = server.exchanges();
    check!(exchanges.get(1).and_then(|e| e.header("Authorization")) == Some("X"));
}

#[test]
fn see_other_turns_post_into_get() {
    let server = MockServer::new();
    server
        .reply(Reply::new(303).header("Location", "/result"))
        .reply(Reply::new(200));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(_) = client.execute(post("http://a/form", RequestBody::text("k=v"))));
    let exchanges = server.exchanges();
    let_assert!(Some(follow_up) = exchanges.get(1));
    check!(follow_up.method == "GET");
    check!(follow_up.body.is_empty());
    check!(follow_up.header("Content-Length").is_none());
    check!(follow_up.header("Content-Type").is_none());
}

#[test]
fn propfind_keeps_method_and_body() {
    let server = MockServer::new();
    server
        .reply(Reply::new(301).header("Location", "/dav/"))
        .reply(Reply::new(207));
    let client = Client::builder(server.clone()).build();
    let request = Request::builder(Url::parse("http://a/dav").expect("url"))
        .method(Method::PropFind, Some(RequestBody::text("<propfind/>")))
        .build()
        .expect("valid");

    let_assert!(Ok(response) = client.execute(request));
    check!(response.code() == 207);
    let_assert!(Some(follow_up) = server.exchanges().get(1).cloned());
    check!(follow_up.method == "PROPFIND");
    check!(follow_up.body == b"<propfind/>");
}

#[test]
fn temporary_redirect_of_post_is_not_followed() {
    let server = MockServer::new();
    server.reply(Reply::new(307).header("Location", "/other"));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(response) = client.execute(post("http://a/", RequestBody::text("x"))));
    check!(response.code() == 307);
    check!(server.exchanges().len() == 1);
}

#[test]
fn redirects_can_be_disabled() {
    let server = MockServer::new();
    server.reply(Reply::new(302).header("Location", "/b"));
    let client = Client::builder(server.clone()).follow_redirects(false).build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 302);
}

#[test]
fn cross_scheme_redirect_respects_policy() {
    let server = MockServer::new();
    server.reply(Reply::new(302).header("Location", "https://a/"));
    let client = Client::builder(server.clone())
        .follow_ssl_redirects(false)
        .build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 302);
    check!(server.exchanges().len() == 1);
}

#[test]
fn redirect_to_unsupported_scheme_is_final() {
    let server = MockServer::new();
    server.reply(Reply::new(302).header("Location", "ftp://a/file"));
    let client = Client::builder(server.clone()).build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 302);
}

#[test]
fn basic_challenge_is_answered_once() {
    let server = MockServer::new();
    server
        .reply(Reply::new(401).header("WWW-Authenticate", r#"Basic realm="api""#))
        .reply(Reply::new(401).header("WWW-Authenticate", r#"Basic realm="api""#));
    let client = Client::builder(server.clone())
        .with_basic_auth("user", "wrong")
        .build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 401);
    let exchanges = server.exchanges();
    check!(exchanges.len() == 2);
    check!(exchanges.first().and_then(|e| e.header("Authorization")).is_none());
    check!(exchanges.get(1).and_then(|e| e.header("Authorization")) == Some("Basic dXNlcjp3cm9uZw=="));
}

#[test]
fn proxy_challenge_without_http_proxy_is_a_protocol_error() {
    let server = MockServer::new();
    server.reply(Reply::new(407).header("Proxy-Authenticate", "Basic"));
    let client = Client::builder(server.clone()).build();

    let_assert!(Err(error) = client.execute(get("http://a/")));
    check!(error.is_protocol());
    check!(error.to_string().contains("Received HTTP_PROXY_AUTH (407) code while not using proxy"));
}

#[test]
fn proxy_challenge_is_answered_through_http_proxy() {
    let server = MockServer::new();
    server
        .reply(Reply::new(407).header("Proxy-Authenticate", "Basic"))
        .reply(Reply::new(200));
    let client = Client::builder(server.clone())
        .proxy(Proxy::http("proxy", 3128))
        .proxy_authenticator(BasicAuthenticator::new("user", "pass"))
        .build();

    let_assert!(Ok(response) = client.execute(get("http://a/")));
    check!(response.code() == 200);
    let exchanges = server.exchanges();
    check!(exchanges.get(1).and_then(|e| e.header("Proxy-Authorization")) == Some("Basic dXNlcjpwYXNz"));
}

#[test]
fn body_left_open_by_interceptor_is_detected() {
    let server = MockServer::new();
    server.leak_streams();
    server
        .reply(Reply::new(302).header("Location", "/b"))
        .reply(Reply::new(200));
    let client = Client::builder(server.clone()).build();

    let_assert!(Err(Error::IllegalState(message)) = client.execute(get("http://a/")));
    check!(
        message == "Closing the body of the 302 response didn't close its backing stream. Bad interceptor?"
    );
    check!(server.released() == 1);
}
