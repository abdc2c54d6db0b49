//! Demo routes served behind the session middleware

use bytes::Bytes;
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::Full;
use sessionstone_core::session::{Session, SessionHandle};

pub type Body = Full<Bytes>;

/// Route one request; every route expects the middleware to have attached a session
pub async fn route<B>(req: Request<B>) -> Response<Body> {
    let Some(session) = SessionHandle::from_request(&req) else {
        return text(StatusCode::INTERNAL_SERVER_ERROR, "no session attached");
    };

    if req.method() != Method::GET {
        return text(StatusCode::METHOD_NOT_ALLOWED, "only GET is supported");
    }

    match req.uri().path() {
        "/" => session.with(count_visit),
        "/rotate" => session.with(|s| {
            s.rotate();
            text(StatusCode::OK, "session id rotated")
        }),
        "/logout" => session.with(|s| {
            s.destroy();
            text(StatusCode::OK, "session destroyed")
        }),
        "/flash" => match query_param(req.uri().query(), "msg") {
            Some(msg) => session.with(|s| {
                s.flash().set("message", msg);
                text(StatusCode::OK, "flash message stored")
            }),
            None => session.with(|s| {
                let message = s.flash().get("message");
                match message.as_ref().and_then(|v| v.as_str()) {
                    Some(msg) => text(StatusCode::OK, &format!("flash: {}", msg)),
                    None => text(StatusCode::OK, "no flash message"),
                }
            }),
        },
        _ => text(StatusCode::NOT_FOUND, "not found"),
    }
}

fn count_visit(session: &mut Session) -> Response<Body> {
    let count = session.get_i64("count").unwrap_or(0);
    session.set("count", count + 1);
    text(StatusCode::OK, &format!("count: {}", count))
}

fn text(status: StatusCode, body: &str) -> Response<Body> {
    let mut resp = Response::new(Full::new(Bytes::from(format!("{}\n", body))));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain; charset=utf-8"));
    resp
}

/// Decoded value of `name` in a query string
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| decode_component(value))
    })
}

/// Form-style decoding: `+` is a space, `%XX` escapes are bytes, bad UTF-8 is replaced
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{COOKIE, SET_COOKIE};
    use http_body_util::BodyExt;
    use sessionstone_core::session::{MemoryStore, SessionConfig, SessionMiddleware};

    fn middleware() -> SessionMiddleware {
        SessionMiddleware::new(
            SessionConfig::new().with_store(MemoryStore::new()).with_secret("demo-secret"),
        )
        .unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(COOKIE, c);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    async fn body(resp: Response<Body>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn cookie(resp: &Response<Body>) -> String {
        let header = resp.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_counter_route() {
        let mw = middleware();

        let first = mw.handle(get("/", None), route).await;
        let jar = cookie(&first);
        assert_eq!(body(first).await, "count: 0\n");

        let second = mw.handle(get("/", Some(&jar)), route).await;
        assert!(second.headers().get(SET_COOKIE).is_none());
        assert_eq!(body(second).await, "count: 1\n");
    }

    #[tokio::test]
    async fn test_rotate_and_logout_routes() {
        let mw = middleware();
        let jar = cookie(&mw.handle(get("/", None), route).await);

        let rotated = mw.handle(get("/rotate", Some(&jar)), route).await;
        let new_jar = cookie(&rotated);
        assert_ne!(new_jar, jar);

        let counted = mw.handle(get("/", Some(&new_jar)), route).await;
        assert_eq!(body(counted).await, "count: 1\n");

        let logout = mw.handle(get("/logout", Some(&new_jar)), route).await;
        assert_eq!(cookie(&logout), "sess=");

        let after = mw.handle(get("/", Some(&new_jar)), route).await;
        assert_eq!(body(after).await, "count: 0\n");
    }

    #[tokio::test]
    async fn test_flash_route() {
        let mw = middleware();

        let stored = mw.handle(get("/flash?msg=hello+there", None), route).await;
        let jar = cookie(&stored);

        let read = mw.handle(get("/flash", Some(&jar)), route).await;
        assert_eq!(body(read).await, "flash: hello there\n");

        let again = mw.handle(get("/flash", Some(&jar)), route).await;
        assert_eq!(body(again).await, "no flash message\n");

        mw.handle(get("/flash?msg=hello%21", Some(&jar)), route).await;
        let escaped = mw.handle(get("/flash", Some(&jar)), route).await;
        assert_eq!(body(escaped).await, "flash: hello!\n");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let resp = middleware().handle(get("/missing", None), route).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_route_without_middleware() {
        let resp = route(get("/", None)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param(Some("msg=hi&x=1"), "msg").as_deref(), Some("hi"));
        assert_eq!(query_param(Some("x=1&msg=a+b"), "msg").as_deref(), Some("a b"));
        assert_eq!(query_param(Some("msg=hello%21"), "msg").as_deref(), Some("hello!"));
        assert_eq!(query_param(Some("msg=caf%C3%A9%20au+lait"), "msg").as_deref(), Some("café au lait"));
        assert_eq!(query_param(Some("msg=1%2B1"), "msg").as_deref(), Some("1+1"));
        assert_eq!(query_param(Some("msg="), "msg"), None);
        assert_eq!(query_param(None, "msg"), None);
    }
}
