//! Authentication middleware that validates cookies, extends sessions, and handles redirects.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        UserID,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        get_user_by_id,
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// `PrivateCookieJar` reads its key from the state.
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Where to send a request that has no valid session: the log-in page, with
/// a redirect back to the page that was requested.
fn log_in_target(request: &Request) -> String {
    if let Some(url) = build_log_in_redirect_url(request) {
        return url;
    }

    if request.uri().path().starts_with("/api") {
        tracing::warn!(
            "No usable HTMX current URL for {}, redirecting to dashboard after log in",
            request.uri()
        );
    } else {
        tracing::warn!(
            "Could not build a redirect for {}, redirecting to dashboard after log in",
            request.uri()
        );
    }

    build_log_in_redirect_url_from_target(endpoints::DASHBOARD_VIEW)
        .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
}

/// Read the session from the private cookie jar.
///
/// Returns `None` if the jar cannot be extracted or holds no valid token.
async fn get_session(parts: &mut Parts, state: &AuthState) -> Option<(UserID, PrivateCookieJar)> {
    let jar = PrivateCookieJar::from_request_parts(parts, state)
        .await
        .inspect_err(|error| tracing::error!("Could not read cookie jar: {error:?}"))
        .ok()?;
    let token = get_token_from_cookies(&jar).ok()?;

    Some((token.user_id, jar))
}

/// Slide the session expiry forward by adding the refreshed cookie to `response`.
fn refresh_session(
    response: Response,
    jar: PrivateCookieJar,
    cookie_duration: Duration,
) -> Response {
    let jar = extend_auth_cookie_duration_if_needed(jar.clone(), cookie_duration).unwrap_or_else(
        |error| {
            tracing::error!("Could not extend session: {error:?}. Keeping the current cookie.");
            jar
        },
    );

    let (mut parts, body) = response.into_parts();
    let jar_response = jar.into_response();

    for cookie in jar_response.headers().get_all(SET_COOKIE) {
        parts.headers.append(SET_COOKIE, cookie.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Checks for a valid auth cookie, runs the request with the [UserID] in its
/// extensions and then slides the cookie expiry forward.
///
/// Requests without a valid cookie get the response built by `get_redirect`.
async fn run_authenticated(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let Some((user_id, jar)) = get_session(&mut parts, &state).await else {
        let request = Request::from_parts(parts, body);
        return get_redirect(&log_in_target(&request));
    };

    parts.extensions.insert(user_id);
    let response = next.run(Request::from_parts(parts, body)).await;

    refresh_session(response, jar, state.cookie_duration)
}

/// Only lets requests with a valid auth cookie through; everything else is
/// redirected to the log-in page.
///
/// Handlers behind this guard receive the user with `Extension(user_id): Extension<UserID>`.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    run_authenticated(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Same as [auth_guard], but unauthenticated requests get an HTMX redirect
/// so that HTMX requests navigate the whole page to the log-in page.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    run_authenticated(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// The state needed for the admin middleware.
#[derive(Debug, Clone)]
pub struct AdminGuardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminGuardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware that only lets admin users through and responds with 403 Forbidden otherwise.
///
/// **Note**: Must run after [auth_guard] or [auth_guard_hx], which provide the [UserID].
pub async fn admin_guard(
    State(state): State<AdminGuardState>,
    Extension(user_id): Extension<UserID>,
    request: Request,
    next: Next,
) -> Response {
    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_user_by_id(user_id, &connection) {
            Ok(user) => user,
            Err(error) => {
                tracing::error!("Could not get user {user_id} for admin check: {error}");
                return error.into_response();
            }
        }
    };

    if !user.is_admin {
        tracing::warn!(
            "User {user_id} tried to access admin route {}",
            request.uri().path()
        );
        return Error::Forbidden.into_response();
    }

    next.run(request).await
}


#[cfg(test)]
mod admin_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        extract::{Path, State},
        http::StatusCode,
        middleware,
        response::Html,
        routing::{get, post},
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::Digest;

    use crate::{
        Error,
        auth::{
            COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, Email, PasswordHash, UserID, auth_guard,
            create_user, set_auth_cookie,
        },
        db::initialize,
        endpoints::format_endpoint,
    };

    use super::{AdminGuardState, AuthState, admin_guard};

    async fn admin_handler() -> Html<&'static str> {
        Html("<h1>Admins only</h1>")
    }

    async fn stub_log_in_route(
        State(state): State<AuthState>,
        Path(user_id): Path<i64>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        set_auth_cookie(jar, UserID::new(user_id), state.cookie_duration)
    }

    fn get_test_server() -> (TestServer, UserID, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let admin = create_user(
            Email::new_unchecked("admin@example.com"),
            PasswordHash::new_unchecked("hunter2"),
            true,
            &connection,
        )
        .unwrap();
        let user = create_user(
            Email::new_unchecked("user@example.com"),
            PasswordHash::new_unchecked("hunter2"),
            false,
            &connection,
        )
        .unwrap();

        let auth_state = AuthState {
            cookie_key: Key::from(&sha2::Sha512::digest("nafstenoas")),
            cookie_duration: DEFAULT_COOKIE_DURATION,
        };
        let admin_state = AdminGuardState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route("/admin", get(admin_handler))
            .route_layer(middleware::from_fn_with_state(admin_state, admin_guard))
            .route_layer(middleware::from_fn_with_state(
                auth_state.clone(),
                auth_guard,
            ))
            .route("/log_in/{user_id}", post(stub_log_in_route))
            .with_state(auth_state);

        let server = TestServer::try_new(app).expect("Could not create test server.");

        (server, admin.id, user.id)
    }

    #[tokio::test]
    async fn admin_can_access_admin_route() {
        let (server, admin_id, _) = get_test_server();
        let response = server
            .post(&format_endpoint("/log_in/{user_id}", admin_id.as_i64()))
            .await;

        server
            .get("/admin")
            .add_cookie(response.cookie(COOKIE_TOKEN))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn non_admin_gets_forbidden() {
        let (server, _, user_id) = get_test_server();
        let response = server
            .post(&format_endpoint("/log_in/{user_id}", user_id.as_i64()))
            .await;

        server
            .get("/admin")
            .add_cookie(response.cookie(COOKIE_TOKEN))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
