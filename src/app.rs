/*
 * Responsibility
 * - Config読み込み → 依存生成 (DrinkRepo / AuthGate) → Router 組み立て
 * - Middleware の適用 (HTTP 共通 / CORS)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    error::AppError,
    middleware,
    repos::{drink_repo::PgDrinkRepo, memory_drink_repo::InMemoryDrinkRepo},
    services::auth::{AuthGate, build_auth_gate},
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG=info,coffee_shop=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: fail fast
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting coffee shop API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    tokio::spawn(invalidate_keys_on_hangup(state.auth.clone()));
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// SIGHUP drops the cached JWKS so a rotated key is picked up on the next request.
#[cfg(unix)]
async fn invalidate_keys_on_hangup(auth: Arc<AuthGate>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("failed to register SIGHUP handler: {}", e);
            return;
        }
    };

    while sighup.recv().await.is_some() {
        auth.keys().invalidate().await;
        tracing::info!("received SIGHUP, JWKS cache invalidated");
    }
}

#[cfg(not(unix))]
async fn invalidate_keys_on_hangup(_auth: Arc<AuthGate>) {}

async fn build_state(config: &Config) -> Result<AppState> {
    let auth = build_auth_gate(config).context("failed to configure auth gate")?;

    let state = match &config.database_url {
        Some(url) => {
            let repo = PgDrinkRepo::connect(url)
                .await
                .context("failed to connect to database")?;
            repo.ensure_schema()
                .await
                .context("failed to prepare drinks table")?;
            AppState::new(Arc::new(repo), auth)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, drinks are kept in memory");
            AppState::new(Arc::new(InMemoryDrinkRepo::new()), auth)
        }
    };

    Ok(state)
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes(&state)
        .fallback(|| async { AppError::not_found() })
        .with_state(state);

    let router = middleware::http::apply(router);
    middleware::cors::apply(router, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::drink_repo::{DrinkRepo, Ingredient};
    use crate::services::auth::test_support::{self, TokenBuilder};
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        drinks: Arc<InMemoryDrinkRepo>,
    }

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "AUTH0_DOMAIN" => Some(test_support::DOMAIN.to_string()),
            "API_AUDIENCE" => Some(test_support::AUDIENCE.to_string()),
            _ => None,
        })
        .expect("config")
    }

    fn test_app() -> TestApp {
        let drinks = Arc::new(InMemoryDrinkRepo::new());
        let state = AppState::new(drinks.clone(), Arc::new(test_support::gate()));
        TestApp {
            router: build_router(state, &test_config()),
            drinks,
        }
    }

    fn water() -> Vec<Ingredient> {
        vec![Ingredient {
            name: "water".into(),
            color: "blue".into(),
            parts: 1,
        }]
    }

    async fn send(
        app: &TestApp,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .expect("request");

        let response = app.router.clone().oneshot(req).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    fn barista() -> String {
        TokenBuilder::new().permissions(&["get:drinks-detail"]).sign()
    }

    fn manager() -> String {
        TokenBuilder::new()
            .permissions(&[
                "get:drinks-detail",
                "post:drinks",
                "patch:drinks",
                "delete:drinks",
            ])
            .sign()
    }

    #[tokio::test]
    async fn public_menu_uses_short_form() {
        let app = test_app();
        app.drinks.create("water", &water()).await.expect("seed");

        let (status, body) = send(&app, Method::GET, "/drinks", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "drinks": [{ "id": 1, "title": "water", "recipe": [{ "color": "blue", "parts": 1 }] }]
            })
        );
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn detail_requires_token() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, "/drinks-detail", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": 401,
                "message": "Authorization header is needed.",
            })
        );
    }

    #[tokio::test]
    async fn barista_reads_detail_but_cannot_post() {
        let app = test_app();
        app.drinks.create("water", &water()).await.expect("seed");
        let token = barista();

        let (status, body) = send(&app, Method::GET, "/drinks-detail", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");

        let (status, body) = send(
            &app,
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({ "title": "latte", "recipe": water() })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "User does not have permission");
        assert!(app.drinks.list().await.expect("list").len() == 1);
    }

    #[tokio::test]
    async fn manager_full_lifecycle() {
        let app = test_app();
        let token = manager();

        let (status, body) = send(
            &app,
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({
                "title": "water",
                "recipe": { "name": "water", "color": "blue", "parts": 1 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let id = body["drinks"][0]["id"].as_i64().expect("id");

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/drinks/{id}"),
            Some(&token),
            Some(json!({ "title": "sparkling water" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drinks"][0]["title"], "sparkling water");
        assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");

        let (status, body) =
            send(&app, Method::DELETE, &format!("/drinks/{id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "delete": id }));

        let (status, body) =
            send(&app, Method::DELETE, &format!("/drinks/{id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], 404);
    }

    #[tokio::test]
    async fn invalid_drink_is_unprocessable() {
        let app = test_app();
        let token = manager();

        let (status, body) = send(
            &app,
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({ "title": "water" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "unprocessable entity");

        app.drinks.create("water", &water()).await.expect("seed");
        let (status, _) = send(
            &app,
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({ "title": "water", "recipe": water() })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn auth_runs_before_body_and_path_checks() {
        let app = test_app();

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/drinks/not-a-number",
            None,
            Some(json!({ "title": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/drinks/not-a-number",
            Some(&manager()),
            Some(json!({ "title": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_permission_does_not_grant_delete() {
        let app = test_app();
        let drink = app.drinks.create("water", &water()).await.expect("seed");
        let token = TokenBuilder::new().permissions(&["patch:drinks"]).sign();

        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/drinks/{}", drink.id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "User does not have permission");
        assert!(app.drinks.get(drink.id).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let app = test_app();
        let token = TokenBuilder::new()
            .expires_in(-120)
            .permissions(&["get:drinks-detail"])
            .sign();

        let (status, body) = send(&app, Method::GET, "/drinks-detail", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Token expired.");
    }

    #[tokio::test]
    async fn unknown_route_uses_error_shape() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, "/questions", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "success": false, "error": 404, "message": "resource not found" })
        );
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = test_app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/drinks")
            .header(header::AUTHORIZATION, format!("Bearer {}", manager()))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .expect("request");

        let response = app.router.clone().oneshot(req).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_cors_headers() {
        let app = test_app();
        let req = Request::builder()
            .method(Method::GET)
            .uri("/drinks")
            .header(header::ORIGIN, "http://localhost:8100")
            .body(Body::empty())
            .expect("request");

        let response = app.router.clone().oneshot(req).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn patch_of_missing_drink_is_not_found_before_title_conflict() {
        let app = test_app();
        app.drinks.create("water", &water()).await.expect("seed");

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/drinks/42",
            Some(&manager()),
            Some(json!({ "title": "water" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "resource not found");
    }
}
