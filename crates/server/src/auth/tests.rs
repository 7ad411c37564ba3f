use crate::auth::{extract_bearer_token, require_admin, require_auth, AuthUser, JwtManager};
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use database::user::model::{User, UserRole};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_SECRET: &str = "test_jwt_secret_for_unit_tests_only";

fn test_user(role: UserRole) -> User {
    let mut user = User::new(
        "alice@example.com",
        "hash".to_string(),
        "0x00000000000000000000000000000000000000a1",
        "ALICE001".to_string(),
        None,
    );
    user.role = role;
    user
}

async fn whoami(Extension(user): Extension<AuthUser>) -> String {
    user.user_id.to_hex()
}

fn protected_router(jwt: Arc<JwtManager>) -> Router {
    let admin = Router::new()
        .route("/admin", get(whoami))
        .layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/me", get(whoami))
        .merge(admin)
        .layer(middleware::from_fn_with_state(jwt, require_auth))
}

fn request(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[test]
fn test_jwt_token_generation_and_verification() {
    let jwt_manager = JwtManager::new(TEST_SECRET, 24);
    let user = test_user(UserRole::User);

    let token = jwt_manager.generate_token(&user).expect("应该能够生成token");
    assert!(!token.is_empty());

    let claims = jwt_manager.verify_token(&token).expect("应该能够验证有效的token");
    assert_eq!(claims.sub, user.id.to_hex());
    assert_eq!(claims.wallet, user.wallet_address);
    assert_eq!(claims.role, UserRole::User);
    assert_eq!(claims.iss, "stakeflow-api");
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let issuer = JwtManager::new("another_secret", 24);
    let verifier = JwtManager::new(TEST_SECRET, 24);

    let token = issuer.generate_token(&test_user(UserRole::User)).unwrap();
    assert!(verifier.verify_token(&token).is_err());
    assert!(verifier.verify_token("not-a-jwt").is_err());
}

#[test]
fn test_extract_bearer_token() {
    assert_eq!(extract_bearer_token(Some("Bearer abc.def")), Some("abc.def"));
    assert_eq!(extract_bearer_token(Some("Basic abc")), None);
    assert_eq!(extract_bearer_token(Some("Bearer ")), None);
    assert_eq!(extract_bearer_token(None), None);
}

#[tokio::test]
async fn test_middleware_requires_token() {
    let jwt = Arc::new(JwtManager::new(TEST_SECRET, 24));
    let app = protected_router(jwt);

    let response = app.oneshot(request("/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_middleware_accepts_valid_token() {
    let jwt = Arc::new(JwtManager::new(TEST_SECRET, 24));
    let user = test_user(UserRole::User);
    let token = jwt.generate_token(&user).unwrap();

    let response = protected_router(jwt).oneshot(request("/me", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_route_rejects_regular_user() {
    let jwt = Arc::new(JwtManager::new(TEST_SECRET, 24));

    let user_token = jwt.generate_token(&test_user(UserRole::User)).unwrap();
    let response = protected_router(jwt.clone())
        .oneshot(request("/admin", Some(&user_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin_token = jwt.generate_token(&test_user(UserRole::Admin)).unwrap();
    let response = protected_router(jwt)
        .oneshot(request("/admin", Some(&admin_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
