// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exams, practice, reports, students},
    state::AppState,
    utils::session::{admin_middleware, auth_middleware, password_gate_middleware},
};

/// Assembles the main application router.
///
/// * Public routes are read-only reports and listings.
/// * Member routes need a session and a non-temporary password.
/// * Admin routes additionally need the admin role.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // The password-change flow must stay reachable while the first-login flag is set.
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route("/change-password", post(auth::change_password))
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let public_routes = Router::new()
        .route("/students", get(students::list_students))
        .route("/practice-logs/recent", get(practice::recent_logs))
        .route("/rankings/weekly", get(reports::weekly_rankings))
        .route("/rankings/overall", get(reports::overall_rankings))
        .route("/rankings/last-week", get(reports::last_week_report))
        .route("/battle", get(reports::live_battle))
        .route("/performance", get(reports::student_performance))
        .route("/providers", get(exams::list_providers))
        .route("/exams", get(exams::list_exams))
        .route("/exams/{id}/ranking", get(exams::exam_ranking))
        .route("/exam-results/recent", get(exams::recent_results));

    // Layers run bottom-up: session first, then the first-login gate.
    let member_routes = Router::new()
        .route("/practice-logs", post(practice::create_log))
        .route("/practice-logs/{id}", delete(practice::delete_log))
        .route("/exam-results", post(exams::create_result))
        .route("/exam-results/{id}", delete(exams::delete_result))
        .route_layer(middleware::from_fn(password_gate_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/students", post(students::create_student))
        .route(
            "/students/{id}",
            put(students::update_student).delete(students::delete_student),
        )
        .route("/students/{id}/team", put(students::assign_team))
        .route("/students/{id}/password", put(students::reset_password))
        .route("/providers", post(exams::create_provider))
        .route("/providers/{id}", delete(exams::delete_provider))
        .route("/exams", post(exams::create_exam))
        .route("/exams/{id}", delete(exams::delete_exam))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn(password_gate_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .merge(public_routes)
        .merge(member_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
