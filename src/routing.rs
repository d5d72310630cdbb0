//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        admin_guard, auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page,
        post_log_in, register_user,
    },
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budgets_page, get_new_budget_page,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_edit_category_page, get_new_category_page, update_category_endpoint,
    },
    endpoints,
    export::{export_report_json, export_transactions_csv},
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    statistics::get_dashboard_page,
    subscription::{
        choose_plan_endpoint, get_admin_users_page, get_subscription_page, paywall,
        update_user_subscription_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_edit_transaction_page,
        get_new_transaction_page, get_transactions_page, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(
            endpoints::NEW_TRANSACTION_VIEW,
            get(get_new_transaction_page),
        )
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .route(endpoints::EDIT_CATEGORY_VIEW, get(get_edit_category_page))
        .route(endpoints::BUDGETS_VIEW, get(get_budgets_page))
        .route(endpoints::NEW_BUDGET_VIEW, get(get_new_budget_page))
        .route(endpoints::SUBSCRIPTION_VIEW, get(get_subscription_page))
        .merge(
            Router::new()
                .route(endpoints::ADMIN_USERS_VIEW, get(get_admin_users_page))
                .layer(middleware::from_fn_with_state(state.clone(), admin_guard)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT/DELETE routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_api_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::CATEGORIES_API, post(create_category_endpoint))
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(endpoints::BUDGETS_API, post(create_budget_endpoint))
        .route(endpoints::BUDGET, delete(delete_budget_endpoint))
        .route(endpoints::SUBSCRIPTION_API, post(choose_plan_endpoint))
        .merge(
            Router::new()
                .route(
                    endpoints::ADMIN_USER_SUBSCRIPTION,
                    put(update_user_subscription_endpoint),
                )
                .layer(middleware::from_fn_with_state(state.clone(), admin_guard)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    // Exports are plain downloads, so they redirect like pages. The paywall
    // runs after the auth guard has added the user ID.
    let export_routes = Router::new()
        .route(
            endpoints::EXPORT_TRANSACTIONS_CSV,
            get(export_transactions_csv),
        )
        .route(endpoints::EXPORT_REPORT_JSON, get(export_report_json))
        .layer(middleware::from_fn_with_state(state.clone(), paywall))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(protected_api_routes)
        .merge(export_routes)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
