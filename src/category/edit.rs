//! Category editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    category::{
        CategoryName, Color, create::category_form_view, domain::CategoryFormData, get_category,
        update_category,
    },
    database_id::CategoryId,
    endpoints,
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
};

/// The state needed for the edit category page and endpoint.
#[derive(Debug, Clone)]
pub struct EditCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category editing page.
pub async fn get_edit_category_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let category = get_category(user_id, category_id, &connection).inspect_err(|error| {
        if *error != Error::NotFound {
            tracing::error!("Failed to retrieve category {category_id}: {error}");
        }
    })?;

    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_CATEGORY_VIEW, category_id);
    let update_endpoint = endpoints::format_endpoint(endpoints::CATEGORY, category_id);
    let values = CategoryFormData {
        name: category.name.to_string(),
        color: category.color.to_string(),
    };

    Ok(edit_category_view(&edit_endpoint, &update_endpoint, &values).into_response())
}

/// Handle category update form submission.
pub async fn update_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
    Form(form_data): Form<CategoryFormData>,
) -> Response {
    let update_endpoint = endpoints::format_endpoint(endpoints::CATEGORY, category_id);

    let validated = CategoryName::new(&form_data.name)
        .and_then(|name| Color::new(&form_data.color).map(|color| (name, color)));
    let (name, color) = match validated {
        Ok(validated) => validated,
        Err(error) => {
            return category_form_view(
                &update_endpoint,
                "hx-put",
                &form_data,
                &format!("Error: {error}"),
            )
            .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_category(user_id, category_id, name, color, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::UpdateMissingCategory | Error::DuplicateCategoryName(_))) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating category {category_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn edit_category_view(
    edit_endpoint: &str,
    update_endpoint: &str,
    values: &CategoryFormData,
) -> Markup {
    let nav_bar = NavBar::new(edit_endpoint).into_html();
    let form = category_form_view(update_endpoint, "hx-put", values, "");

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Category", &[], &content)
}

#[cfg(test)]
mod edit_category_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
    };

    use crate::{
        Error,
        auth::UserID,
        category::{
            CategoryName, Color, create_category, domain::CategoryFormData,
            edit::EditCategoryState, get_category, get_edit_category_page,
            update_category_endpoint,
        },
        endpoints,
        test_utils::{
            assert_form_input_with_value, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
    };

    fn get_state() -> (EditCategoryState, UserID, i64) {
        let connection = get_test_connection();
        let user_id = create_test_user("foo@bar.baz", &connection);
        let category = create_category(
            user_id,
            CategoryName::new_unchecked("Food"),
            Color::new_unchecked("#00ff00"),
            &connection,
        )
        .unwrap();

        (
            EditCategoryState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user_id,
            category.id,
        )
    }

    #[tokio::test]
    async fn render_edit_page_with_current_values() {
        let (state, user_id, category_id) = get_state();

        let response = get_edit_category_page(Path(category_id), State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &endpoints::format_endpoint(endpoints::CATEGORY, category_id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "name", "text", "Food");
        assert_form_input_with_value(&form, "color", "color", "#00ff00");
    }

    #[tokio::test]
    async fn edit_page_for_other_users_category_is_not_found() {
        let (state, _, category_id) = get_state();
        let other_user = create_test_user("bob@example.com", &state.db_connection.lock().unwrap());

        let result =
            get_edit_category_page(Path(category_id), State(state), Extension(other_user)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn update_category_succeeds() {
        let (state, user_id, category_id) = get_state();

        let response = update_category_endpoint(
            Path(category_id),
            State(state.clone()),
            Extension(user_id),
            Form(CategoryFormData {
                name: "Groceries".to_owned(),
                color: "#123456".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::CATEGORIES_VIEW);
        let category =
            get_category(user_id, category_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(category.name.as_ref(), "Groceries");
        assert_eq!(category.color.as_ref(), "#123456");
    }

    #[tokio::test]
    async fn update_missing_category_returns_not_found() {
        let (state, user_id, category_id) = get_state();

        let response = update_category_endpoint(
            Path(category_id + 100),
            State(state),
            Extension(user_id),
            Form(CategoryFormData {
                name: "Groceries".to_owned(),
                color: "#123456".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
