//! Alert system for displaying success and error messages to users.
//!
//! Alerts are rendered as HTML fragments that HTMX swaps into the
//! `#alert-container` element of the base page.

use maud::{Markup, html};

/// An alert message with optional details.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Success { message: String, details: String },
    Error { message: String, details: String },
}

impl Alert {
    /// Render the alert as an HTML fragment.
    pub fn into_html(self) -> Markup {
        let (message, details, container_style, title) = match self {
            Alert::Success { message, details } => (
                message,
                details,
                "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
                dark:bg-gray-800 dark:text-green-400",
                "Success",
            ),
            Alert::Error { message, details } => (
                message,
                details,
                "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
                dark:bg-gray-800 dark:text-red-400",
                "Error",
            ),
        };

        html! {
            div
                id="alert-container"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div
                    class=(container_style)
                    role="alert"
                {
                    span class="sr-only" { (title) }
                    p class="font-medium" { (message) }

                    @if !details.is_empty() {
                        p { (details) }
                    }

                    button
                        type="button"
                        class="mt-2 underline"
                        onclick="this.closest('#alert-container').classList.add('hidden')"
                    {
                        "Dismiss"
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::Alert;

    #[test]
    fn error_alert_contains_message_and_details() {
        let alert = Alert::Error {
            message: "Could not delete budget".to_owned(),
            details: "The budget could not be found.".to_owned(),
        };

        let html = Html::parse_fragment(&alert.into_html().into_string());

        let paragraphs: Vec<String> = html
            .select(&Selector::parse("p").unwrap())
            .map(|p| p.text().collect())
            .collect();
        assert_eq!(
            paragraphs,
            vec!["Could not delete budget", "The budget could not be found."]
        );
    }

    #[test]
    fn empty_details_are_not_rendered() {
        let alert = Alert::Success {
            message: "Saved".to_owned(),
            details: String::new(),
        };

        let html = Html::parse_fragment(&alert.into_html().into_string());

        assert_eq!(html.select(&Selector::parse("p").unwrap()).count(), 1);
    }
}
