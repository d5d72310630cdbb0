use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    category::Category,
    database_id::CategoryId,
    html::{
        FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE,
    },
    transaction::core::TransactionKind,
};

/// The form data for creating or updating a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// One of "income", "expense" or "transfer".
    pub kind: String,
    /// The value of the transaction in dollars.
    pub amount: f64,
    /// The date when the transaction ocurred.
    pub date: Date,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: String,
    /// The category to file the transaction under.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

pub struct TransactionFormDefaults<'a> {
    pub kind: TransactionKind,
    pub amount: Option<f64>,
    pub date: Date,
    pub description: Option<&'a str>,
    pub category_id: Option<CategoryId>,
    pub max_date: Date,
    pub autofocus_amount: bool,
}

pub fn transaction_form_fields(
    defaults: &TransactionFormDefaults<'_>,
    available_categories: &[Category],
) -> Markup {
    let amount_str = defaults.amount.map(|amount| format!("{amount:.2}"));

    html! {
        fieldset class="space-y-2"
        {
            legend class=(FORM_LABEL_STYLE) { "Transaction type" }

            div class=(FORM_RADIO_GROUP_STYLE)
            {
                @for kind in TransactionKind::ALL {
                    @let id = format!("transaction-kind-{}", kind.as_str());

                    div class="flex items-center gap-3"
                    {
                        input
                            name="kind"
                            id=(id)
                            type="radio"
                            value=(kind.as_str())
                            checked[kind == defaults.kind]
                            required
                            tabindex="0"
                            class=(FORM_RADIO_INPUT_STYLE);

                        label
                            for=(id)
                            class=(FORM_RADIO_LABEL_STYLE)
                        {
                            (kind.label())
                        }
                    }
                }
            }
        }

        div
        {
            label
                for="amount"
                class=(FORM_LABEL_STYLE)
            {
                "Amount"
            }

            div class="input-wrapper w-full"
            {
                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    placeholder="0.01"
                    min="0.01"
                    required
                    value=[amount_str.as_deref()]
                    autofocus[defaults.autofocus_amount]
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }

        div
        {
            label
                for="date"
                class=(FORM_LABEL_STYLE)
            {
                "Date"
            }

            input
                name="date"
                id="date"
                type="date"
                max=(defaults.max_date)
                value=(defaults.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="description"
                class=(FORM_LABEL_STYLE)
            {
                "Description"
            }

            input
                name="description"
                id="description"
                type="text"
                placeholder="Description"
                value=[defaults.description]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="category_id"
                class=(FORM_LABEL_STYLE)
            {
                "Category"
            }

            select
                name="category_id"
                id="category_id"
                class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" { "Uncategorized" }

                @for category in available_categories {
                    option
                        value=(category.id)
                        selected[Some(category.id) == defaults.category_id]
                    {
                        (category.name)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};
    use time::macros::date;

    use super::{TransactionFormDefaults, transaction_form_fields};
    use crate::{
        auth::UserID,
        category::{Category, CategoryName, Color},
        transaction::core::TransactionKind,
    };

    fn render_fields(kind: TransactionKind, category_id: Option<i64>) -> Html {
        let categories = [
            Category {
                id: 1,
                user_id: UserID::new(1),
                name: CategoryName::new_unchecked("Food"),
                color: Color::default(),
            },
            Category {
                id: 2,
                user_id: UserID::new(1),
                name: CategoryName::new_unchecked("Rent"),
                color: Color::default(),
            },
        ];
        let fields = transaction_form_fields(
            &TransactionFormDefaults {
                kind,
                amount: None,
                date: date!(2025 - 01 - 10),
                description: None,
                category_id,
                max_date: date!(2025 - 01 - 31),
                autofocus_amount: false,
            },
            &categories,
        );

        Html::parse_fragment(&fields.into_string())
    }

    #[test]
    fn checks_selected_kind() {
        for kind in TransactionKind::ALL {
            let html = render_fields(kind, None);
            let selector = Selector::parse("input[type=radio][checked]").unwrap();
            let checked: Vec<_> = html
                .select(&selector)
                .filter_map(|input| input.value().attr("value"))
                .collect();

            assert_eq!(checked, [kind.as_str()]);
        }
    }

    #[test]
    fn selects_current_category() {
        let html = render_fields(TransactionKind::Expense, Some(2));
        let selector = Selector::parse("select[name=category_id] option[selected]").unwrap();
        let selected: Vec<_> = html
            .select(&selector)
            .map(|option| option.text().collect::<String>())
            .collect();

        assert_eq!(selected, ["Rent"]);
    }
}
