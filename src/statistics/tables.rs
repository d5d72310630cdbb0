//! Cards and tables for the dashboard.

use maud::{Markup, html};

use crate::{
    budget::{Budget, BudgetEvaluation},
    html::{
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_currency,
        format_percentage, progress_bar,
    },
    statistics::aggregation::{CategoryTotal, Summary},
};

const TABLE_CELL_GREEN_STYLE: &str = "text-green-600 dark:text-green-400";
const TABLE_CELL_RED_STYLE: &str = "text-red-600 dark:text-red-400";
const CARD_STYLE: &str = "bg-white dark:bg-gray-800 border border-gray-200 \
    dark:border-gray-700 rounded-lg p-4 shadow-md";

/// Gets the CSS class for coloring amounts (green for positive, red for negative).
fn amount_color_class(amount: f64) -> &'static str {
    if amount >= 0.0 {
        TABLE_CELL_GREEN_STYLE
    } else {
        TABLE_CELL_RED_STYLE
    }
}

fn summary_card(title: &str, value: &str, value_style: &str) -> Markup {
    html! {
        div class=(CARD_STYLE) data-card=(title)
        {
            h4 class="text-sm text-gray-600 dark:text-gray-400 mb-1" { (title) }
            div class={ "text-2xl font-bold " (value_style) } { (value) }
        }
    }
}

/// Income, expenses, balance and savings rate for one period.
pub(super) fn summary_cards_view(summary: &Summary, period_label: &str) -> Markup {
    html! {
        section class="w-full mx-auto mb-8"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Summary" }
                span class="text-sm text-gray-600 dark:text-gray-400" { (period_label) }
            }

            div class="grid grid-cols-2 lg:grid-cols-4 gap-4"
            {
                (summary_card("Income", &format_currency(summary.total_income), TABLE_CELL_GREEN_STYLE))
                (summary_card("Expenses", &format_currency(summary.total_expenses), TABLE_CELL_RED_STYLE))
                (summary_card("Balance", &format_currency(summary.balance), amount_color_class(summary.balance)))
                (summary_card(
                    "Savings Rate",
                    &format_percentage(summary.savings_rate),
                    amount_color_class(summary.savings_rate),
                ))
            }
        }
    }
}

/// The categories with the most spending and their share of total expenses.
pub(super) fn top_categories_table(categories: &[CategoryTotal], total_expenses: f64) -> Markup {
    html! {
        div class="w-full"
        {
            h3 class="text-xl font-semibold mb-4" { "Top Expense Categories" }

            div class="overflow-x-auto rounded-lg shadow"
            {
                table id="top-categories" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Spent" }
                            th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Share" }
                        }
                    }

                    tbody
                    {
                        @for category in categories {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                th scope="row" class={ (TABLE_CELL_STYLE) " font-medium text-gray-900 dark:text-white" }
                                {
                                    (category.name)
                                }
                                td class={ (TABLE_CELL_STYLE) " text-right" } { (format_currency(category.total)) }
                                td class={ (TABLE_CELL_STYLE) " text-right" }
                                {
                                    @if total_expenses > 0.0 {
                                        (format_percentage(category.total / total_expenses * 100.0))
                                    } @else {
                                        "-"
                                    }
                                }
                            }
                        }

                        @if categories.is_empty() {
                            tr
                            {
                                td colspan="3" class="px-6 py-4 text-center" { "No expenses yet." }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// How far through each current budget the user is.
pub(super) fn budget_status_table(budgets: &[(Budget, BudgetEvaluation)]) -> Markup {
    html! {
        div class="w-full"
        {
            h3 class="text-xl font-semibold mb-4" { "Current Budgets" }

            div class="overflow-x-auto rounded-lg shadow"
            {
                table id="current-budgets" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Budget" }
                            th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Remaining" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Progress" }
                        }
                    }

                    tbody
                    {
                        @for (budget, evaluation) in budgets {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                th scope="row" class={ (TABLE_CELL_STYLE) " font-medium text-gray-900 dark:text-white" }
                                {
                                    (budget.category_name.as_deref().unwrap_or("All categories"))
                                    " (" (budget.period.label()) ")"
                                }
                                td class={ (TABLE_CELL_STYLE) " text-right " (amount_color_class(evaluation.remaining)) }
                                {
                                    (format_currency(evaluation.remaining))
                                }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    div class="flex items-center gap-2"
                                    {
                                        (progress_bar(evaluation.percentage))
                                        span class="text-xs" { (format_percentage(evaluation.percentage)) }
                                    }
                                }
                            }
                        }

                        @if budgets.is_empty() {
                            tr
                            {
                                td colspan="3" class="px-6 py-4 text-center" { "No budgets cover today." }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use crate::statistics::aggregation::{CategoryTotal, Summary};

    use super::{summary_cards_view, top_categories_table};

    #[test]
    fn cards_show_totals() {
        let summary = Summary {
            total_income: 20000.0,
            total_expenses: 5000.0,
            balance: 15000.0,
            savings_rate: 75.0,
            category_totals: Vec::new(),
            window: Vec::new(),
        };

        let html = Html::parse_fragment(&summary_cards_view(&summary, "January 2025").into_string());

        let values: Vec<String> = html
            .select(&Selector::parse("[data-card] div").unwrap())
            .map(|value| value.text().collect())
            .collect();
        assert_eq!(values, ["$20,000.00", "$5,000.00", "$15,000.00", "75.0%"]);
    }

    #[test]
    fn top_categories_show_share_of_expenses() {
        let categories = [
            CategoryTotal {
                name: "Rent".to_owned(),
                total: 750.0,
            },
            CategoryTotal {
                name: "Food".to_owned(),
                total: 250.0,
            },
        ];

        let html = Html::parse_fragment(&top_categories_table(&categories, 1000.0).into_string());

        let rows: Vec<Vec<String>> = html
            .select(&Selector::parse("tbody tr").unwrap())
            .map(|row| {
                row.select(&Selector::parse("th, td").unwrap())
                    .map(|cell| cell.text().collect::<String>().trim().to_owned())
                    .collect()
            })
            .collect();
        assert_eq!(
            rows,
            [
                vec!["Rent".to_owned(), "$750.00".to_owned(), "75.0%".to_owned()],
                vec!["Food".to_owned(), "$250.00".to_owned(), "25.0%".to_owned()],
            ]
        );
    }
}
