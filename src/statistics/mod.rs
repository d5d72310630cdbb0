//! Statistics module
//!
//! Aggregates a user's transactions into totals, category rankings and a
//! trailing monthly window, and renders them on the dashboard.

mod aggregation;
mod charts;
mod handlers;
mod tables;

pub use aggregation::{
    CategoryTotal, DEFAULT_WINDOW_SIZE, MonthlyTotals, Summary, aggregate, top_categories,
};
pub use handlers::get_dashboard_page;
