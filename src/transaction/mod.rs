//! Income, expenses and transfers recorded by users.

mod core;
mod create;
mod delete;
mod edit;
mod form;
mod transactions_page;

pub use core::{
    NewTransaction, Transaction, TransactionKind, UNCATEGORIZED, create_transaction,
    create_transaction_table, delete_transaction, get_all_transactions, get_transaction,
    update_transaction, validate_amount,
};
pub use create::{create_transaction_endpoint, get_new_transaction_page};
pub use delete::delete_transaction_endpoint;
pub use edit::{get_edit_transaction_page, update_transaction_endpoint};
pub use transactions_page::get_transactions_page;
