pub mod manager;
pub mod tables;
pub mod types;

pub use manager::{create_all, create_batch, drop_all, drop_batch};
pub use tables::{definition, CREATE_ORDER, DROP_ORDER};
pub use types::{Column, Dialect, Table, TableDef};
