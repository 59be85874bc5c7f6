pub mod action;
pub mod customer;
pub mod listing;
pub mod recommendation;
