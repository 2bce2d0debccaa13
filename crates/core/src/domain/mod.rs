pub mod catalog;
pub mod history;
pub mod service;
pub mod shop;
