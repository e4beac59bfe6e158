pub mod cache;
pub mod cities;
pub mod config;
pub mod dashboard;
pub mod i18n;
pub mod lifecycle;
pub mod routes;
pub mod search;
pub mod settings;
pub mod store;
pub mod utils;
pub mod view;
pub mod weather;
