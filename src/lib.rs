mod app;
mod application;
mod domain;
mod infrastructure;
mod interfaces;
mod shared;

pub use app::run;
