pub mod api;
pub mod cli;
pub mod normalization;
pub mod tracing;
pub mod warehouse;

pub mod util {
    pub mod env;
}
