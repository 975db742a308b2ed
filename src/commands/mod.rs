pub mod config;
mod call;
mod services;
mod session;

pub use call::{build_request, call, parse_query_pair};
pub use config::{Config, Options};
pub use services::{LOGIN_HINT, build_auth_api, build_store};
pub use session::{login, logout, register, status};
