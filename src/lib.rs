pub mod catalog;
pub mod check;
pub mod completion;
pub mod config;
pub mod descriptions;
pub mod diagnostic;
pub mod document;
pub mod formatter;
pub mod hierarchy;
pub mod hover;
pub mod position;
pub mod resolver;
pub mod scanner;
pub mod section;
pub mod server;
pub mod service;
pub mod validator;

pub mod utils {
    pub mod constants;
    pub mod logging;
    pub mod uri_helpers;
}
