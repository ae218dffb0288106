pub mod access_log;
pub mod http_helpers;
pub mod logger;
