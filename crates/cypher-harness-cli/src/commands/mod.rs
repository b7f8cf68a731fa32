pub mod start_server;
pub mod test_auth;
