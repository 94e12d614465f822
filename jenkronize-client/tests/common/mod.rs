pub mod ci_server;
