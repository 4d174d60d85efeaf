pub mod decoders;
pub mod imap_client;
pub mod reader;
pub mod session;
