//! Bearer token verification. Tokens are issued by the account service;
//! this server only validates them.

pub mod jwt;
