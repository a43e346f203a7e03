pub mod jwt;
pub mod response;
