pub mod endpoint;
pub mod interface;
pub mod prefix;
pub mod target;
