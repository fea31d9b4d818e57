mod token;

pub use token::{AuthToken, TOKEN_TYPE};
