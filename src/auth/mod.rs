/// Authentication module
///
/// JWT issuing and validation, password hashing, refresh token storage keys,
/// the authentication service and the request identity extractor.

mod claims;
mod identity;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use identity::AuthenticatedUser;
pub use jwt::issue_access_token;
pub use jwt::issue_refresh_token;
pub use jwt::validate_access_token;
pub use jwt::validate_refresh_token;
pub use jwt::verify_token;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::hash_token;
pub use service::AuthService;
pub use service::TokenPair;
