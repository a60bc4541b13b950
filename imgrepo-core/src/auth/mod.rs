pub mod credentials;
pub mod crypto;
pub mod session_token;

pub use credentials::CredentialService;
pub use crypto::{AuthCrypto, AuthCryptoError};
pub use session_token::{SessionToken, SessionTokenError};
