mod handler;
mod model;

pub use handler::{check_token, login, logout, me, refresh_token, register};
pub use model::{
    CheckTokenResponse, LoginRequest, RegisterRequest, SessionResponse, TokenResponse,
};
