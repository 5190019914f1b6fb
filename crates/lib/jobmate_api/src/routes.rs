//! Route paths.

pub const POST_AUTH_REQUEST_OTP: &str = "/auth/request-otp";
pub const POST_AUTH_REGISTER: &str = "/auth/register";
pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const GET_AUTH_OAUTH_LOGIN: &str = "/auth/oauth/{provider}/login";
pub const GET_AUTH_OAUTH_CALLBACK: &str = "/auth/oauth/{provider}/callback";
pub const GET_AUTH_ME: &str = "/auth/me";
