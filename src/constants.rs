#[derive(Copy, Clone, Debug)]
pub enum Urls {
    Auth,
    Callback,
}
impl Urls {
    pub fn as_str(&self) -> &str {
        match self {
            Urls::Auth => "/auth",
            Urls::Callback => "/callback",
        }
    }
}

impl AsRef<str> for Urls {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

pub const DEFAULT_OAUTH_HOST: &str = "https://github.com";
pub const OAUTH_AUTHORIZE_PATH: &str = "/login/oauth/authorize";
pub const OAUTH_TOKEN_PATH: &str = "/login/oauth/access_token";
pub const OAUTH_SCOPES: &str = "repo,user";

/// Provider name the CMS expects in both handshake messages
pub const OAUTH_PROVIDER: &str = "github";

/// Body of every response that isn't `/auth` or `/callback`
pub const SERVICE_BANNER: &str = "Decap CMS OAuth Provider";

/// Session key holding the `state` issued by `/auth` when verification is on
pub const OAUTH_STATE_KEY: &str = "oauth_state";

/// Headers attached to everything except the `/auth` redirect
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, OPTIONS"),
    ("access-control-allow-headers", "Content-Type"),
];
