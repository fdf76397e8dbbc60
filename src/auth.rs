use std::fmt;

/// Credentials sent as query parameters on every Enphase API request.
#[derive(Clone)]
pub struct ApiCredentials {
    key: String,
    user_id: String,
}

impl ApiCredentials {
    pub fn new(key: String, user_id: String) -> Self {
        Self { key, user_id }
    }

    pub fn query_params(&self) -> [(&'static str, &str); 2] {
        [("key", self.key.as_str()), ("user_id", self.user_id.as_str())]
    }
}

// Config is logged at startup, keep the API key out of it
impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}
