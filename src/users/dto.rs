use serde::Deserialize;

/// Profile fields an admin may change. Structurally unable to carry a
/// password; password changes go through the dedicated endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_has_no_password_field() {
        // a payload smuggling a password parses, but the field is dropped
        let parsed: UpdateProfileRequest =
            serde_json::from_str(r#"{"display_name":"B","password":"sneaky"}"#).unwrap();
        assert_eq!(parsed.display_name.as_deref(), Some("B"));
    }
}
