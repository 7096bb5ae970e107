use serde::{Deserialize, Serialize};

/// Caller identity as reported by `GET /auth/me`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
}

impl UserProfile {
    /// Email is best effort: a directory lookup wins over the token claim,
    /// and an unknown email is reported as an empty string.
    pub fn best_effort(id: &str, looked_up: Option<String>, claimed: Option<&str>) -> Self {
        let email = looked_up
            .filter(|e| !e.is_empty())
            .or_else(|| claimed.map(str::to_string))
            .unwrap_or_default();
        UserProfile {
            id: id.to_string(),
            email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("dir@example.com"), Some("claim@example.com"), "dir@example.com")]
    #[case(None, Some("claim@example.com"), "claim@example.com")]
    #[case(Some(""), Some("claim@example.com"), "claim@example.com")]
    #[case(None, None, "")]
    fn picks_best_email(
        #[case] looked_up: Option<&str>,
        #[case] claimed: Option<&str>,
        #[case] expected: &str,
    ) {
        let profile = UserProfile::best_effort("u-1", looked_up.map(str::to_string), claimed);
        assert_eq!(profile.id, "u-1");
        assert_eq!(profile.email, expected);
    }
}
