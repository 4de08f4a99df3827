//! Credential validator: recognizes supported host credential formats and
//! carries them into Git invocations without ever logging them.

use base64::Engine;

use crate::error::Error;
use crate::types::{Credential, CredentialFamily};

/// Validates `token`'s textual form against the GitHub-family regexes:
///
/// - `gh[pousr]_` followed by 36 alphanumeric characters
/// - `github_pat_` followed by 22 characters, `_`, then 59 characters
pub fn validate(token: &str) -> Result<Credential, Error> {
    if is_classic_pat(token) || is_fine_grained_pat(token) {
        return Ok(Credential {
            token: token.to_string(),
            family: CredentialFamily::GitHub,
        });
    }
    Err(Error::InvalidInput("invalid GitHub token format".to_string()))
}

fn is_classic_pat(token: &str) -> bool {
    let Some(rest) = ["ghp_", "gho_", "ghu_", "ghs_", "ghr_"]
        .iter()
        .find_map(|prefix| token.strip_prefix(prefix))
    else {
        return false;
    };
    rest.len() == 36 && rest.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_fine_grained_pat(token: &str) -> bool {
    let Some(rest) = token.strip_prefix("github_pat_") else {
        return false;
    };
    let Some((head, tail)) = rest.split_once('_') else {
        return false;
    };
    head.len() == 22
        && tail.len() == 59
        && head.chars().all(|c| c.is_ascii_alphanumeric())
        && tail.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Resolves the credential to use for a clone: an explicit option wins, else
/// the `GITHUB_TOKEN` environment variable, else no credential.
pub fn resolve_token(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .filter(|t| !t.is_empty())
}

/// `true` iff `cred`'s family matches `host` — a token for a foreign host
/// family is silently ignored rather than attached.
pub fn applies_to_host(cred: &Credential, host: &str) -> bool {
    match cred.family {
        CredentialFamily::GitHub => host.eq_ignore_ascii_case("github.com"),
    }
}

/// Builds the `http.<host>/.extraheader` git config value that attaches
/// `cred` as a Basic-auth header to a single invocation.
pub fn extraheader_config(host: &str, cred: &Credential) -> String {
    let basic = base64::engine::general_purpose::STANDARD
        .encode(format!("x-oauth-basic:{}", cred.token));
    format!("http.https://{host}/.extraheader=Authorization: Basic {basic}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_classic_pat() {
        let tok = format!("ghp_{}", "a".repeat(36));
        assert!(validate(&tok).is_ok());
    }

    #[test]
    fn accepts_all_classic_prefixes() {
        for prefix in ["ghp_", "gho_", "ghu_", "ghs_", "ghr_"] {
            let tok = format!("{prefix}{}", "A1".repeat(18));
            assert!(validate(&tok).is_ok(), "{prefix} should validate");
        }
    }

    #[test]
    fn accepts_fine_grained_pat() {
        let tok = format!("github_pat_{}_{}", "a".repeat(22), "b".repeat(59));
        assert!(validate(&tok).is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        let tok = format!("ghp_{}", "a".repeat(35));
        assert!(validate(&tok).is_err());
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(validate("not_a_token").is_err());
    }

    #[test]
    fn resolve_token_prefers_explicit() {
        std::env::set_var("GITHUB_TOKEN", "env-token");
        assert_eq!(resolve_token(Some("explicit")), Some("explicit".to_string()));
        std::env::remove_var("GITHUB_TOKEN");
    }

    #[test]
    fn applies_to_host_matches_github_only() {
        let cred = Credential {
            token: "x".to_string(),
            family: CredentialFamily::GitHub,
        };
        assert!(applies_to_host(&cred, "github.com"));
        assert!(!applies_to_host(&cred, "gitlab.com"));
    }

    #[test]
    fn extraheader_config_contains_basic_auth() {
        let cred = Credential {
            token: "secret".to_string(),
            family: CredentialFamily::GitHub,
        };
        let header = extraheader_config("github.com", &cred);
        assert!(header.starts_with("http.https://github.com/.extraheader=Authorization: Basic "));
        assert!(!header.contains("secret"));
    }
}
