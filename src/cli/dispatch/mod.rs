use crate::cli::actions::{
    shell::{Args, Backend},
    Action,
};
use crate::cli::commands::backend::{ARG_API_KEY, ARG_API_URL, ARG_OFFLINE};
use anyhow::{Context, Result};
use secrecy::SecretString;
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or the API URL is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if matches.get_flag(ARG_OFFLINE) {
        return Ok(Action::Shell(Args {
            backend: Backend::Offline,
        }));
    }

    let api_url = matches
        .get_one::<String>(ARG_API_URL)
        .context("missing required argument: --api-url")?;
    let api_url = Url::parse(api_url).context("invalid CYBERLEARN_API_URL")?;
    if !matches!(api_url.scheme(), "http" | "https") {
        anyhow::bail!("invalid CYBERLEARN_API_URL: expected an http(s) URL");
    }

    let api_key = matches
        .get_one::<String>(ARG_API_KEY)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --api-key")?;

    Ok(Action::Shell(Args {
        backend: Backend::Remote { api_url, api_key },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    fn dispatch(args: &[&str]) -> Result<Action> {
        temp_env::with_vars(
            [
                ("CYBERLEARN_API_URL", None::<&str>),
                ("CYBERLEARN_API_KEY", None),
                ("CYBERLEARN_OFFLINE", None),
            ],
            || handler(&commands::new().get_matches_from(args.iter().copied())),
        )
    }

    #[test]
    fn test_offline() {
        let action = dispatch(&["cyberlearn", "--offline"]).expect("action");
        let Action::Shell(args) = action;
        assert!(matches!(args.backend, Backend::Offline));
    }

    #[test]
    fn test_remote() {
        let action = dispatch(&[
            "cyberlearn",
            "--api-url",
            "https://project.example.co",
            "--api-key",
            "anon-key",
        ])
        .expect("action");
        let Action::Shell(args) = action;
        match args.backend {
            Backend::Remote { api_url, api_key } => {
                assert_eq!(api_url.as_str(), "https://project.example.co/");
                assert_eq!(api_key.expose_secret(), "anon-key");
            }
            Backend::Offline => panic!("expected remote backend"),
        }
    }

    #[test]
    fn test_invalid_url() {
        let err = dispatch(&["cyberlearn", "--api-url", "not a url", "--api-key", "k"])
            .expect_err("invalid url");
        assert!(err.to_string().contains("CYBERLEARN_API_URL"));

        let err = dispatch(&["cyberlearn", "--api-url", "ftp://x.example.co", "--api-key", "k"])
            .expect_err("wrong scheme");
        assert!(err.to_string().contains("http(s)"));
    }
}
