//! Entity selector parsing.
//!
//! A selector is either a number relative to the base repository (`23`,
//! `#23`) or a full url (`https://github.com/OWNER/NAME/issues/23`,
//! `.../pull/23`). Every selector of one invocation must land in the same
//! repository.

use crate::error::{GhiError, Result};
use crate::model::{EntityKind, Repo};
use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/]+/([^/]+)/([^/]+)/(issues|pull)/(\d+)(?:[/?#].*)?$")
        .unwrap_or_else(|err| panic!("selector url pattern is invalid: {err}"))
});

/// A parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Number in the base repository.
    Number(u64),
    /// Fully qualified url.
    Url {
        repo: Repo,
        number: u64,
        kind: EntityKind,
    },
}

/// A selector bound to its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelector {
    /// The argument as typed, for error messages.
    pub raw: String,
    pub number: u64,
}

/// Parse one selector argument.
///
/// # Errors
///
/// Returns `InvalidSelector` when the argument is neither a positive number
/// nor an issue or pull request url.
pub fn parse_selector(raw: &str) -> Result<Selector> {
    let trimmed = raw.trim();
    let numeric = trimmed.strip_prefix('#').unwrap_or(trimmed);

    if let Ok(number) = numeric.parse::<u64>() {
        if number == 0 {
            return Err(invalid(raw, "numbers start at 1"));
        }
        return Ok(Selector::Number(number));
    }

    let captures = URL_PATTERN
        .captures(trimmed)
        .ok_or_else(|| invalid(raw, "expected a number or an issue/pull request url"))?;

    let number = captures[4]
        .parse::<u64>()
        .map_err(|_| invalid(raw, "number out of range"))?;
    let kind = if &captures[3] == "pull" {
        EntityKind::PullRequest
    } else {
        EntityKind::Issue
    };

    Ok(Selector::Url {
        repo: Repo::new(&captures[1], &captures[2]),
        number,
        kind,
    })
}

/// Parse every selector and bind them to a single repository.
///
/// Numbers use `base_repo`; urls carry their own repository.
///
/// # Errors
///
/// - `InvalidSelector` for an unparsable argument
/// - `Validation` when a number is given without a base repository
/// - `MultipleRepositories` when selectors disagree on the repository
pub fn resolve_selectors(
    raw_selectors: &[String],
    base_repo: Option<&Repo>,
) -> Result<(Repo, Vec<ResolvedSelector>)> {
    let mut repo: Option<Repo> = None;
    let mut resolved = Vec::with_capacity(raw_selectors.len());

    for raw in raw_selectors {
        let (selector_repo, number) = match parse_selector(raw)? {
            Selector::Number(number) => {
                let base = base_repo.ok_or_else(|| {
                    GhiError::validation(
                        "repo",
                        "no base repository; pass --repo OWNER/NAME or set GH_REPO",
                    )
                })?;
                (base.clone(), number)
            }
            Selector::Url {
                repo: url_repo,
                number,
                ..
            } => (url_repo, number),
        };

        match &repo {
            Some(existing) if !existing.same_as(&selector_repo) => {
                return Err(GhiError::MultipleRepositories {
                    first: existing.full_name(),
                    second: selector_repo.full_name(),
                });
            }
            Some(_) => {}
            None => repo = Some(selector_repo),
        }

        resolved.push(ResolvedSelector {
            raw: raw.clone(),
            number,
        });
    }

    let repo = repo.ok_or_else(|| GhiError::validation("selectors", "at least one is required"))?;
    Ok((repo, resolved))
}

fn invalid(raw: &str, reason: &str) -> GhiError {
    GhiError::InvalidSelector {
        selector: raw.to_string(),
        reason: reason.to_string(),
    }
}
