//! Decides which alerts describe a publishable service disruption.

use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;

use crate::gtfs_rt::Alert;
use crate::localize::localize;

static BUSES_REPLACE_TRAINS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)buses replace trains between (.+?) and (.+?)").unwrap());
static MAY_AFFECT_TRAVEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)may affect how you travel").unwrap());

const BUSES_REPLACE: &str = "buses replace";
const MODIFIED_SERVICE: &str = "MODIFIED_SERVICE";

/// A pluggable relevance test applied to every alert in the feed.
pub trait RelevanceClassifier: Send + Sync {
    /// `locale` selects the translation used by text-based rules.
    fn is_relevant(&self, alert: &Alert, locale: &str) -> bool;
}

/// The built-in relevance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RelevanceRule {
    /// Header reads "buses replace trains between X and Y" or
    /// "may affect how you travel".
    #[default]
    HeaderPattern,
    /// Header contains "buses replace".
    Substring,
    /// Effect code is `MODIFIED_SERVICE`.
    Effect,
}

impl RelevanceClassifier for RelevanceRule {
    fn is_relevant(&self, alert: &Alert, locale: &str) -> bool {
        match self {
            RelevanceRule::HeaderPattern => {
                localize(alert.header_text.as_ref(), locale).is_some_and(|header| {
                    BUSES_REPLACE_TRAINS_REGEX.is_match(header)
                        || MAY_AFFECT_TRAVEL_REGEX.is_match(header)
                })
            }
            RelevanceRule::Substring => localize(alert.header_text.as_ref(), locale)
                .is_some_and(|header| header.to_lowercase().contains(BUSES_REPLACE)),
            RelevanceRule::Effect => alert.effect.as_deref() == Some(MODIFIED_SERVICE),
        }
    }
}
