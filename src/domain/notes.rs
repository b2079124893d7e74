//! Free-text context notes: normalization, content hashing, and the
//! keyword/name heuristics behind hard overrides.
//!
//! Name matching is a heuristic classifier, not a parser. A player matches
//! when the normalized notes contain the full name, or any name token longer
//! than two characters. Common short tokens can mismatch; the composer's
//! tests pin the negative case (an uninvolved player is never zeroed).

use sha2::{Digest, Sha256};

/// Phrases indicating a player is not playing
const OUT_PHRASES: &[&str] = &[
    "is out",
    "ruled out",
    "out tonight",
    "out for",
    "inactive",
    "dnp",
    "will not play",
    "not playing",
    "sidelined",
    "scratched",
];

/// Tokens indicating some form of usage restriction; these only lower
/// baseline confidence, they never zero a line
const RESTRICTION_TOKENS: &[&str] = &[
    "limit",
    "limited",
    "restriction",
    "restricted",
    "cap",
    "capped",
    "questionable",
    "doubtful",
    "ramp",
];

const LIMIT_TOKENS: &[&str] = &["limit", "limited", "cap", "capped", "restriction", "restricted"];
const MINUTE_TOKENS: &[&str] = &["minute", "minutes", "min", "mins"];

/// Raw user notes plus their normalized form. The normalized form (trimmed,
/// whitespace-collapsed, lowercased) is used for hashing and keyword scans
/// only and is never shown to callers.
#[derive(Debug, Clone)]
pub struct ContextNotes {
    raw: String,
    normalized: String,
    tokens: Vec<String>,
}

impl ContextNotes {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let tokens = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();
        Self {
            raw,
            normalized,
            tokens,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// SHA-256 hex digest of the normalized text. Cache keys use this, so
    /// rewordings of equivalent notes produce distinct entries.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.normalized.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the notes carry any restriction-indicating keyword
    pub fn mentions_restriction(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| RESTRICTION_TOKENS.contains(&t.as_str()))
    }

    /// Full-name substring match, or any name-part token of length > 2
    pub fn mentions_player(&self, player_name: &str) -> bool {
        let name = player_name.trim().to_lowercase();
        if name.is_empty() || self.normalized.is_empty() {
            return false;
        }
        if self.normalized.contains(&name) {
            return true;
        }
        name.split_whitespace()
            .filter(|part| part.len() > 2)
            .any(|part| self.tokens.iter().any(|t| t == part))
    }

    /// Whether any out/inactive phrase appears anywhere in the notes
    pub fn has_out_phrase(&self) -> bool {
        OUT_PHRASES.iter().any(|p| {
            if p.contains(' ') {
                self.normalized.contains(p)
            } else {
                self.tokens.iter().any(|t| t == p)
            }
        })
    }

    /// Whether the notes declare this player out. Requires both an out
    /// phrase and a name match; an out phrase with no matching name never
    /// zeroes anyone.
    pub fn declares_out(&self, player_name: &str) -> bool {
        self.has_out_phrase() && self.mentions_player(player_name)
    }

    /// Explicit numeric minutes limit for this player, if one is phrased in
    /// the notes. Looks for a number near both a minutes token and a
    /// limit/cap/restriction token, gated on a name match.
    pub fn minutes_limit_for(&self, player_name: &str) -> Option<u32> {
        if !self.mentions_player(player_name) {
            return None;
        }
        for (i, tok) in self.tokens.iter().enumerate() {
            if !LIMIT_TOKENS.contains(&tok.as_str()) {
                continue;
            }
            let lo = i.saturating_sub(4);
            let hi = (i + 5).min(self.tokens.len());
            let window = &self.tokens[lo..hi];
            if !window
                .iter()
                .any(|t| MINUTE_TOKENS.contains(&t.as_str()))
            {
                continue;
            }
            if let Some(n) = window.iter().find_map(|t| t.parse::<u32>().ok()) {
                if n <= 48 {
                    return Some(n);
                }
            }
        }
        None
    }
}
