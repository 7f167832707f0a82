//! Operator code filters
//!
//! A filter is a fixed 0..=999 membership table built from a comma-separated
//! list of MCC or MNC codes. An empty list, or a list with no usable code,
//! yields a wildcard filter that accepts every code.

use crate::constants::ingest::CODE_DOMAIN;

/// Membership table for MCC/MNC codes
#[derive(Clone)]
pub struct CodeFilter {
    table: [bool; CODE_DOMAIN],
    restrictive: bool,
}

impl CodeFilter {
    /// Filter that accepts every code in the domain
    pub fn accept_all() -> Self {
        Self {
            table: [true; CODE_DOMAIN],
            restrictive: false,
        }
    }

    /// Build a filter from a comma-separated code list
    ///
    /// Tokens that do not parse as integers, or fall outside 0..=999, are
    /// skipped. If nothing usable remains the result is [`CodeFilter::accept_all`],
    /// so a bad setting never silently drops every record. Never fails.
    pub fn parse(codes: &str) -> Self {
        if codes.is_empty() {
            return Self::accept_all();
        }

        let mut table = [false; CODE_DOMAIN];
        let mut enabled = 0usize;

        for token in codes.split(',') {
            let Ok(code) = token.trim().parse::<i64>() else {
                continue;
            };
            if let Some(slot) = usize::try_from(code).ok().and_then(|i| table.get_mut(i)) {
                *slot = true;
                enabled += 1;
            }
        }

        if enabled == 0 {
            return Self::accept_all();
        }

        Self {
            table,
            restrictive: true,
        }
    }

    /// Whether the filter rejects at least one code
    pub fn is_restrictive(&self) -> bool {
        self.restrictive
    }

    /// Whether `code` is inside the domain and enabled
    pub fn accepts(&self, code: i64) -> bool {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.table.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// Enabled codes in ascending order
    pub fn enabled_codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.table
            .iter()
            .enumerate()
            .filter(|(_, enabled)| **enabled)
            .map(|(code, _)| code as u16)
    }
}

impl std::fmt::Debug for CodeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.restrictive {
            f.debug_set().entries(self.enabled_codes()).finish()
        } else {
            f.write_str("CodeFilter(*)")
        }
    }
}
