use crate::error::Result;
use crate::resolver::LineageResolver;
use fct_model::{Batch, Vessel};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

static NON_TOKEN_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{Nd}\p{Ll}\p{Lu}\p{Pd}]+").expect("token pattern is valid")
});

static NON_ASCII_PRINTABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\x20-\x7E]+").expect("ascii pattern is valid"));

/// Prefix given to batch tokens typed as a bare number.
pub const BATCH_PREFIX: &str = "LCSET-";

/// Splits free text into upper-case barcode/batch tokens, dropping repeats.
///
/// Anything but letters, decimal digits and dashes separates tokens; the
/// non-ASCII characters left inside a token are then dropped.
pub fn split_tokens(input: &str) -> Vec<String> {
    let separated = NON_TOKEN_CHARS.replace_all(input, " ");
    let cleaned = NON_ASCII_PRINTABLE.replace_all(&separated, "");
    let mut seen = BTreeSet::new();
    cleaned
        .split_whitespace()
        .map(str::to_ascii_uppercase)
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

/// Batch name a token stands for.
pub fn batch_name_for_token(token: &str) -> String {
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{BATCH_PREFIX}{token}")
    } else {
        token.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenError {
    pub token: String,
    pub message: String,
}

/// Tokens sorted into tubes and batches, plus the ones that matched neither.
#[derive(Debug, Clone, Default)]
pub struct ParsedTokens {
    pub tubes: Vec<Vessel>,
    pub batches: Vec<Batch>,
    pub errors: Vec<TokenError>,
}

impl ParsedTokens {
    pub fn is_empty(&self) -> bool {
        self.tubes.is_empty() && self.batches.is_empty()
    }
}

impl LineageResolver<'_> {
    /// Looks each token up as a tube barcode first, then as a batch.
    pub fn parse_tokens(&mut self, input: &str) -> Result<ParsedTokens> {
        let mut parsed = ParsedTokens::default();
        for token in split_tokens(input) {
            if let Some(vessel) = self.store().find_vessel(&token)? {
                parsed.tubes.push(vessel);
                continue;
            }

            let batch_name = batch_name_for_token(&token);
            match self.find_batch(&batch_name)? {
                Some(batch) => parsed.batches.push(batch),
                None => {
                    log::debug!("Token {token} matched no tube or batch");
                    parsed.errors.push(TokenError {
                        message: format!(
                            "Could not find barcode for {token} nor lcset for {batch_name}"
                        ),
                        token,
                    });
                }
            }
        }
        Ok(parsed)
    }
}
