//! Keyset pagination with opaque, restartable page tokens.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

const TOKEN_PREFIX: &str = "after:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default: i64,
    pub max: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default: 20,
            max: 100,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("invalid page token")]
    InvalidToken,
    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(i64),
}

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Absent on the last page.
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub after_rowid: Option<i64>,
    pub limit: i64,
}

impl PageRequest {
    /// Resolves the request against `limits`; oversized limits are clamped.
    pub fn cursor(&self, limits: PageLimits) -> Result<PageCursor, PaginationError> {
        let limit = match self.limit {
            Some(limit) if limit < 1 => return Err(PaginationError::InvalidLimit(limit)),
            Some(limit) => limit.min(limits.max),
            None => limits.default,
        };
        let after_rowid = self
            .page_token
            .as_deref()
            .map(decode_page_token)
            .transpose()?;
        Ok(PageCursor { after_rowid, limit })
    }
}

impl PageCursor {
    /// One extra row tells whether another page exists.
    pub fn fetch_limit(&self) -> i64 {
        self.limit + 1
    }

    /// Trims the look-ahead row and emits the token for the next page.
    pub fn into_page<T>(self, mut rows: Vec<(i64, T)>) -> Page<T> {
        let has_more = rows.len() as i64 > self.limit;
        rows.truncate(self.limit as usize);
        let next_page_token = if has_more {
            rows.last().map(|(rowid, _)| encode_page_token(*rowid))
        } else {
            None
        };
        Page {
            items: rows.into_iter().map(|(_, item)| item).collect(),
            next_page_token,
        }
    }
}

pub fn encode_page_token(rowid: i64) -> String {
    URL_SAFE_NO_PAD.encode(format!("{TOKEN_PREFIX}{rowid}"))
}

pub fn decode_page_token(token: &str) -> Result<i64, PaginationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| PaginationError::InvalidToken)?;
    let text = String::from_utf8(bytes).map_err(|_| PaginationError::InvalidToken)?;
    text.strip_prefix(TOKEN_PREFIX)
        .and_then(|rowid| rowid.parse::<i64>().ok())
        .filter(|rowid| *rowid > 0)
        .ok_or(PaginationError::InvalidToken)
}
