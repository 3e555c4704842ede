//! Kernel template wire format.
//!
//! Templates are MSL source with `%%`-delimited placeholders:
//!
//! ```text
//! %%FUNC_NAME%%          entry point name (name injector)
//! %%STATIC_BUFFER%%      static buffer argument (slot 0)
//! %%DYNAMIC_BUFFER%%     dynamic buffer argument (slot 1)
//! %%META_BUFFER%%        metadata buffer argument (slot 2)
//! %%LOAD_BUFFER(key)%%   load expression for a registered key
//! ```
//!
//! Text is split into pieces once; injectors resolve directives piece by
//! piece and render at the end, so text produced by one pass is never
//! scanned for another pass's syntax.

use std::fmt;

use super::kernel::BufferSlot;
use crate::error::{LowerError, Result};

const DELIM: &str = "%%";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive<'a> {
    FuncName,
    Slot(BufferSlot),
    LoadBuffer(&'a str),
}

impl fmt::Display for Directive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::FuncName => write!(f, "{DELIM}FUNC_NAME{DELIM}"),
            Directive::Slot(slot) => write!(f, "{DELIM}{}{DELIM}", slot.placeholder()),
            Directive::LoadBuffer(key) => write!(f, "{DELIM}LOAD_BUFFER({key}){DELIM}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    Directive(Directive<'a>),
}

#[derive(Clone, Debug)]
pub struct Template<'a> {
    pieces: Vec<Piece<'a>>,
}

impl<'a> Template<'a> {
    pub fn parse(text: &'a str) -> Result<Self> {
        let mut pieces = Vec::new();
        let mut rest = text;
        while let Some(open) = rest.find(DELIM) {
            if open > 0 {
                pieces.push(Piece::Text(&rest[..open]));
            }
            let after = &rest[open + DELIM.len()..];
            let close = after.find(DELIM).ok_or_else(|| LowerError::MalformedTemplate {
                reason: format!("unterminated placeholder near '{}'", preview(&rest[open..])),
            })?;
            pieces.push(Piece::Directive(parse_directive(&after[..close])?));
            rest = &after[close + DELIM.len()..];
        }
        if !rest.is_empty() {
            pieces.push(Piece::Text(rest));
        }
        Ok(Self { pieces })
    }

    pub fn pieces(&self) -> &[Piece<'a>] {
        &self.pieces
    }

    /// Keys referenced by `LOAD_BUFFER`, in first-use order.
    pub fn load_keys(&self) -> Vec<&'a str> {
        let mut keys: Vec<&'a str> = Vec::new();
        for piece in &self.pieces {
            if let Piece::Directive(Directive::LoadBuffer(key)) = piece {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
        keys
    }

    /// Render to text, resolving each directive with `resolve`.
    pub fn render<F>(&self, mut resolve: F) -> Result<String>
    where
        F: FnMut(&Directive<'a>) -> Result<String>,
    {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Directive(d) => out.push_str(&resolve(d)?),
            }
        }
        Ok(out)
    }
}

fn parse_directive(body: &str) -> Result<Directive<'_>> {
    if body == "FUNC_NAME" {
        return Ok(Directive::FuncName);
    }
    if let Some(slot) = BufferSlot::ALL.into_iter().find(|s| s.placeholder() == body) {
        return Ok(Directive::Slot(slot));
    }
    if let Some(key) = body
        .strip_prefix("LOAD_BUFFER(")
        .and_then(|b| b.strip_suffix(')'))
    {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(LowerError::MalformedTemplate {
                reason: format!("invalid LOAD_BUFFER key '{}'", key),
            });
        }
        return Ok(Directive::LoadBuffer(key));
    }
    Err(LowerError::MalformedTemplate {
        reason: format!("unknown placeholder '{DELIM}{body}{DELIM}'"),
    })
}

fn preview(s: &str) -> &str {
    match s.char_indices().nth(24) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
