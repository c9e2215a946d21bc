//! Read access to a dispatched object
//!
//! A [`Message`] pairs a completed frame with its tokens. It is only valid
//! during dispatch: the frame it borrows is reused once the next object
//! after it completes.

use crate::frame::FrameBuffer;
use crate::token::{Token, TokenBuffer, TokenKind};

/// Index of the top-level object in the token array
pub const ROOT_OBJECT: usize = 0;

/// A complete incoming object
#[derive(Debug, Clone, Copy)]
pub struct Message<'m> {
    frame: &'m FrameBuffer,
    tokens: &'m TokenBuffer,
}

impl<'m> Message<'m> {
    /// Pair a frame with the tokens parsed from it
    pub fn new(frame: &'m FrameBuffer, tokens: &'m TokenBuffer) -> Self {
        Self { frame, tokens }
    }

    /// The frame the object arrived in
    pub fn frame(&self) -> &'m FrameBuffer {
        self.frame
    }

    /// Raw object text
    pub fn text(&self) -> &'m str {
        self.frame.as_str()
    }

    /// Parsed tokens
    pub fn tokens(&self) -> &'m TokenBuffer {
        self.tokens
    }

    /// Text of the token at `index`
    pub fn token_text(&self, index: usize) -> Option<&'m str> {
        self.tokens.get(index).map(|t| t.text(self.text()))
    }

    /// Index of the key with the given hash directly under `parent`
    pub fn find_key(&self, parent: usize, hash: u32) -> Option<usize> {
        self.tokens.find_key(parent, hash)
    }

    /// Index of the first key directly under the object at `parent`
    pub fn first_key(&self, parent: usize) -> Option<usize> {
        if !self.is_object(parent) {
            return None;
        }
        self.tokens
            .as_slice()
            .iter()
            .skip(parent + 1)
            .position(|t| t.parent == Some(parent))
            .map(|offset| parent + 1 + offset)
    }

    /// Index of the value belonging to the key at `key`
    pub fn value_of(&self, key: usize) -> Option<usize> {
        let value = key + 1;
        match self.tokens.get(value) {
            Some(Token {
                parent: Some(owner),
                ..
            }) if *owner == key => Some(value),
            _ => None,
        }
    }

    /// Index of the value stored under a key
    pub fn get(&self, parent: usize, hash: u32) -> Option<usize> {
        self.value_of(self.find_key(parent, hash)?)
    }

    /// Text of the value stored under a key
    pub fn get_str(&self, parent: usize, hash: u32) -> Option<&'m str> {
        self.token_text(self.get(parent, hash)?)
    }

    /// Value stored under a key, read as an unsigned integer
    ///
    /// Accepts both `5` and `"5"`.
    pub fn get_u32(&self, parent: usize, hash: u32) -> Option<u32> {
        self.get_str(parent, hash)?.parse().ok()
    }

    /// Check if the value at `index` is an object
    pub fn is_object(&self, index: usize) -> bool {
        matches!(self.tokens.get(index), Some(t) if t.kind == TokenKind::Object)
    }
}
