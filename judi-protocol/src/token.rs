//! Tokenizer adapter and key hashing
//!
//! Incoming objects are split into a flat array of [`Token`]s by a minimal
//! JSON tokenizer. Each token records where its text lives in the frame,
//! how many children it has and which token it belongs to. A key's value is
//! a child of the key, so `{"message_id":5}` becomes:
//!
//! ```text
//! 0: Object     parent None
//! 1: String     parent 0     "message_id"
//! 2: Primitive  parent 1     5
//! ```
//!
//! After tokenizing, every string token gets a hash of its text so fields
//! can be located by comparing integers. Non-string tokens keep their kind
//! code as their hash. String hashes always have the top bit set, so the two
//! ranges never collide.
//!
//! Lookups are a linear scan of at most [`MAX_TOKENS`] entries per query.

use heapless::Vec;

/// Maximum tokens kept per object; the rest are dropped
pub const MAX_TOKENS: usize = 64;

/// Marks a string hash, keeping it clear of the kind codes
const STRING_HASH_FLAG: u32 = 0x8000_0000;

/// FNV-1a parameters
const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// End offset of a container that has not been closed yet
const UNCLOSED: usize = usize::MAX;

/// Hash of a field name, as stored on string tokens
///
/// `const` so well-known keys can be hashed at compile time.
pub const fn hash_key(key: &str) -> u32 {
    let bytes = key.as_bytes();
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash | STRING_HASH_FLAG
}

/// Token type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TokenKind {
    Undefined = 0,
    Object = 1,
    Array = 2,
    String = 3,
    Primitive = 4,
}

impl TokenKind {
    /// Objects and arrays
    pub const fn is_container(self) -> bool {
        matches!(self, TokenKind::Object | TokenKind::Array)
    }
}

/// One token of an incoming object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Token {
    /// Token type
    pub kind: TokenKind,
    /// Byte offset of the first character (after the quote for strings)
    pub start: usize,
    /// Byte offset one past the last character (before the quote for strings)
    pub end: usize,
    /// Number of direct children
    pub size: usize,
    /// Index of the owning token, `None` for the root
    pub parent: Option<usize>,
    /// Text hash for strings, kind code otherwise
    pub hash: u32,
}

impl Token {
    /// Create a token with no children
    pub const fn new(kind: TokenKind, start: usize, end: usize, parent: Option<usize>) -> Self {
        Self {
            kind,
            start,
            end,
            size: 0,
            parent,
            hash: kind as u32,
        }
    }

    /// Create a container whose end is not known yet
    pub const fn open(kind: TokenKind, start: usize, parent: Option<usize>) -> Self {
        Self::new(kind, start, UNCLOSED, parent)
    }

    /// Container still waiting for its closing bracket
    pub const fn is_unclosed(&self) -> bool {
        self.end == UNCLOSED
    }

    /// The token's text within `source`
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Tokenizer failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TokenizeError {
    /// Mismatched bracket or stray character
    Invalid,
    /// Text ended inside a string or container
    Partial,
    /// More tokens than the output can hold
    TooManyTokens,
}

/// Text-to-token parser
///
/// Implementations fill `tokens` in document order with `kind`, `start`,
/// `end`, `size` and `parent` set. Hashes are the adapter's job.
pub trait Tokenizer {
    /// Tokenize `text`, replacing the contents of `tokens`
    ///
    /// On [`TokenizeError::TooManyTokens`] the tokens produced so far must
    /// be left in place.
    fn tokenize(
        &mut self,
        text: &[u8],
        tokens: &mut Vec<Token, MAX_TOKENS>,
    ) -> Result<(), TokenizeError>;
}

/// Minimal non-validating tokenizer
///
/// Accepts any bare word as a primitive and does not check escapes beyond
/// skipping the escaped character.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTokenizer;

impl FlatTokenizer {
    /// Create a tokenizer
    pub const fn new() -> Self {
        Self
    }
}

impl Tokenizer for FlatTokenizer {
    fn tokenize(
        &mut self,
        text: &[u8],
        tokens: &mut Vec<Token, MAX_TOKENS>,
    ) -> Result<(), TokenizeError> {
        tokens.clear();

        // Token that new tokens attach to
        let mut owner: Option<usize> = None;
        let mut pos = 0;

        while pos < text.len() {
            match text[pos] {
                c @ (b'{' | b'[') => {
                    let kind = if c == b'{' {
                        TokenKind::Object
                    } else {
                        TokenKind::Array
                    };
                    owner = Some(attach(tokens, Token::open(kind, pos, owner))?);
                }
                c @ (b'}' | b']') => {
                    let kind = if c == b'}' {
                        TokenKind::Object
                    } else {
                        TokenKind::Array
                    };
                    owner = close(tokens, kind, pos)?;
                }
                b'"' => {
                    let end = scan_string(text, pos + 1)?;
                    attach(tokens, Token::new(TokenKind::String, pos + 1, end, owner))?;
                    pos = end;
                }
                b':' => owner = tokens.len().checked_sub(1),
                b',' => {
                    if let Some(index) = owner {
                        if !tokens[index].kind.is_container() {
                            owner = tokens[index].parent;
                        }
                    }
                }
                b'\t' | b'\r' | b'\n' | b' ' => {}
                _ => {
                    let end = scan_primitive(text, pos)?;
                    attach(tokens, Token::new(TokenKind::Primitive, pos, end, owner))?;
                    pos = end - 1;
                }
            }
            pos += 1;
        }

        if tokens.iter().any(Token::is_unclosed) {
            return Err(TokenizeError::Partial);
        }
        Ok(())
    }
}

/// Store a token and count it as a child of its parent
fn attach(tokens: &mut Vec<Token, MAX_TOKENS>, token: Token) -> Result<usize, TokenizeError> {
    let parent = token.parent;
    tokens
        .push(token)
        .map_err(|_| TokenizeError::TooManyTokens)?;
    if let Some(parent) = parent {
        tokens[parent].size += 1;
    }
    Ok(tokens.len() - 1)
}

/// Close the innermost open container, returning its owner
fn close(
    tokens: &mut Vec<Token, MAX_TOKENS>,
    kind: TokenKind,
    pos: usize,
) -> Result<Option<usize>, TokenizeError> {
    let mut index = tokens.len().checked_sub(1).ok_or(TokenizeError::Invalid)?;
    loop {
        let token = &mut tokens[index];
        if token.is_unclosed() {
            if token.kind != kind {
                return Err(TokenizeError::Invalid);
            }
            token.end = pos + 1;
            return Ok(token.parent);
        }
        index = token.parent.ok_or(TokenizeError::Invalid)?;
    }
}

/// Find the closing quote of a string starting at `start`
fn scan_string(text: &[u8], start: usize) -> Result<usize, TokenizeError> {
    let mut pos = start;
    while pos < text.len() {
        match text[pos] {
            b'"' => return Ok(pos),
            b'\\' => pos += 2,
            _ => pos += 1,
        }
    }
    Err(TokenizeError::Partial)
}

/// Find the end of a bare word starting at `start`
fn scan_primitive(text: &[u8], start: usize) -> Result<usize, TokenizeError> {
    let mut pos = start;
    while pos < text.len() {
        match text[pos] {
            b'\t' | b'\r' | b'\n' | b' ' | b',' | b']' | b'}' | b':' => break,
            c if c < 32 || c >= 127 => return Err(TokenizeError::Invalid),
            _ => pos += 1,
        }
    }
    Ok(pos)
}

/// Tokens of the object currently being dispatched
#[derive(Debug, Clone, Default)]
pub struct TokenBuffer {
    tokens: Vec<Token, MAX_TOKENS>,
    truncated: bool,
    error: Option<TokenizeError>,
}

impl TokenBuffer {
    /// Create an empty token buffer
    pub const fn new() -> Self {
        Self {
            tokens: Vec::new(),
            truncated: false,
            error: None,
        }
    }

    /// Drop all tokens
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.truncated = false;
        self.error = None;
    }

    /// Tokenize `text` and hash every string token
    ///
    /// Running out of token space is not an error: the tokens that fit are
    /// kept, containers cut short end at the end of the text, and
    /// [`is_truncated`](Self::is_truncated) reports it.
    pub fn parse<T: Tokenizer + ?Sized>(
        &mut self,
        tokenizer: &mut T,
        text: &str,
    ) -> Result<usize, TokenizeError> {
        self.clear();

        match tokenizer.tokenize(text.as_bytes(), &mut self.tokens) {
            Ok(()) => {}
            Err(TokenizeError::TooManyTokens) => {
                warn!("token limit reached, object truncated at {} tokens", MAX_TOKENS);
                self.truncated = true;
                for token in self.tokens.iter_mut().filter(|t| t.is_unclosed()) {
                    token.end = text.len();
                }
            }
            Err(e) => {
                self.tokens.clear();
                self.error = Some(e);
                return Err(e);
            }
        }

        for token in self.tokens.iter_mut() {
            token.hash = match token.kind {
                TokenKind::String => hash_key(token.text(text)),
                kind => kind as u32,
            };
        }

        Ok(self.tokens.len())
    }

    /// Index of the first token under `parent` whose hash matches
    pub fn find_key(&self, parent: usize, hash: u32) -> Option<usize> {
        self.tokens
            .iter()
            .position(|t| t.parent == Some(parent) && t.hash == hash)
    }

    /// Token at `index`
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// All tokens in document order
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if there are no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens were dropped for lack of space
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Failure from the last parse, if any
    pub fn error(&self) -> Option<TokenizeError> {
        self.error
    }
}
