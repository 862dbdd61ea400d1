//! Processes character streams into tokens.
//!
//! This module provides tokenization for GEDCOM data, supporting both
//! in-memory parsing via [`Tokenizer`] and streaming parsing via
//! [`StreamTokenizer`]. Both implement the [`TokenizerTrait`] trait, so the
//! record assembler can work with either implementation.

use crate::GedcomError;
use std::io::BufRead;
use std::str::Chars;

/// The base enum of Token types making use of [GEDCOM Standard Release
/// 5.5.1](https://gedcom.io/specifications/ged551.pdf), p.11 `gedcom_line: level + delim +
/// [optional_xref_ID] + tag + [optional_line_value] + terminator`
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// The `level`, denoting the depth within the tree
    Level(u8),
    /// The `tag`, a short uppercase code that distinguishes datatypes
    Tag(Box<str>),
    /// The value of the data: `optional_line_value`
    LineValue(Box<str>),
    /// The `optional_xref_ID` used throughout the file to refer to a particular record
    Pointer(Box<str>),
    /// A user-defined tag, always begins with an underscore
    CustomTag(Box<str>),
    /// End-of-file indicator
    EOF,
    /// The initial token value, indicating nothing
    None,
}

/// Trait for GEDCOM tokenizers.
///
/// Abstracts the tokenization interface so the record assembler can fold
/// either the in-memory [`Tokenizer`] or the streaming [`StreamTokenizer`].
///
/// Every well-formed logical line produces the token sequence
/// `Level, [Pointer], Tag | CustomTag, LineValue` — the value token is
/// always present, empty when the line ends after its tag.
pub trait TokenizerTrait {
    /// Returns a reference to the current token.
    fn current_token(&self) -> &Token;

    /// Returns the current line number (1-based).
    fn line(&self) -> u32;

    /// Returns true if the tokenizer has reached the end of input.
    fn done(&self) -> bool;

    /// Advances to the next token.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if tokenization fails.
    fn next_token(&mut self) -> Result<(), GedcomError>;

    /// Takes the current token and advances to the next one.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if tokenization fails.
    fn take_token(&mut self) -> Result<Token, GedcomError>;

    /// Discards the remainder of the current physical line and positions
    /// the tokenizer at the level number of the following line. Used to
    /// recover from malformed lines without aborting the parse.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if the following line is itself malformed;
    /// callers may keep skipping.
    fn skip_line(&mut self) -> Result<(), GedcomError>;

    /// Returns a debug string with the current line number.
    fn debug(&self) -> String;
}

/// Average length estimate for GEDCOM tags (most are 4 chars)
const TAG_CAPACITY: usize = 8;

/// Average length estimate for GEDCOM values
const VALUE_CAPACITY: usize = 64;

/// Average length estimate for xref pointers
const POINTER_CAPACITY: usize = 16;

/// The tokenizer that turns GEDCOM characters into a stream of tokens.
pub struct Tokenizer<'a> {
    /// The active token type
    pub current_token: Token,
    /// Current character the tokenizer is parsing
    current_char: char,
    /// An iterator of characters of the GEDCOM file contents
    chars: Chars<'a>,
    /// The current line number of the file we are parsing
    pub line: u32,
}

impl<'a> Tokenizer<'a> {
    /// Creates a new tokenizer for a char iterator of GEDCOM file contents.
    #[must_use]
    pub fn new(chars: Chars<'a>) -> Tokenizer<'a> {
        Tokenizer {
            current_char: '\n',
            current_token: Token::None,
            chars,
            line: 0,
        }
    }

    /// Ends the tokenization
    #[inline]
    #[must_use]
    pub fn done(&self) -> bool {
        matches!(self.current_token, Token::EOF)
    }

    /// Loads the next token into state.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if tokenization fails.
    pub fn next_token(&mut self) -> Result<(), GedcomError> {
        // A line that ends right after its tag still yields an (empty)
        // value token, so every logical line has the same token shape.
        if matches!(self.current_token, Token::Tag(_) | Token::CustomTag(_))
            && (self.current_char == '\n' || self.current_char == '\r' || self.current_char == '\0')
        {
            self.current_token = Token::LineValue("".into());
            return Ok(());
        }

        if self.current_char == '\0' {
            self.current_token = Token::EOF;
            return Ok(());
        }

        // Level number is at the start of each line. The initial state
        // (current_char='\n', Token::None) stands for "start of file".
        if matches!(self.current_token, Token::None)
            || self.current_char == '\n'
            || self.current_char == '\r'
        {
            // Consume one line ending: CRLF, CR-only, or LF.
            if self.current_char == '\r' {
                self.next_char();
                if self.current_char == '\n' {
                    self.next_char();
                }
            } else if self.current_char == '\n' {
                self.next_char();
            }

            // Allow empty lines between records.
            while self.current_char == '\n' || self.current_char == '\r' {
                self.next_char();
            }

            // Allow a trailing newline at EOF (common for text files).
            if self.current_char == '\0' {
                self.current_token = Token::EOF;
                return Ok(());
            }

            self.line += 1;
            self.current_token = Token::Level(self.extract_number()?);
            return Ok(());
        }

        self.skip_whitespace();

        self.current_token = match self.current_token {
            Token::Level(_) => {
                if self.current_char == '@' {
                    Token::Pointer(self.extract_word_with_capacity(POINTER_CAPACITY))
                } else if self.current_char == '_' {
                    Token::CustomTag(self.extract_word_with_capacity(TAG_CAPACITY))
                } else {
                    Token::Tag(self.extract_word_with_capacity(TAG_CAPACITY))
                }
            }
            Token::Pointer(_) => Token::Tag(self.extract_word_with_capacity(TAG_CAPACITY)),
            Token::Tag(_) | Token::CustomTag(_) => {
                Token::LineValue(self.extract_value_with_capacity(VALUE_CAPACITY))
            }
            _ => {
                return Err(GedcomError::ParseError {
                    line: self.line,
                    message: format!("Tokenization error! {:?}", self.current_token),
                })
            }
        };
        Ok(())
    }

    /// Like `next_token`, but returns the token you are popping.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if tokenization fails.
    pub fn take_token(&mut self) -> Result<Token, GedcomError> {
        let current_token = self.current_token.clone();
        self.next_token()?;
        Ok(current_token)
    }

    /// Discards the remainder of the current physical line and parses the
    /// level number of the following one.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if the following line is itself malformed.
    pub fn skip_line(&mut self) -> Result<(), GedcomError> {
        while self.current_char != '\n' && self.current_char != '\r' && self.current_char != '\0' {
            self.next_char();
        }
        if self.current_char == '\r' {
            self.next_char();
            if self.current_char == '\n' {
                self.next_char();
            }
        } else if self.current_char == '\n' {
            self.next_char();
        }
        while self.current_char == '\n' || self.current_char == '\r' {
            self.next_char();
        }
        if self.current_char == '\0' {
            self.current_token = Token::EOF;
            return Ok(());
        }
        self.line += 1;
        self.current_token = Token::Level(self.extract_number()?);
        Ok(())
    }

    #[inline]
    fn next_char(&mut self) {
        self.current_char = self.chars.next().unwrap_or('\0');
    }

    #[inline]
    fn extract_number(&mut self) -> Result<u8, GedcomError> {
        self.skip_whitespace();

        if !self.current_char.is_ascii_digit() {
            return Err(GedcomError::ParseError {
                line: self.line,
                message: "Expected digit for level number".to_string(),
            });
        }

        // Parse an arbitrary-length digit sequence.
        let mut level: u32 = 0;
        while self.current_char.is_ascii_digit() {
            level = level
                .saturating_mul(10)
                .saturating_add((self.current_char as u8 - b'0') as u32);
            self.next_char();
        }

        level.try_into().map_err(|_| GedcomError::ParseError {
            line: self.line,
            message: format!("Level number too large: {level}"),
        })
    }

    #[inline]
    fn extract_word_with_capacity(&mut self, capacity: usize) -> Box<str> {
        let mut word = String::with_capacity(capacity);
        while !self.current_char.is_whitespace() && self.current_char != '\0' {
            word.push(self.current_char);
            self.next_char();
        }
        word.into_boxed_str()
    }

    #[inline]
    fn extract_value_with_capacity(&mut self, capacity: usize) -> Box<str> {
        let mut value = String::with_capacity(capacity);
        while self.current_char != '\n' && self.current_char != '\r' && self.current_char != '\0' {
            value.push(self.current_char);
            self.next_char();
        }
        value.into_boxed_str()
    }

    #[inline]
    fn skip_whitespace(&mut self) {
        while self.is_nonnewline_whitespace() {
            self.next_char();
        }
    }

    #[inline]
    fn is_nonnewline_whitespace(&self) -> bool {
        let c = self.current_char;
        // Check for BOM/zero-width space (U+FEFF = 65279)
        let is_zero_width_space = c as u32 == 65279_u32;
        let not_a_newline = c != '\n' && c != '\r';
        (c.is_whitespace() || is_zero_width_space) && not_a_newline
    }

    /// Debug function displaying the GEDCOM line number in error messages.
    #[must_use]
    pub fn debug(&self) -> String {
        format!("line {}:", self.line)
    }
}

impl TokenizerTrait for Tokenizer<'_> {
    #[inline]
    fn current_token(&self) -> &Token {
        &self.current_token
    }

    #[inline]
    fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    fn done(&self) -> bool {
        self.done()
    }

    #[inline]
    fn next_token(&mut self) -> Result<(), GedcomError> {
        Tokenizer::next_token(self)
    }

    #[inline]
    fn take_token(&mut self) -> Result<Token, GedcomError> {
        Tokenizer::take_token(self)
    }

    #[inline]
    fn skip_line(&mut self) -> Result<(), GedcomError> {
        Tokenizer::skip_line(self)
    }

    #[inline]
    fn debug(&self) -> String {
        Tokenizer::debug(self)
    }
}

// ============================================================================
// StreamTokenizer - Line-by-line tokenizer for streaming large files
// ============================================================================

/// Initial capacity for the line buffer
const LINE_BUFFER_CAPACITY: usize = 256;

/// A streaming tokenizer that reads GEDCOM data line-by-line from a buffered reader.
///
/// Unlike [`Tokenizer`], which requires the entire input to be in memory as
/// a string, `StreamTokenizer` reads from any [`BufRead`] source, making it
/// suitable for parsing very large files without loading them entirely into
/// memory.
///
/// # UTF-8 Requirement
///
/// The streaming tokenizer requires UTF-8 encoded input. For any other
/// encoding, decode first (see [`crate::encoding::decode`]) and use the
/// in-memory [`Tokenizer`].
pub struct StreamTokenizer<R: BufRead> {
    reader: R,
    /// Current line being processed, without its line terminator.
    line_buffer: String,
    /// Byte position within the current line.
    line_pos: usize,
    /// The active token
    current_token: Token,
    /// Current line number (1-based)
    line: u32,
    /// Whether the reader is exhausted
    eof: bool,
}

/// Coarse position within a logical line, derived from the current token.
#[derive(Clone, Copy, PartialEq)]
enum LineState {
    AtLevel,
    AfterLevel,
    AfterPointer,
    AfterTag,
    Done,
}

impl<R: BufRead> StreamTokenizer<R> {
    /// Creates a new streaming tokenizer from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if:
    /// - The input is not valid UTF-8 (UTF-16 input fails here)
    /// - An I/O error occurs while reading the first line
    pub fn new(reader: R) -> Result<Self, GedcomError> {
        let mut tokenizer = Self {
            reader,
            line_buffer: String::with_capacity(LINE_BUFFER_CAPACITY),
            line_pos: 0,
            current_token: Token::None,
            line: 0,
            eof: false,
        };

        tokenizer.read_next_line()?;

        if tokenizer.line_buffer.starts_with('\u{FEFF}') {
            tokenizer.line_pos = '\u{FEFF}'.len_utf8();
        }

        tokenizer.advance()?;
        Ok(tokenizer)
    }

    /// Reads the next line from the reader into the line buffer, stripping
    /// the terminator. Non-UTF-8 input surfaces as an encoding error.
    fn read_next_line(&mut self) -> Result<(), GedcomError> {
        self.line_buffer.clear();
        self.line_pos = 0;

        match self.reader.read_line(&mut self.line_buffer) {
            Ok(0) => {
                self.eof = true;
            }
            Ok(_) => {
                while self.line_buffer.ends_with('\n') || self.line_buffer.ends_with('\r') {
                    self.line_buffer.pop();
                }
                self.line += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(GedcomError::EncodingError(
                    "Streaming parser requires UTF-8 input".to_string(),
                ));
            }
            Err(e) => return Err(GedcomError::IoError(e)),
        }

        Ok(())
    }

    #[inline]
    fn rest(&self) -> &str {
        &self.line_buffer[self.line_pos..]
    }

    #[inline]
    fn skip_spaces(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches([' ', '\t', '\u{FEFF}']);
        self.line_pos += rest.len() - trimmed.len();
    }

    fn take_word(&mut self) -> Box<str> {
        self.skip_spaces();
        let rest = self.rest();
        let end = rest.find(|c: char| c.is_whitespace()).unwrap_or(rest.len());
        let word: Box<str> = rest[..end].into();
        self.line_pos += end;
        word
    }

    fn line_state(&self) -> LineState {
        match self.current_token {
            Token::None | Token::LineValue(_) => LineState::AtLevel,
            Token::Level(_) => LineState::AfterLevel,
            Token::Pointer(_) => LineState::AfterPointer,
            Token::Tag(_) | Token::CustomTag(_) => LineState::AfterTag,
            Token::EOF => LineState::Done,
        }
    }

    /// Advances the token state machine by one token.
    fn advance(&mut self) -> Result<(), GedcomError> {
        loop {
            if self.eof {
                self.current_token = Token::EOF;
                return Ok(());
            }

            match self.line_state() {
                LineState::AtLevel => {
                    self.skip_spaces();
                    if self.rest().is_empty() {
                        // Blank line; move on.
                        self.read_next_line()?;
                        continue;
                    }
                    let word = self.take_word();
                    match word.parse::<u8>() {
                        Ok(level) => {
                            self.current_token = Token::Level(level);
                            return Ok(());
                        }
                        Err(_) => {
                            return Err(GedcomError::ParseError {
                                line: self.line,
                                message: "Expected digit for level number".to_string(),
                            });
                        }
                    }
                }
                LineState::AfterLevel => {
                    self.skip_spaces();
                    let starts_pointer = self.rest().starts_with('@');
                    let starts_custom = self.rest().starts_with('_');
                    let word = self.take_word();
                    self.current_token = if starts_pointer {
                        Token::Pointer(word)
                    } else if starts_custom {
                        Token::CustomTag(word)
                    } else {
                        Token::Tag(word)
                    };
                    return Ok(());
                }
                LineState::AfterPointer => {
                    let word = self.take_word();
                    self.current_token = Token::Tag(word);
                    return Ok(());
                }
                LineState::AfterTag => {
                    self.skip_spaces();
                    let value: Box<str> = self.rest().into();
                    self.line_pos = self.line_buffer.len();
                    self.current_token = Token::LineValue(value);
                    self.read_next_line()?;
                    return Ok(());
                }
                LineState::Done => return Ok(()),
            }
        }
    }
}

impl<R: BufRead> TokenizerTrait for StreamTokenizer<R> {
    #[inline]
    fn current_token(&self) -> &Token {
        &self.current_token
    }

    #[inline]
    fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    fn done(&self) -> bool {
        matches!(self.current_token, Token::EOF)
    }

    fn next_token(&mut self) -> Result<(), GedcomError> {
        self.advance()
    }

    fn take_token(&mut self) -> Result<Token, GedcomError> {
        let token = self.current_token.clone();
        self.advance()?;
        Ok(token)
    }

    fn skip_line(&mut self) -> Result<(), GedcomError> {
        self.line_pos = self.line_buffer.len();
        self.read_next_line()?;
        self.current_token = Token::None;
        self.advance()
    }

    fn debug(&self) -> String {
        format!("line {}:", self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn collect_tokens<T: TokenizerTrait>(tokenizer: &mut T) -> Vec<Token> {
        let mut tokens = Vec::new();
        while !tokenizer.done() {
            tokens.push(tokenizer.take_token().unwrap());
        }
        tokens
    }

    #[test]
    fn test_tokenize_basic_line() {
        let mut tokenizer = Tokenizer::new("0 HEAD\n1 CHAR UTF-8".chars());
        tokenizer.next_token().unwrap();
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(
            tokens,
            vec![
                Token::Level(0),
                Token::Tag("HEAD".into()),
                Token::LineValue("".into()),
                Token::Level(1),
                Token::Tag("CHAR".into()),
                Token::LineValue("UTF-8".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_pointer_line() {
        let mut tokenizer = Tokenizer::new("0 @I1@ INDI\n1 NAME John /Doe/".chars());
        tokenizer.next_token().unwrap();
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(tokens[1], Token::Pointer("@I1@".into()));
        assert_eq!(tokens[2], Token::Tag("INDI".into()));
        assert_eq!(tokens[6], Token::LineValue("John /Doe/".into()));
    }

    #[test]
    fn test_tokenize_custom_tag() {
        let mut tokenizer = Tokenizer::new("0 _MYTAG some value".chars());
        tokenizer.next_token().unwrap();
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(tokens[1], Token::CustomTag("_MYTAG".into()));
        assert_eq!(tokens[2], Token::LineValue("some value".into()));
    }

    #[test]
    fn test_tokenize_crlf_and_blank_lines() {
        let mut tokenizer = Tokenizer::new("0 HEAD\r\n\r\n1 GEDC\r\n".chars());
        tokenizer.next_token().unwrap();
        let tokens = collect_tokens(&mut tokenizer);
        assert!(tokens.contains(&Token::Tag("GEDC".into())));
    }

    #[test]
    fn test_skip_line_recovers() {
        let mut tokenizer = Tokenizer::new("0 HEAD\nGARBAGE LINE\n0 TRLR".chars());
        tokenizer.next_token().unwrap();
        assert_eq!(tokenizer.current_token, Token::Level(0));
        tokenizer.next_token().unwrap(); // HEAD
        tokenizer.next_token().unwrap(); // empty value
        assert!(tokenizer.next_token().is_err()); // GARBAGE is not a level
        tokenizer.skip_line().unwrap();
        assert_eq!(tokenizer.current_token, Token::Level(0));
        tokenizer.next_token().unwrap();
        assert_eq!(tokenizer.current_token, Token::Tag("TRLR".into()));
    }

    #[test]
    fn test_interior_whitespace_preserved_in_value() {
        let mut tokenizer = Tokenizer::new("1 NOTE a  b   c".chars());
        tokenizer.next_token().unwrap();
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(tokens[2], Token::LineValue("a  b   c".into()));
    }

    #[test]
    fn test_stream_tokenizer_matches_in_memory() {
        let source = "0 HEAD\n1 GEDC\n2 VERS 5.5.1\n0 @I1@ INDI\n1 NAME John /Doe/\n0 TRLR\n";
        let mut mem = Tokenizer::new(source.chars());
        mem.next_token().unwrap();
        let mem_tokens = collect_tokens(&mut mem);

        let mut stream = StreamTokenizer::new(BufReader::new(source.as_bytes())).unwrap();
        let stream_tokens = collect_tokens(&mut stream);

        assert_eq!(mem_tokens, stream_tokens);
    }

    #[test]
    fn test_stream_tokenizer_rejects_utf16() {
        let bytes: &[u8] = &[0xFF, 0xFE, 0x30, 0x00, 0x20, 0x00];
        let result = StreamTokenizer::new(BufReader::new(bytes));
        assert!(result.is_err());
    }

    #[test]
    fn test_stream_skip_line_recovers() {
        let source = "0 HEAD\nGARBAGE LINE\n0 TRLR\n";
        let mut stream = StreamTokenizer::new(BufReader::new(source.as_bytes())).unwrap();
        assert_eq!(*stream.current_token(), Token::Level(0));
        stream.next_token().unwrap(); // HEAD
        stream.next_token().unwrap(); // empty value
        assert!(stream.next_token().is_err());
        stream.skip_line().unwrap();
        assert_eq!(*stream.current_token(), Token::Level(0));
    }

    #[test]
    fn test_line_numbers() {
        let mut tokenizer = Tokenizer::new("0 HEAD\n1 GEDC\n2 VERS 5.5.1".chars());
        tokenizer.next_token().unwrap();
        assert_eq!(tokenizer.line, 1);
        while !tokenizer.done() {
            tokenizer.next_token().unwrap();
        }
        assert_eq!(tokenizer.line, 3);
    }
}
