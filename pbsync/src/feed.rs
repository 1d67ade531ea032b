//! Phonebook feed parsing
//!
//! The feed is a JSON array of contact objects. [`parse_contacts`] walks it
//! lazily, one element at a time, over a non-seekable byte stream: array
//! punctuation is consumed by hand and each element is handed to serde_json
//! for deserialization, so the whole document never has to sit in memory at
//! once. The stream is single-pass and fuses after the first error.

use serde::Deserialize;
use std::io::{self, Read};
use thiserror::Error;

/// Feed parse errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// The document root is not a JSON array
    #[error("Feed does not open with a JSON array")]
    NotAnArray,

    /// The stream ended inside the array or inside an element
    #[error("Feed ended mid-structure")]
    Truncated,

    /// Unexpected byte where ',' or ']' was required
    #[error("Expected ',' or ']' in feed, found {found:?}")]
    BadDelimiter { found: char },

    /// An element could not be read as a contact object
    #[error("Contact {index} is malformed: {source}")]
    BadContact {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// I/O failure on the underlying stream
    #[error("Failed to read feed: {0}")]
    Io(#[from] io::Error),
}

/// One phonebook entry, as parsed from the feed
///
/// Every field is optional in the feed; absent keys keep their defaults and
/// unrecognized keys are ignored (forward compatible).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Contact {
    /// Phone number
    pub extension: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Numeric phone category code from the feed (0 if absent)
    #[serde(default)]
    pub phone_type: i64,
    pub location: Option<String>,
}

/// Parse a feed document into a lazy sequence of contacts
///
/// The returned iterator is single-pass and consumable once. It yields
/// contacts in feed order until the closing `]`, or a single error after
/// which iteration stops.
pub fn parse_contacts<R: Read>(reader: R) -> ContactStream<R> {
    ContactStream {
        reader,
        index: 0,
        state: StreamState::Start,
    }
}

/// Lazy iterator over feed contacts
pub struct ContactStream<R: Read> {
    reader: R,
    index: usize,
    state: StreamState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Start,
    InArray,
    Done,
}

impl<R: Read> ContactStream<R> {
    /// Consume the opening `[` and the first element (or `]`)
    fn first(&mut self) -> Result<Option<Contact>, FeedError> {
        match read_skipping_ws(&mut self.reader)? {
            None => Err(FeedError::Truncated),
            Some(b'[') => {
                self.state = StreamState::InArray;
                match read_skipping_ws(&mut self.reader)? {
                    None => Err(FeedError::Truncated),
                    Some(b']') => Ok(None),
                    Some(byte) => self.element(byte).map(Some),
                }
            }
            Some(_) => Err(FeedError::NotAnArray),
        }
    }

    /// Consume a `,`-prefixed element or the closing `]`
    fn subsequent(&mut self) -> Result<Option<Contact>, FeedError> {
        match read_skipping_ws(&mut self.reader)? {
            None => Err(FeedError::Truncated),
            Some(b']') => Ok(None),
            Some(b',') => match read_skipping_ws(&mut self.reader)? {
                None => Err(FeedError::Truncated),
                Some(byte) => self.element(byte).map(Some),
            },
            Some(found) => Err(FeedError::BadDelimiter {
                found: found as char,
            }),
        }
    }

    /// Deserialize one element, prepending the already-consumed first byte
    fn element(&mut self, first: u8) -> Result<Contact, FeedError> {
        let reader = io::Cursor::new([first]).chain(&mut self.reader);
        match serde_json::Deserializer::from_reader(reader)
            .into_iter::<Contact>()
            .next()
        {
            Some(Ok(contact)) => Ok(contact),
            Some(Err(source)) if source.is_eof() => Err(FeedError::Truncated),
            Some(Err(source)) => Err(FeedError::BadContact {
                index: self.index,
                source,
            }),
            None => Err(FeedError::Truncated),
        }
    }
}

impl<R: Read> Iterator for ContactStream<R> {
    type Item = Result<Contact, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.state {
            StreamState::Done => return None,
            StreamState::Start => self.first(),
            StreamState::InArray => self.subsequent(),
        };

        match result {
            Ok(Some(contact)) => {
                self.index += 1;
                Some(Ok(contact))
            }
            Ok(None) => {
                self.state = StreamState::Done;
                None
            }
            Err(e) => {
                self.state = StreamState::Done;
                Some(Err(e))
            }
        }
    }
}

/// Read the next non-whitespace byte, or None at end of stream
fn read_skipping_ws(reader: &mut impl Read) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            return Ok(None);
        }
        if !byte[0].is_ascii_whitespace() {
            return Ok(Some(byte[0]));
        }
    }
}
