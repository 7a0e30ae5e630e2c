// Reply parsing. Words are fed one at a time; the parser groups `=key=value`
// attributes into records and decides when the exchange is over.

use std::collections::HashMap;

use crate::error::ProtocolError;

/// One reply record (`!re` sentence, or the attributes of the `!done` sentence).
/// Fields are looked up by name where they are used rather than passed around as a raw map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Result of feeding one word.
#[derive(Debug)]
pub enum Progress {
    /// Keep reading.
    More,
    /// The exchange is over.
    Complete(Result<Vec<Record>, ProtocolError>),
}

#[derive(Debug, Default, PartialEq, Eq)]
enum Sentence {
    #[default]
    Data,
    Done,
    Trap,
}

#[derive(Debug, Default)]
pub struct ReplyParser {
    records: Vec<Record>,
    current: Record,
    sentence: Sentence,
    done: bool,
    trap: Option<(String, Option<String>)>,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, word: &str) -> Progress {
        // Empty words only delimit sentences.
        if word.is_empty() {
            return self.end_sentence();
        }

        if word.starts_with("!done") {
            self.flush();
            self.sentence = Sentence::Done;
            self.done = true;
        } else if word.starts_with("!trap") {
            self.flush();
            self.sentence = Sentence::Trap;
            if self.trap.is_none() {
                self.trap = Some((word.to_string(), None));
            }
        } else if word.starts_with("!fatal") {
            return Progress::Complete(Err(ProtocolError::Fatal(word.to_string())));
        } else if word.starts_with("!re") {
            self.flush();
            self.sentence = Sentence::Data;
        } else if let Some(rest) = word.strip_prefix('=') {
            if let Some((key, value)) = rest.split_once('=') {
                self.current.insert(key, value);
            }
        }
        Progress::More
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.records.push(std::mem::take(&mut self.current));
        }
    }

    fn end_sentence(&mut self) -> Progress {
        if self.sentence == Sentence::Trap {
            let record = std::mem::take(&mut self.current);
            if let Some((_, message)) = self.trap.as_mut()
                && message.is_none()
            {
                *message = record.get("message").map(str::to_string);
            }
            self.sentence = Sentence::Data;
        }
        if !self.done {
            return Progress::More;
        }
        self.flush();
        // A trap is followed by its own `!done`; report it once the reply is fully consumed.
        if let Some((word, message)) = self.trap.take() {
            return Progress::Complete(Err(ProtocolError::Trap { word, message }));
        }
        Progress::Complete(Ok(std::mem::take(&mut self.records)))
    }
}
