use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use bzip2::read::MultiBzDecoder;
use regex::Regex;
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::error::FormatError;
use crate::types::GameRecord;

pub type PgnInput = Box<dyn BufRead + Send>;

static TAG_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[\s*([A-Za-z0-9_]+)\s+"(.*)"\s*\]$"#).expect("valid tag line regex")
});

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Bzip2,
    Zstd,
}

impl CompressionMode {
    /// Picks the decoder from the last file extension. Only `.pgn`, `.bz2`
    /// and `.zst` are accepted.
    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        if extension.eq_ignore_ascii_case("pgn") {
            Ok(Self::Plain)
        } else if extension.eq_ignore_ascii_case("bz2") {
            Ok(Self::Bzip2)
        } else if extension.eq_ignore_ascii_case("zst") {
            Ok(Self::Zstd)
        } else {
            Err(FormatError::UnsupportedExtension {
                path: path.to_path_buf(),
                extension: extension.to_string(),
            })
        }
    }
}

pub fn open_input_stream(path: &Path) -> Result<PgnInput, FormatError> {
    let compression = CompressionMode::from_path(path)?;
    let file = File::open(path).map_err(|source| FormatError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(BufReader::new(file))),
        CompressionMode::Bzip2 => Ok(Box::new(BufReader::new(MultiBzDecoder::new(file)))),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(BufReader::new(decoder)) as PgnInput)
            .map_err(|source| FormatError::Decoder {
                path: path.to_path_buf(),
                codec: "zstd",
                source,
            }),
    }
}

fn parse_tag_line(line: &str) -> Option<(String, String)> {
    let caps = TAG_LINE_RE.captures(line)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Section {
    BeforeHeaders,
    Headers,
    Movetext,
}

/// Splits an archive into [`GameRecord`]s.
///
/// Tag lines are collected until the first blank line, then movetext lines
/// are joined with single spaces until the next blank line, which closes the
/// record. Input is decoded as Latin-1 so any byte sequence is accepted. A
/// stream that ends in the middle of a record yields nothing for that tail.
/// After an I/O error the tokenizer is exhausted.
pub struct GameTokenizer<R> {
    input: R,
    line: Vec<u8>,
    finished: bool,
    games: u64,
}

impl<R: BufRead> GameTokenizer<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: Vec::with_capacity(256),
            finished: false,
            games: 0,
        }
    }

    /// Number of records emitted so far.
    pub fn games(&self) -> u64 {
        self.games
    }

    /// Reads one physical line, without its terminator. `None` at end of stream.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.line.clear();
        if self.input.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }

        while matches!(self.line.last(), Some(b'\n' | b'\r')) {
            self.line.pop();
        }
        Ok(Some(self.line.iter().map(|&b| char::from(b)).collect()))
    }

    fn read_record(&mut self) -> io::Result<Option<GameRecord>> {
        let mut section = Section::BeforeHeaders;
        let mut headers = Vec::new();
        let mut movetext = String::new();

        while let Some(line) = self.next_line()? {
            let trimmed = line.trim();

            match section {
                Section::BeforeHeaders | Section::Headers if trimmed.starts_with('[') => {
                    section = Section::Headers;
                    if let Some(tag) = parse_tag_line(trimmed) {
                        headers.push(tag);
                    }
                }
                Section::BeforeHeaders if trimmed.is_empty() => {}
                Section::Headers if trimmed.is_empty() => section = Section::Movetext,
                Section::BeforeHeaders | Section::Headers => {
                    // Movetext without the separating blank line.
                    section = Section::Movetext;
                    movetext.push_str(trimmed);
                }
                Section::Movetext if trimmed.is_empty() => {
                    return Ok(Some(GameRecord { headers, movetext }));
                }
                Section::Movetext => {
                    if !movetext.is_empty() {
                        movetext.push(' ');
                    }
                    movetext.push_str(trimmed);
                }
            }
        }

        Ok(None)
    }
}

impl<R: BufRead> Iterator for GameTokenizer<R> {
    type Item = io::Result<GameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_record() {
            Ok(Some(record)) => {
                self.games += 1;
                Some(Ok(record))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
