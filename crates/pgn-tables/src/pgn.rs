//! PGN decoding: games as header pairs plus a mainline of resolved moves.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use pgn_reader::{RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{fen::Fen, CastlingMode, Chess, Move, Position};
use tracing::warn;

use crate::error::TableError;

/// Largest comment delivered in one piece; longer ones arrive in chunks.
const SUPPORTED_COMMENT_LENGTH: usize = 64 * 1024;

/// One node of a game's mainline.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveNode {
    /// `None` for the root node
    pub mv: Option<Move>,
    pub comment: Option<String>,
}

impl MoveNode {
    pub fn root() -> Self {
        Self {
            mv: None,
            comment: None,
        }
    }

    pub fn new(mv: Move, comment: Option<&str>) -> Self {
        Self {
            mv: Some(mv),
            comment: comment.map(str::to_string),
        }
    }
}

/// A decoded game.
#[derive(Debug, Clone)]
pub struct GameRecord {
    /// Tag pairs in file order
    pub headers: Vec<(String, String)>,
    /// Root node followed by the mainline moves
    pub nodes: Vec<MoveNode>,
    start: Chess,
}

impl GameRecord {
    /// A game starting from the standard position.
    pub fn new(headers: Vec<(String, String)>, nodes: Vec<MoveNode>) -> Self {
        Self::with_start(headers, nodes, Chess::default())
    }

    pub fn with_start(headers: Vec<(String, String)>, nodes: Vec<MoveNode>, start: Chess) -> Self {
        Self {
            headers,
            nodes,
            start,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Position the mainline starts from (standard, or the `FEN` tag).
    pub fn starting_position(&self) -> Chess {
        self.start.clone()
    }
}

/// Movetext state while a game is being read.
struct Movetext {
    headers: Vec<(String, String)>,
    start: Chess,
    pos: Chess,
    nodes: Vec<MoveNode>,
    /// Chunks of a comment longer than the reader buffer
    partial_comment: String,
    /// Set once the mainline can no longer be followed
    halted: bool,
}

impl Movetext {
    fn attach_comment(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if let Some(node) = self.nodes.last_mut() {
            match &mut node.comment {
                Some(existing) => {
                    existing.push(' ');
                    existing.push_str(text);
                }
                None => node.comment = Some(text.to_string()),
            }
        }
    }
}

/// Visitor that turns each game into a [`GameRecord`].
struct GameBuilder;

impl Visitor for GameBuilder {
    type Tags = Vec<(String, String)>;
    type Movetext = Movetext;
    type Output = GameRecord;

    fn begin_tags(&mut self) -> ControlFlow<GameRecord, Self::Tags> {
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<GameRecord> {
        tags.push((
            String::from_utf8_lossy(name).into_owned(),
            value.decode_utf8_lossy().into_owned(),
        ));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, headers: Self::Tags) -> ControlFlow<GameRecord, Movetext> {
        let fen_tag = headers
            .iter()
            .find(|(key, _)| key == "FEN")
            .map(|(_, value)| value.clone());

        let (start, halted) = match fen_tag {
            None => (Chess::default(), false),
            Some(fen) => match parse_start_position(&fen) {
                Some(pos) => (pos, false),
                None => {
                    warn!(fen = %fen, "Unusable FEN tag, skipping movetext");
                    (Chess::default(), true)
                }
            },
        };

        ControlFlow::Continue(Movetext {
            headers,
            pos: start.clone(),
            start,
            nodes: vec![MoveNode::root()],
            partial_comment: String::new(),
            halted,
        })
    }

    fn san(&mut self, movetext: &mut Movetext, san_plus: SanPlus) -> ControlFlow<GameRecord> {
        if movetext.halted {
            return ControlFlow::Continue(());
        }

        match san_plus.san.to_move(&movetext.pos) {
            Ok(mv) => {
                movetext.pos.play_unchecked(mv);
                movetext.nodes.push(MoveNode::new(mv, None));
            }
            Err(e) => {
                warn!(
                    san = %san_plus,
                    ply = movetext.nodes.len(),
                    error = %e,
                    "Unplayable move, ignoring rest of mainline"
                );
                movetext.halted = true;
            }
        }

        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        movetext: &mut Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<GameRecord> {
        movetext
            .partial_comment
            .push_str(&String::from_utf8_lossy(comment.as_bytes()));
        ControlFlow::Continue(())
    }

    fn comment(&mut self, movetext: &mut Movetext, comment: RawComment<'_>) -> ControlFlow<GameRecord> {
        let mut text = std::mem::take(&mut movetext.partial_comment);
        text.push_str(&String::from_utf8_lossy(comment.as_bytes()));
        if !movetext.halted {
            movetext.attach_comment(&text);
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _movetext: &mut Movetext) -> ControlFlow<GameRecord, Skip> {
        // Mainline only
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Movetext) -> GameRecord {
        GameRecord {
            headers: movetext.headers,
            nodes: movetext.nodes,
            start: movetext.start,
        }
    }
}

fn parse_start_position(fen: &str) -> Option<Chess> {
    let fen: Fen = fen.trim().parse().ok()?;
    fen.into_position(CastlingMode::Standard).ok()
}

/// Presents the first read error as end of input and keeps the error.
struct StopOnError<R> {
    inner: R,
    fault: Arc<OnceLock<io::Error>>,
}

impl<R: Read> Read for StopOnError<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fault.get().is_some() {
            return Ok(0);
        }
        match self.inner.read(buf) {
            Err(e) if e.kind() != io::ErrorKind::Interrupted => {
                let _ = self.fault.set(e);
                Ok(0)
            }
            other => other,
        }
    }
}

/// Lazy sequence of games decoded from PGN text.
///
/// A read error ends the sequence. Games completed before the error are
/// still yielded; the game the error cut short is dropped.
pub struct GameDecoder<R: Read> {
    reader: Reader<StopOnError<R>>,
    fault: Arc<OnceLock<io::Error>>,
    builder: GameBuilder,
    decoded: u64,
    finished: bool,
}

impl<R: Read> GameDecoder<R> {
    pub fn new(input: R) -> Self {
        let fault = Arc::new(OnceLock::new());
        let input = StopOnError {
            inner: input,
            fault: Arc::clone(&fault),
        };
        let reader = Reader::build(input)
            .set_supported_comment_length(SUPPORTED_COMMENT_LENGTH)
            .finish();
        Self {
            reader,
            fault,
            builder: GameBuilder,
            decoded: 0,
            finished: false,
        }
    }

    /// Games yielded so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// The read error that ended the input, if any.
    pub fn fault(&self) -> Option<&io::Error> {
        self.fault.get()
    }

    fn stop(&mut self) -> Option<GameRecord> {
        self.finished = true;
        if let Some(e) = self.fault.get() {
            warn!(error = %e, games = self.decoded, "PGN input failed, decoding stopped early");
        }
        None
    }
}

/// Decoder over a PGN file on disk.
pub type PgnFileDecoder = GameDecoder<BufReader<File>>;

impl PgnFileDecoder {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> Iterator for GameDecoder<R> {
    type Item = GameRecord;

    fn next(&mut self) -> Option<GameRecord> {
        if self.finished {
            return None;
        }
        match self.reader.read_game(&mut self.builder) {
            Ok(Some(game)) => {
                // A game running into a read error is incomplete
                if self.fault.get().is_some() && !self.reader.has_more().unwrap_or(false) {
                    return self.stop();
                }
                self.decoded += 1;
                Some(game)
            }
            Ok(None) => self.stop(),
            Err(e) => {
                warn!(error = %e, games = self.decoded, "PGN decoding stopped early");
                self.stop()
            }
        }
    }
}
