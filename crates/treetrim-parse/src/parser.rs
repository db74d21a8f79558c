use drop_bomb::DropBomb;
use text_size::TextRange;
use treetrim_errors::Diagnostic;
use treetrim_syntax::{Node, SyntaxKind, SyntaxSet};
use treetrim_tokenizer::{Token, tokenize};

pub(crate) struct Parser<'src> {
    text: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    events: Vec<Event>,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(text: &'src str) -> Self {
        Self { text, tokens: tokenize(text), pos: 0, events: Vec::new(), diagnostics: Vec::new() }
    }

    pub(crate) fn peek_kind(&self) -> SyntaxKind {
        self.nth(0)
    }

    pub(crate) fn nth(&self, n: usize) -> SyntaxKind {
        self.tokens.get(self.pos + n).map_or(SyntaxKind::EOF, |token| token.kind)
    }

    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn at_set(&self, set: &SyntaxSet) -> bool {
        set.contains(self.peek_kind())
    }

    pub(crate) fn advance(&mut self) {
        if self.at(SyntaxKind::EOF) {
            return;
        }

        self.events.push(Event::Token(self.tokens[self.pos]));
        self.pos += 1;
    }

    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if !self.at(kind) {
            return false;
        }
        self.advance();
        true
    }

    pub(crate) fn expect(&mut self, kind: SyntaxKind, message: &str) {
        if !self.eat(kind) {
            self.error(message);
        }
    }

    pub(crate) fn start(&mut self) -> Marker {
        let pos = self.events.len() as u32;
        self.events.push(Event::TOMBSTONE);
        Marker::new(pos)
    }

    pub(crate) fn error(&mut self, message: &str) {
        let range = self.tokens.get(self.pos).map_or_else(
            || TextRange::empty((self.text.len() as u32).into()),
            |token| token.range,
        );
        self.diagnostics.push(Diagnostic::error(message, range));
    }

    pub(crate) fn error_and_bump(&mut self, message: &str) {
        let m = self.start();
        self.error(message);
        self.advance();
        m.complete(self, SyntaxKind::ERROR);
    }

    /// Replays the event stream into a tree of materialized nodes.
    ///
    /// Layout tokens never contribute to spans. A marked node is dropped in favour
    /// of its children when its kind is transparent, and in favour of its only
    /// child when both cover the same span; nodes with no text at all vanish.
    pub(crate) fn finish(self) -> (Option<Node>, Vec<Diagnostic>) {
        let Parser { mut events, diagnostics, .. } = self;
        let mut stack = vec![Frame::new(SyntaxKind::TOMBSTONE)];
        let mut forward_parents = Vec::new();

        for i in 0..events.len() {
            match std::mem::replace(&mut events[i], Event::TOMBSTONE) {
                Event::Start { kind, forward_parent } => {
                    if kind == SyntaxKind::TOMBSTONE {
                        continue;
                    }

                    forward_parents.push(kind);
                    let mut idx = i;
                    let mut fp = forward_parent;
                    while let Some(fwd) = fp {
                        idx += fwd as usize;
                        fp = match std::mem::replace(&mut events[idx], Event::TOMBSTONE) {
                            Event::Start { kind, forward_parent } => {
                                if kind != SyntaxKind::TOMBSTONE {
                                    forward_parents.push(kind);
                                }
                                forward_parent
                            }
                            _ => None,
                        };
                    }

                    stack.extend(forward_parents.drain(..).rev().map(Frame::new));
                }
                Event::Finish => {
                    let Some(frame) = stack.pop() else { break };
                    let Some(parent) = stack.last_mut() else { break };
                    parent.cover(frame.range);
                    parent.children.extend(frame.materialize());
                }
                Event::Token(token) => {
                    if let Some(frame) = stack.last_mut()
                        && !token.kind.is_layout()
                    {
                        frame.cover(Some(token.range));
                    }
                }
            }
        }

        let root = stack.into_iter().next().and_then(|sentinel| sentinel.children.into_iter().next());
        (root, diagnostics)
    }
}

struct Frame {
    kind: SyntaxKind,
    range: Option<TextRange>,
    children: Vec<Node>,
}

impl Frame {
    fn new(kind: SyntaxKind) -> Self {
        Self { kind, range: None, children: Vec::new() }
    }

    fn cover(&mut self, range: Option<TextRange>) {
        if let Some(range) = range {
            self.range = Some(self.range.map_or(range, |own| own.cover(range)));
        }
    }

    fn materialize(self) -> Vec<Node> {
        let Some(range) = self.range else { return self.children };

        if self.kind.is_transparent() {
            return self.children;
        }

        if self.children.len() == 1 && self.children[0].range == range {
            return self.children;
        }

        vec![Node::new(self.kind, String::new(), range).with_children(self.children)]
    }
}

enum Event {
    Start { kind: SyntaxKind, forward_parent: Option<u32> },
    Token(Token),
    Finish,
}

impl Event {
    const TOMBSTONE: Self = Self::Start { kind: SyntaxKind::TOMBSTONE, forward_parent: None };
}

pub(crate) struct Marker {
    position: u32,
    bomb: DropBomb,
}

impl Marker {
    fn new(position: u32) -> Self {
        Self { position, bomb: DropBomb::new("Marker must be completed") }
    }

    pub(crate) fn complete(mut self, p: &mut Parser<'_>, kind: SyntaxKind) -> CompletedMarker {
        self.bomb.defuse();

        if let Event::Start { kind: slot, .. } = &mut p.events[self.position as usize] {
            *slot = kind;
        }

        p.events.push(Event::Finish);
        CompletedMarker { position: self.position }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct CompletedMarker {
    position: u32,
}

impl CompletedMarker {
    pub(crate) fn precede(self, p: &mut Parser<'_>) -> Marker {
        let new_pos = p.start();

        if let Event::Start { forward_parent, .. } = &mut p.events[self.position as usize] {
            *forward_parent = Some(new_pos.position - self.position);
        }

        new_pos
    }
}
