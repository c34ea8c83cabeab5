//! Formatting-independent rendering of statement text.
//!
//! The statement is tokenized with the C++ grammar, comments and
//! preprocessor directives are dropped, and the leaf tokens are joined with
//! a fixed spacing policy. Line breaks inside a token are spliced or
//! escaped, so the result is a single line. Rendering an already canonical
//! statement yields the same text.

use std::cell::RefCell;

use phf::phf_set;
use tracing::warn;
use tree_sitter::{Node as TsNode, Parser};

/// Multi-character punctuators and comment openers.
const PUNCTUATORS: &[&str] = &[
    "<<=", ">>=", "...", "->*", "<=>", "::", "->", "++", "--", "<<", ">>", "<=", ">=", "==",
    "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "##", ".*", "//", "/*",
];

/// Keywords followed by a space before `(`.
static SPACED_KEYWORDS: phf::Set<&'static str> = phf_set! {
    "if", "while", "for", "switch", "catch", "return", "case", "do", "else",
    "throw", "delete", "new", "co_return", "co_await", "co_yield",
};

/// Keywords that end an operand.
static VALUE_KEYWORDS: phf::Set<&'static str> = phf_set! {
    "this", "true", "false", "nullptr", "NULL",
};

/// Keywords that never end an operand.
static KEYWORDS: phf::Set<&'static str> = phf_set! {
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double",
    "else", "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long",
    "register", "restrict", "return", "short", "signed", "sizeof", "static", "struct",
    "switch", "typedef", "union", "unsigned", "void", "volatile", "while", "bool",
    "catch", "class", "constexpr", "decltype", "delete", "new", "noexcept", "operator",
    "throw", "try", "typename", "using", "virtual", "co_return", "co_await", "co_yield",
    "_Bool", "_Atomic", "static_assert", "alignof", "thread_local", "mutable", "explicit",
};

/// Nodes rendered as one token even though the grammar splits them.
static LITERAL_KINDS: phf::Set<&'static str> = phf_set! {
    "string_literal", "char_literal", "raw_string_literal", "system_lib_string",
    "user_defined_literal",
};

/// Directives dropped together with everything under them.
static DIRECTIVE_KINDS: phf::Set<&'static str> = phf_set! {
    "preproc_include", "preproc_def", "preproc_function_def", "preproc_call", "preproc_arg",
};

thread_local! {
    static PARSER: RefCell<Option<Parser>> = RefCell::new(token_parser());
}

fn token_parser() -> Option<Parser> {
    let mut parser = Parser::new();
    match parser.set_language(&tree_sitter_cpp::LANGUAGE.into()) {
        Ok(()) => Some(parser),
        Err(err) => {
            warn!(%err, "cannot load token grammar; statements keep their raw spelling");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Number,
    Literal,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    fn new(node_kind: &str, text: String) -> Self {
        let kind = if node_kind == "number_literal" {
            TokenKind::Number
        } else if LITERAL_KINDS.contains(node_kind) {
            TokenKind::Literal
        } else if text.starts_with(|c: char| c.is_alphabetic() || c == '_') {
            TokenKind::Word
        } else {
            TokenKind::Punct
        };
        Self { kind, text }
    }

    /// Whether the token can end an operand (so a following `-` is binary).
    fn ends_operand(&self) -> bool {
        let text = self.text.as_str();
        match self.kind {
            TokenKind::Word => !KEYWORDS.contains(text) || VALUE_KEYWORDS.contains(text),
            TokenKind::Number | TokenKind::Literal => true,
            TokenKind::Punct => matches!(text, ")" | "]"),
        }
    }
}

/// Render `text` with canonical spacing and a trailing `;`.
pub fn canonicalize(text: &str) -> String {
    let mut out = match lex(text) {
        Some(tokens) => render(&tokens),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    };
    if !(out.ends_with(';') || out.ends_with('}')) {
        out.push(';');
    }
    out
}

fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<(&Token, bool)> = None;
    for token in tokens {
        let unary = is_prefix_operator(token, prev.map(|(p, _)| p));
        if let Some((p, p_unary)) = prev {
            if wants_space(p, p_unary, token, unary) || glues(p, token) {
                out.push(' ');
            }
        }
        out.push_str(&token.text);
        prev = Some((token, unary));
    }
    out
}

/// Whether an operator token is used as a prefix operator here.
fn is_prefix_operator(token: &Token, prev: Option<&Token>) -> bool {
    if token.kind != TokenKind::Punct {
        return false;
    }
    match token.text.as_str() {
        "-" | "+" | "*" | "&" | "&&" | "++" | "--" => !prev.map(Token::ends_operand).unwrap_or(false),
        "!" | "~" => true,
        _ => false,
    }
}

fn wants_space(prev: &Token, prev_unary: bool, token: &Token, unary: bool) -> bool {
    if prev_unary {
        return false;
    }
    let prev_text = prev.text.as_str();
    if prev.kind == TokenKind::Punct && matches!(prev_text, "(" | "[" | "." | "->" | "::" | ".*" | "->*") {
        return false;
    }
    if token.kind == TokenKind::Punct {
        match token.text.as_str() {
            ";" | "," | ")" | "]" | "." | "->" | ".*" | "->*" => return false,
            "::" => return prev.kind != TokenKind::Word || !prev.ends_operand(),
            "++" | "--" if !unary => return false,
            "(" => {
                return match prev.kind {
                    TokenKind::Word => SPACED_KEYWORDS.contains(prev_text),
                    TokenKind::Punct => !matches!(prev_text, "(" | "[" | ")" | "]"),
                    _ => true,
                };
            }
            "[" => return !prev.ends_operand(),
            "}" if prev_text == "{" => return false,
            _ => {}
        }
    }
    true
}

/// Whether `a` and `b` written without space would tokenize differently.
fn glues(a: &Token, b: &Token) -> bool {
    let (Some(last), Some(first)) = (a.text.chars().last(), b.text.chars().next()) else {
        return false;
    };
    let word_char = |c: char| c.is_alphanumeric() || c == '_';
    if word_char(last) && (word_char(first) || matches!(first, '"' | '\'')) {
        return true;
    }
    if (a.kind == TokenKind::Number && first == '.') || (last == '.' && first.is_ascii_digit()) {
        return true;
    }
    if a.kind == TokenKind::Punct && b.kind == TokenKind::Punct {
        let joined = format!("{}{}", a.text, b.text);
        return PUNCTUATORS
            .iter()
            .any(|p| p.len() > a.text.len() && joined.starts_with(p));
    }
    false
}

/// Leaf tokens of `text`, or `None` when no tree is available.
fn lex(text: &str) -> Option<Vec<Token>> {
    PARSER.with(|cell| {
        let mut parser = cell.borrow_mut();
        let tree = parser.as_mut()?.parse(text, None)?;
        let mut tokens = Vec::new();
        push_tokens(tree.root_node(), text.as_bytes(), &mut tokens);
        Some(tokens)
    })
}

fn push_tokens(node: TsNode<'_>, source: &[u8], tokens: &mut Vec<Token>) {
    let kind = node.kind();
    if node.is_missing() || kind == "comment" || DIRECTIVE_KINDS.contains(kind) {
        return;
    }
    if node.child_count() == 0 || LITERAL_KINDS.contains(kind) {
        let Ok(text) = node.utf8_text(source) else {
            return;
        };
        let text = single_line(text);
        if !text.trim().is_empty() {
            tokens.push(Token::new(kind, text));
        }
        return;
    }

    // Conditional directives keep the code they enclose.
    let directive = kind.starts_with("preproc");
    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return;
    }
    loop {
        let child = cursor.node();
        let skip = directive
            && (!child.is_named() || matches!(cursor.field_name(), Some("name" | "condition")));
        if !skip {
            push_tokens(child, source, tokens);
        }
        if !cursor.goto_next_sibling() {
            break;
        }
    }
}

/// Splice backslash-newline pairs and escape any remaining line break.
fn single_line(text: &str) -> String {
    if !text.contains(['\n', '\r']) {
        return text.to_string();
    }
    text.replace("\\\r\n", "")
        .replace("\\\n", "")
        .replace("\r\n", "\n")
        .replace('\r', "")
        .replace('\n', "\\n")
}
