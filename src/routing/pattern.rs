//! Path pattern compilation.
//!
//! # Responsibilities
//! - Turn a route path (string, list of strings, or regex) into a compiled
//!   [`Regex`] plus the ordered list of capture keys
//! - Apply case-sensitivity and trailing-slash strictness options
//!
//! # Pattern Syntax
//! ```text
//! /cat/:id            named parameter, one segment
//! /cat/:id(\d+)       named parameter with a custom pattern
//! /assets/(.*)        unnamed group, keyed by position ("0", "1", ...)
//! /:id?  /:p+  /:p*   optional, one-or-more, zero-or-more
//! /file{.:ext}?       group with literal prefix/suffix
//! \:                  escaped literal
//! ```
//!
//! # Design Decisions
//! - Literal text is escaped; only custom groups carry regex semantics
//! - Keys are collected in order of appearance, so capture group `i` always
//!   pairs with key `i - 1`
//! - A user-supplied regex is used verbatim (no anchoring added)

use regex::{Regex, RegexBuilder};

/// Characters that a parameter swallows as its prefix.
const PREFIXES: [char; 2] = ['/', '.'];

/// Segment pattern used by parameters without a custom pattern.
const DEFAULT_SEGMENT: &str = "[^/#?]+?";

/// Trailing delimiter accepted when routing is not strict.
const DELIMITER_CLASS: &str = "[/#?]";

/// Options applied when compiling string patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Match letter case exactly.
    pub sensitive: bool,
    /// Do not accept an optional trailing delimiter.
    pub strict: bool,
}

/// The path a route is registered for.
#[derive(Debug, Clone)]
pub enum RoutePath {
    Literal(String),
    List(Vec<String>),
    Regex(Regex),
}

impl RoutePath {
    /// Rewrites every `*` in string paths into an unnamed catch-all group.
    pub fn with_wildcard_groups(&self) -> RoutePath {
        match self {
            RoutePath::Literal(path) => RoutePath::Literal(path.replace('*', "(.*)")),
            RoutePath::List(paths) => {
                RoutePath::List(paths.iter().map(|p| p.replace('*', "(.*)")).collect())
            }
            RoutePath::Regex(regex) => RoutePath::Regex(regex.clone()),
        }
    }

    /// Returns true for the bare `*` path, which matches every request path.
    pub fn is_catch_all(&self) -> bool {
        matches!(self, RoutePath::Literal(path) if path == "*")
    }
}

impl std::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutePath::Literal(path) => f.write_str(path),
            RoutePath::List(paths) => write!(f, "[{}]", paths.join(", ")),
            RoutePath::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl From<&str> for RoutePath {
    fn from(path: &str) -> Self {
        RoutePath::Literal(path.to_string())
    }
}

impl From<String> for RoutePath {
    fn from(path: String) -> Self {
        RoutePath::Literal(path)
    }
}

impl From<Vec<String>> for RoutePath {
    fn from(paths: Vec<String>) -> Self {
        RoutePath::List(paths)
    }
}

impl From<Vec<&str>> for RoutePath {
    fn from(paths: Vec<&str>) -> Self {
        RoutePath::List(paths.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RoutePath {
    fn from(paths: [&str; N]) -> Self {
        RoutePath::List(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl From<Regex> for RoutePath {
    fn from(regex: Regex) -> Self {
        RoutePath::Regex(regex)
    }
}

/// A capture slot in a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Parameter name, or the positional index for unnamed groups.
    pub name: String,
    /// The group may not participate in a match.
    pub optional: bool,
}

/// Errors raised while compiling a route path.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("missing parameter name at {0}")]
    MissingName(usize),

    #[error("unbalanced pattern at {0}")]
    Unbalanced(usize),

    #[error("missing pattern at {0}")]
    EmptyPattern(usize),

    #[error("pattern cannot start with \"?\" at {0}")]
    LeadingQuestionMark(usize),

    #[error("capturing groups are not allowed at {0}")]
    NestedCapture(usize),

    #[error("dangling escape at {0}")]
    DanglingEscape(usize),

    #[error("unexpected {token} at {index}")]
    Unexpected { token: &'static str, index: usize },

    #[error("path list is empty")]
    EmptyList,

    #[error("pattern has {groups} capture groups but {keys} keys")]
    CaptureMismatch { groups: usize, keys: usize },

    #[error("invalid expression: {0}")]
    Regex(#[from] regex::Error),
}

/// A route path compiled into a matcher.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    keys: Vec<Key>,
}

impl CompiledPattern {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Compile a route path with the given options.
pub fn compile(path: &RoutePath, options: PatternOptions) -> Result<CompiledPattern, PatternError> {
    let (regex, keys) = match path {
        RoutePath::Literal(path) => {
            let (source, keys) = string_source(path, options)?;
            (build(&source, options)?, keys)
        }
        RoutePath::List(paths) => {
            if paths.is_empty() {
                return Err(PatternError::EmptyList);
            }
            let mut sources = Vec::with_capacity(paths.len());
            let mut keys = Vec::new();
            for path in paths {
                let (source, path_keys) = string_source(path, options)?;
                sources.push(source);
                keys.extend(path_keys);
            }
            (build(&format!("(?:{})", sources.join("|")), options)?, keys)
        }
        RoutePath::Regex(regex) => (regex.clone(), regex_keys(regex)),
    };

    let groups = regex.captures_len() - 1;
    if groups != keys.len() {
        return Err(PatternError::CaptureMismatch {
            groups,
            keys: keys.len(),
        });
    }

    Ok(CompiledPattern { regex, keys })
}

fn build(source: &str, options: PatternOptions) -> Result<Regex, PatternError> {
    Ok(RegexBuilder::new(source)
        .case_insensitive(!options.sensitive)
        .build()?)
}

/// Keys for a user-supplied regex: named groups keep their name, unnamed
/// groups are numbered in order.
fn regex_keys(regex: &Regex) -> Vec<Key> {
    let mut index = 0;
    regex
        .capture_names()
        .skip(1)
        .map(|name| {
            let name = match name {
                Some(name) => name.to_string(),
                None => {
                    index += 1;
                    (index - 1).to_string()
                }
            };
            Key {
                name,
                optional: false,
            }
        })
        .collect()
}

fn string_source(path: &str, options: PatternOptions) -> Result<(String, Vec<Key>), PatternError> {
    let tokens = lex(path)?;
    let segments = Parser::new(tokens).parse()?;

    let mut source = String::from("^");
    let mut keys = Vec::new();

    for segment in segments {
        match segment {
            Segment::Text(text) => source.push_str(&regex::escape(&text)),
            Segment::Group {
                key,
                pattern,
                prefix,
                suffix,
                modifier,
            } => {
                let prefix = regex::escape(&prefix);
                let suffix = regex::escape(&suffix);
                let modifier_str = modifier.map(String::from).unwrap_or_default();
                let repeated = matches!(modifier, Some('+') | Some('*'));

                match key {
                    Some(key) => {
                        keys.push(key);
                        if !prefix.is_empty() || !suffix.is_empty() {
                            if repeated {
                                let tail = if modifier == Some('*') { "?" } else { "" };
                                source.push_str(&format!(
                                    "(?:{prefix}((?:{pattern})(?:{suffix}{prefix}(?:{pattern}))*){suffix}){tail}"
                                ));
                            } else {
                                source.push_str(&format!(
                                    "(?:{prefix}({pattern}){suffix}){modifier_str}"
                                ));
                            }
                        } else if repeated {
                            source.push_str(&format!("((?:{pattern}){modifier_str})"));
                        } else {
                            source.push_str(&format!("({pattern}){modifier_str}"));
                        }
                    }
                    None => {
                        source.push_str(&format!("(?:{prefix}{suffix}){modifier_str}"));
                    }
                }
            }
        }
    }

    if !options.strict {
        source.push_str(DELIMITER_CLASS);
        source.push('?');
    }
    source.push('$');

    Ok((source, keys))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Char(char),
    Escaped(char),
    Name(String),
    Pattern(String),
    Modifier(char),
    Open,
    Close,
}

impl Token {
    fn kind(&self) -> &'static str {
        match self {
            Token::Char(_) => "character",
            Token::Escaped(_) => "escaped character",
            Token::Name(_) => "parameter name",
            Token::Pattern(_) => "pattern",
            Token::Modifier(_) => "modifier",
            Token::Open => "\"{\"",
            Token::Close => "\"}\"",
        }
    }
}

fn lex(input: &str) -> Result<Vec<(usize, Token)>, PatternError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' | '+' | '?' => {
                tokens.push((i, Token::Modifier(c)));
                i += 1;
            }
            '\\' => {
                let escaped = *chars.get(i + 1).ok_or(PatternError::DanglingEscape(i))?;
                tokens.push((i, Token::Escaped(escaped)));
                i += 2;
            }
            '{' => {
                tokens.push((i, Token::Open));
                i += 1;
            }
            '}' => {
                tokens.push((i, Token::Close));
                i += 1;
            }
            ':' => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                if j == start {
                    return Err(PatternError::MissingName(i));
                }
                tokens.push((i, Token::Name(chars[start..j].iter().collect())));
                i = j;
            }
            '(' => {
                let mut depth = 1;
                let mut pattern = String::new();
                let mut j = i + 1;

                if chars.get(j) == Some(&'?') {
                    return Err(PatternError::LeadingQuestionMark(j));
                }

                while j < chars.len() {
                    let ch = chars[j];
                    if ch == '\\' {
                        pattern.push(ch);
                        if let Some(&next) = chars.get(j + 1) {
                            pattern.push(next);
                        }
                        j += 2;
                        continue;
                    }
                    if ch == ')' {
                        depth -= 1;
                        if depth == 0 {
                            j += 1;
                            break;
                        }
                    } else if ch == '(' {
                        depth += 1;
                        if chars.get(j + 1) != Some(&'?') {
                            return Err(PatternError::NestedCapture(j));
                        }
                    }
                    pattern.push(ch);
                    j += 1;
                }

                if depth != 0 {
                    return Err(PatternError::Unbalanced(i));
                }
                if pattern.is_empty() {
                    return Err(PatternError::EmptyPattern(i));
                }
                tokens.push((i, Token::Pattern(pattern)));
                i = j;
            }
            _ => {
                tokens.push((i, Token::Char(c)));
                i += 1;
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug)]
enum Segment {
    Text(String),
    Group {
        key: Option<Key>,
        pattern: String,
        prefix: String,
        suffix: String,
        modifier: Option<char>,
    },
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    next_index: usize,
}

impl Parser {
    fn new(tokens: Vec<(usize, Token)>) -> Self {
        Self {
            tokens,
            pos: 0,
            next_index: 0,
        }
    }

    fn peek(&self) -> Option<&(usize, Token)> {
        self.tokens.get(self.pos)
    }

    fn take_if<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        let value = self.peek().and_then(|(_, token)| f(token))?;
        self.pos += 1;
        Some(value)
    }

    fn try_char(&mut self) -> Option<char> {
        self.take_if(|t| match t {
            Token::Char(c) => Some(*c),
            _ => None,
        })
    }

    fn try_escaped(&mut self) -> Option<char> {
        self.take_if(|t| match t {
            Token::Escaped(c) => Some(*c),
            _ => None,
        })
    }

    fn try_name(&mut self) -> Option<String> {
        self.take_if(|t| match t {
            Token::Name(name) => Some(name.clone()),
            _ => None,
        })
    }

    fn try_pattern(&mut self) -> Option<String> {
        self.take_if(|t| match t {
            Token::Pattern(pattern) => Some(pattern.clone()),
            _ => None,
        })
    }

    fn try_modifier(&mut self) -> Option<char> {
        self.take_if(|t| match t {
            Token::Modifier(c) => Some(*c),
            _ => None,
        })
    }

    fn try_open(&mut self) -> bool {
        self.take_if(|t| (*t == Token::Open).then_some(())).is_some()
    }

    fn expect_close(&mut self) -> Result<(), PatternError> {
        if self.take_if(|t| (*t == Token::Close).then_some(())).is_some() {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn unexpected(&self) -> PatternError {
        match self.peek() {
            Some((index, token)) => PatternError::Unexpected {
                token: token.kind(),
                index: *index,
            },
            None => PatternError::Unexpected {
                token: "end of pattern",
                index: self.tokens.last().map(|(i, _)| i + 1).unwrap_or(0),
            },
        }
    }

    fn consume_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.try_char().or_else(|| self.try_escaped()) {
            text.push(c);
        }
        text
    }

    fn group(
        &mut self,
        name: Option<String>,
        pattern: Option<String>,
        prefix: String,
        suffix: String,
    ) -> Segment {
        let modifier = self.try_modifier();
        let optional = matches!(modifier, Some('?') | Some('*'));

        let key_name = match (name, &pattern) {
            (Some(name), _) => Some(name),
            (None, Some(_)) => {
                self.next_index += 1;
                Some((self.next_index - 1).to_string())
            }
            (None, None) => None,
        };

        let pattern = match (pattern, &key_name) {
            (Some(pattern), _) => pattern,
            (None, Some(_)) => DEFAULT_SEGMENT.to_string(),
            (None, None) => String::new(),
        };

        Segment::Group {
            key: key_name.map(|name| Key { name, optional }),
            pattern,
            prefix,
            suffix,
            modifier,
        }
    }

    fn parse(mut self) -> Result<Vec<Segment>, PatternError> {
        let mut segments = Vec::new();
        let mut path = String::new();

        loop {
            let ch = self.try_char();
            let name = self.try_name();
            let pattern = self.try_pattern();

            if name.is_some() || pattern.is_some() {
                let mut prefix = ch.map(String::from).unwrap_or_default();
                if let Some(c) = ch {
                    if !PREFIXES.contains(&c) {
                        path.push(c);
                        prefix.clear();
                    }
                }
                if !path.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut path)));
                }
                segments.push(self.group(name, pattern, prefix, String::new()));
                continue;
            }

            if let Some(c) = ch.or_else(|| self.try_escaped()) {
                path.push(c);
                continue;
            }

            if !path.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut path)));
            }

            if self.try_open() {
                let prefix = self.consume_text();
                let name = self.try_name();
                let pattern = self.try_pattern();
                let suffix = self.consume_text();
                self.expect_close()?;
                segments.push(self.group(name, pattern, prefix, suffix));
                continue;
            }

            if self.peek().is_none() {
                break;
            }
            return Err(self.unexpected());
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pattern: &CompiledPattern) -> Vec<&str> {
        pattern.keys().iter().map(|k| k.name.as_str()).collect()
    }

    #[test]
    fn test_named_parameter() {
        let pattern = compile(&"/cat/:id".into(), PatternOptions::default()).unwrap();
        assert_eq!(names(&pattern), vec!["id"]);

        let caps = pattern.regex().captures("/cat/123").unwrap();
        assert_eq!(&caps[1], "123");
        assert!(pattern.is_match("/cat/123/"));
        assert!(!pattern.is_match("/cat"));
        assert!(!pattern.is_match("/cat/123/456"));
    }

    #[test]
    fn test_literal_dot_is_escaped() {
        let pattern = compile(&"/robots.txt".into(), PatternOptions::default()).unwrap();
        assert!(pattern.is_match("/robots.txt"));
        assert!(!pattern.is_match("/robotsXtxt"));
    }

    #[test]
    fn test_case_sensitivity() {
        let loose = compile(&"/Cat".into(), PatternOptions::default()).unwrap();
        assert!(loose.is_match("/cat"));

        let sensitive = PatternOptions {
            sensitive: true,
            strict: false,
        };
        let exact = compile(&"/Cat".into(), sensitive).unwrap();
        assert!(exact.is_match("/Cat"));
        assert!(!exact.is_match("/cat"));
    }

    #[test]
    fn test_strict_trailing_slash() {
        let strict = PatternOptions {
            sensitive: false,
            strict: true,
        };
        let pattern = compile(&"/cat".into(), strict).unwrap();
        assert!(pattern.is_match("/cat"));
        assert!(!pattern.is_match("/cat/"));
    }

    #[test]
    fn test_unnamed_groups_are_positional() {
        let path = RoutePath::from("/books/*/apply/*").with_wildcard_groups();
        let pattern = compile(&path, PatternOptions::default()).unwrap();
        assert_eq!(names(&pattern), vec!["0", "1"]);

        let caps = pattern.regex().captures("/books/1/apply/buy").unwrap();
        assert_eq!(&caps[1], "1");
        assert_eq!(&caps[2], "buy");
    }

    #[test]
    fn test_wildcard_spans_segments() {
        let path = RoutePath::from("/assets/*").with_wildcard_groups();
        let pattern = compile(&path, PatternOptions::default()).unwrap();
        let caps = pattern.regex().captures("/assets/files/image.png").unwrap();
        assert_eq!(&caps[1], "files/image.png");
    }

    #[test]
    fn test_custom_parameter_pattern() {
        let pattern = compile(&r"/user/:id(\d+)".into(), PatternOptions::default()).unwrap();
        assert!(pattern.is_match("/user/42"));
        assert!(!pattern.is_match("/user/abc"));
    }

    #[test]
    fn test_modifiers() {
        let optional = compile(&"/cat/:id?".into(), PatternOptions::default()).unwrap();
        assert!(optional.is_match("/cat"));
        assert!(optional.is_match("/cat/1"));
        assert!(optional.keys()[0].optional);

        let repeated = compile(&"/files/:path+".into(), PatternOptions::default()).unwrap();
        let caps = repeated.regex().captures("/files/a/b/c").unwrap();
        assert_eq!(&caps[1], "a/b/c");
        assert!(!repeated.is_match("/files"));

        let any = compile(&"/files/:path*".into(), PatternOptions::default()).unwrap();
        assert!(any.is_match("/files"));
        assert!(any.is_match("/files/a/b"));
    }

    #[test]
    fn test_braced_group() {
        let pattern = compile(&"/file{.:ext}?".into(), PatternOptions::default()).unwrap();
        assert_eq!(names(&pattern), vec!["ext"]);
        assert!(pattern.is_match("/file"));
        let caps = pattern.regex().captures("/file.json").unwrap();
        assert_eq!(&caps[1], "json");
    }

    #[test]
    fn test_list_concatenates_keys() {
        let pattern = compile(&["/cat/:id", "/kitten/:id"].into(), PatternOptions::default()).unwrap();
        assert_eq!(names(&pattern), vec!["id", "id"]);

        let caps = pattern.regex().captures("/kitten/9").unwrap();
        assert!(caps.get(1).is_none());
        assert_eq!(&caps[2], "9");
    }

    #[test]
    fn test_regex_path_keys() {
        let regex = Regex::new(r"^/(?P<kind>cat|dog)/(\d+)$").unwrap();
        let pattern = compile(&regex.into(), PatternOptions::default()).unwrap();
        assert_eq!(names(&pattern), vec!["kind", "0"]);
    }

    #[test]
    fn test_regex_path_is_unanchored() {
        let regex = Regex::new(r"/cat|/kitten").unwrap();
        let pattern = compile(&regex.into(), PatternOptions::default()).unwrap();
        assert!(pattern.is_match("/cat"));
        assert!(pattern.is_match("/kitten"));
        assert!(!pattern.is_match("/ct"));
    }

    #[test]
    fn test_compile_errors() {
        let opts = PatternOptions::default();
        assert!(matches!(compile(&"/cat/(".into(), opts), Err(PatternError::Unbalanced(5))));
        assert!(matches!(compile(&"/cat/()".into(), opts), Err(PatternError::EmptyPattern(5))));
        assert!(matches!(compile(&"/cat/:".into(), opts), Err(PatternError::MissingName(5))));
        assert!(matches!(
            compile(&"/(a(b))".into(), opts),
            Err(PatternError::NestedCapture(3))
        ));
        assert!(matches!(
            compile(&"/(?x)".into(), opts),
            Err(PatternError::LeadingQuestionMark(2))
        ));
        assert!(matches!(compile(&"/cat\\".into(), opts), Err(PatternError::DanglingEscape(4))));
        assert!(matches!(
            compile(&"/cat?".into(), opts),
            Err(PatternError::Unexpected { token: "modifier", index: 4 })
        ));
        assert!(matches!(
            compile(&RoutePath::List(Vec::new()), opts),
            Err(PatternError::EmptyList)
        ));
    }

    #[test]
    fn test_catch_all_detection() {
        assert!(RoutePath::from("*").is_catch_all());
        assert!(!RoutePath::from("/*").is_catch_all());
        assert!(!RoutePath::from(vec!["*"]).is_catch_all());
    }
}
