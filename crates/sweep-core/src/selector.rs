//! CSS-like compound selectors
//!
//! Covers what the ad catalog needs and nothing more: an optional type
//! selector (or `*`) followed by any number of `#id`, `.class`, `[attr]` and
//! `[attr="value"]` parts. Combinators are rejected, so matching never has to
//! walk ancestors.

use std::fmt;

/// Error type for selector parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,
    #[error("Unexpected character '{ch}' at offset {offset} in '{selector}'")]
    UnexpectedChar {
        selector: String,
        ch: char,
        offset: usize,
    },
    #[error("Combinators are not supported: '{0}'")]
    Combinator(String),
    #[error("Unterminated attribute selector: '{0}'")]
    UnterminatedAttribute(String),
}

/// Read-only view of an element, enough to evaluate a [`Selector`].
pub trait ElementView {
    fn tag_name(&self) -> &str;
    fn id(&self) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// `[name]` or `[name="value"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub value: Option<String>,
}

/// A single compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
}

impl Selector {
    /// Parse one compound selector.
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        let source = text.trim();
        if source.is_empty() {
            return Err(SelectorError::Empty);
        }

        let bytes = source.as_bytes();
        let mut pos = 0usize;
        let mut selector = Selector {
            source: source.to_string(),
            tag: None,
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
        };

        if bytes[0] == b'*' {
            pos = 1;
        } else {
            let tag = read_ident(source, &mut pos);
            if !tag.is_empty() {
                selector.tag = Some(tag.to_ascii_lowercase());
            }
        }

        while pos < bytes.len() {
            match bytes[pos] {
                b'#' => {
                    pos += 1;
                    let id = read_ident(source, &mut pos);
                    if id.is_empty() {
                        return Err(unexpected(source, pos));
                    }
                    selector.id = Some(id.to_string());
                }
                b'.' => {
                    pos += 1;
                    let class = read_ident(source, &mut pos);
                    if class.is_empty() {
                        return Err(unexpected(source, pos));
                    }
                    selector.classes.push(class.to_string());
                }
                b'[' => {
                    pos += 1;
                    let attribute = parse_attribute(source, &mut pos)?;
                    selector.attributes.push(attribute);
                }
                b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'+' | b'~' => {
                    return Err(SelectorError::Combinator(source.to_string()));
                }
                _ => return Err(unexpected(source, pos)),
            }
        }

        Ok(selector)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Lowercased type selector, `None` for `*` or when omitted.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn attributes(&self) -> &[AttributeMatch] {
        &self.attributes
    }

    /// Check whether `element` satisfies every part of this selector.
    pub fn matches<E: ElementView + ?Sized>(&self, element: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }

        self.attributes.iter().all(|attr| {
            match (attr.value.as_deref(), element.attribute(&attr.name)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(expected), Some(actual)) => expected == actual,
            }
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Ordered union of selectors.
///
/// Keeps the rendered selector list around so hosts with a native
/// `querySelectorAll` never re-join it on the hot path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSet {
    selectors: Vec<Selector>,
    css: String,
}

impl SelectorSet {
    /// Parse every entry, failing on the first invalid one.
    pub fn parse<I, S>(sources: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selectors = sources
            .into_iter()
            .map(|source| Selector::parse(source.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_selectors(selectors))
    }

    /// Parse every entry, skipping (and logging) invalid ones.
    pub fn lenient<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selectors = Vec::new();
        for source in sources {
            match Selector::parse(source.as_ref()) {
                Ok(selector) => selectors.push(selector),
                Err(e) => log::warn!("Skipping selector: {}", e),
            }
        }
        Self::from_selectors(selectors)
    }

    /// Build a set, dropping duplicate selectors while keeping first-seen order.
    pub fn from_selectors(selectors: Vec<Selector>) -> Self {
        let mut unique: Vec<Selector> = Vec::with_capacity(selectors.len());
        for selector in selectors {
            if !unique.iter().any(|seen| seen.source == selector.source) {
                unique.push(selector);
            }
        }

        let css = unique
            .iter()
            .map(Selector::source)
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            selectors: unique,
            css,
        }
    }

    /// Selector list suitable for `querySelectorAll`.
    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }

    pub fn matches<E: ElementView + ?Sized>(&self, element: &E) -> bool {
        self.selectors.iter().any(|selector| selector.matches(element))
    }
}

impl fmt::Display for SelectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80
}

fn read_ident<'a>(source: &'a str, pos: &mut usize) -> &'a str {
    let bytes = source.as_bytes();
    let start = *pos;
    while *pos < bytes.len() && is_ident_byte(bytes[*pos]) {
        *pos += 1;
    }
    &source[start..*pos]
}

fn skip_whitespace(source: &str, pos: &mut usize) {
    let bytes = source.as_bytes();
    while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
}

fn unexpected(source: &str, pos: usize) -> SelectorError {
    match source[pos..].chars().next() {
        Some(ch) => SelectorError::UnexpectedChar {
            selector: source.to_string(),
            ch,
            offset: pos,
        },
        None => SelectorError::UnexpectedChar {
            selector: source.to_string(),
            ch: '\0',
            offset: pos,
        },
    }
}

fn unterminated_or_unexpected(source: &str, pos: usize) -> SelectorError {
    if pos >= source.len() {
        SelectorError::UnterminatedAttribute(source.to_string())
    } else {
        unexpected(source, pos)
    }
}

fn parse_attribute(source: &str, pos: &mut usize) -> Result<AttributeMatch, SelectorError> {
    let bytes = source.as_bytes();

    skip_whitespace(source, pos);
    let name = read_ident(source, pos);
    if name.is_empty() {
        return Err(unterminated_or_unexpected(source, *pos));
    }
    let name = name.to_ascii_lowercase();
    skip_whitespace(source, pos);

    let value = match bytes.get(*pos) {
        Some(b']') => None,
        Some(b'=') => {
            *pos += 1;
            skip_whitespace(source, pos);
            match bytes.get(*pos) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let start = *pos + 1;
                    let len = source[start..]
                        .find(quote as char)
                        .ok_or_else(|| SelectorError::UnterminatedAttribute(source.to_string()))?;
                    *pos = start + len + 1;
                    Some(source[start..start + len].to_string())
                }
                _ => {
                    let value = read_ident(source, pos);
                    if value.is_empty() {
                        return Err(unterminated_or_unexpected(source, *pos));
                    }
                    Some(value.to_string())
                }
            }
        }
        _ => return Err(unterminated_or_unexpected(source, *pos)),
    };

    skip_whitespace(source, pos);
    match bytes.get(*pos) {
        Some(b']') => {
            *pos += 1;
            Ok(AttributeMatch { name, value })
        }
        _ => Err(unterminated_or_unexpected(source, *pos)),
    }
}
