//! Strict parser for a single markup element on one line.
//!
//! Accepts `<Name a="1" b='2' />` or `<Name a="1">text</Name>` and nothing
//! else: no child elements, no comments, no trailing content. Attribute
//! values are entity-decoded.

/// A parsed element: its tag name and attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parse `input` (surrounding whitespace allowed) as exactly one element.
pub fn parse_element(input: &str) -> Option<Element> {
    let mut cursor = Cursor::new(input.trim());

    cursor.expect('<')?;
    let name = cursor.name()?;
    let mut attributes: Vec<(String, String)> = Vec::new();

    loop {
        let had_space = cursor.skip_whitespace();
        if cursor.eat_str("/>") {
            break;
        }
        if cursor.eat('>') {
            let text = cursor.take_until('<')?;
            decode_entities(text)?;
            cursor.expect('<')?;
            cursor.expect('/')?;
            if cursor.name()? != name {
                return None;
            }
            cursor.skip_whitespace();
            cursor.expect('>')?;
            break;
        }
        if !had_space {
            return None;
        }

        let key = cursor.name()?;
        cursor.skip_whitespace();
        cursor.expect('=')?;
        cursor.skip_whitespace();
        let quote = cursor.next_char().filter(|c| *c == '"' || *c == '\'')?;
        let raw = cursor.take_until(quote)?;
        cursor.expect(quote)?;
        if raw.contains('<') || attributes.iter().any(|(k, _)| *k == key) {
            return None;
        }
        attributes.push((key, decode_entities(raw)?));
    }

    cursor.is_empty().then_some(Element { name, attributes })
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.rest.chars().next()?;
        self.rest = &self.rest[c.len_utf8()..];
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        self.eat(expected).then_some(())
    }

    /// Returns whether any whitespace was consumed.
    fn skip_whitespace(&mut self) -> bool {
        let trimmed = self.rest.trim_start();
        let skipped = trimmed.len() != self.rest.len();
        self.rest = trimmed;
        skipped
    }

    fn name(&mut self) -> Option<String> {
        let mut chars = self.rest.char_indices();
        let (_, first) = chars.next()?;
        if !(first.is_alphabetic() || first == '_' || first == ':') {
            return None;
        }
        let end = chars
            .find(|(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')))
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let name = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        Some(name)
    }

    fn take_until(&mut self, stop: char) -> Option<&'a str> {
        let end = self.rest.find(stop)?;
        let taken = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(taken)
    }
}

/// Decode the predefined and numeric character entities; `None` on anything
/// that is not a well-formed reference.
fn decode_entities(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';')?;
        let entity = &after[..semi];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()?
                } else {
                    entity.strip_prefix('#')?.parse::<u32>().ok()?
                };
                char::from_u32(code)?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }

    out.push_str(rest);
    Some(out)
}
