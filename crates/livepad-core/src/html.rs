//! A small, lenient HTML tree: enough to find inline scripts, insert one into
//! the head and print the document back. Parsing never fails; malformed markup
//! is recovered the way browsers mostly do (unclosed elements close at the end,
//! stray end tags are ignored, unterminated constructs become text).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub doctype: Option<Doctype>,
    pub html: Element,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctype {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Raw source text, entities left as written.
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Raw value; an attribute written without `=` has an empty value.
    pub value: String,
}

const ROOT: &str = "#root";
const RAW_TEXT_TAGS: [&str; 4] = ["script", "style", "textarea", "title"];
const HEAD_TAGS: [&str; 8] = [
    "base", "link", "meta", "noscript", "script", "style", "template", "title",
];

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Concatenated text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
    }

    pub fn child_element_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    fn has_child_element(&self, name: &str) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, Node::Element(el) if el.name == name))
    }

    /// Visits every descendant element named `name` in document order.
    pub fn for_each_element_mut(&mut self, name: &str, f: &mut impl FnMut(&mut Element)) {
        for child in &mut self.children {
            if let Node::Element(el) = child {
                if el.name == name {
                    f(el);
                }
                el.for_each_element_mut(name, f);
            }
        }
    }

    pub fn count_elements(&self, name: &str) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Node::Element(el) => usize::from(el.name == name) + el.count_elements(name),
                _ => 0,
            })
            .sum()
    }
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let (doctype, top_level) = parse_nodes(html);
        Self {
            doctype,
            html: normalize(top_level),
        }
    }

    /// Inserts `node` as the first child of `<head>`.
    pub fn prepend_to_head(&mut self, node: Node) {
        ensure_head(&mut self.html);
        if let Some(head) = self.html.child_element_mut("head") {
            head.children.insert(0, node);
        }
    }

    /// `<!DOCTYPE ...>` line (when present) followed by the root's outer HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if let Some(doctype) = &self.doctype {
            out.push_str("<!DOCTYPE ");
            out.push_str(&doctype.name);
            if let Some(public_id) = &doctype.public_id {
                out.push_str(&format!(" PUBLIC \"{public_id}\""));
            }
            if let Some(system_id) = &doctype.system_id {
                out.push_str(&format!(" \"{system_id}\""));
            }
            out.push_str(">\n");
        }
        write_element(&self.html, &mut out);
        out
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&attr.value.replace('"', "&quot;"));
        out.push('"');
    }
    out.push('>');
    if is_void_tag(&el.name) {
        return;
    }
    for child in &el.children {
        match child {
            Node::Element(inner) => write_element(inner, out),
            Node::Text(text) => out.push_str(text),
            Node::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

fn parse_nodes(html: &str) -> (Option<Doctype>, Vec<Node>) {
    let bytes = html.as_bytes();
    let mut stack = vec![Element::new(ROOT)];
    let mut doctype = None;
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            let (comment, next) = match find_subslice(bytes, i + 4, b"-->") {
                Some(end) => (&html[i + 4..end], end + 3),
                None => (&html[i + 4..], bytes.len()),
            };
            push_node(&mut stack, Node::Comment(comment.to_string()));
            i = next;
            continue;
        }

        if starts_with_at(bytes, i, b"</") && bytes.get(i + 2).is_some_and(u8::is_ascii_alphabetic)
        {
            let (tag, next) = parse_end_tag(html, i);
            close_element(&mut stack, &tag);
            i = next;
            continue;
        }

        if bytes[i] == b'<' && matches!(bytes.get(i + 1), Some(b'!') | Some(b'?')) {
            let end = find_subslice(bytes, i, b">").map_or(bytes.len(), |e| e + 1);
            let decl = &html[i..end];
            if doctype.is_none() && starts_with_ignore_case(decl, "<!doctype") {
                doctype = Some(parse_doctype(decl));
            }
            i = end;
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            let Some(tag) = parse_start_tag(html, i) else {
                // Unterminated start tag: keep the rest as text.
                push_text(&mut stack, &html[i..]);
                break;
            };
            i = tag.next;
            if tag.name == "body" {
                close_element(&mut stack, "head");
            }
            // A trailing `/` only closes void and foreign (SVG/MathML) elements.
            let closes_itself = is_void_tag(&tag.name)
                || (tag.self_closing && in_foreign_content(&stack, &tag.name));
            let mut element = Element::new(tag.name.clone());
            element.attributes = tag.attributes;

            if RAW_TEXT_TAGS.contains(&tag.name.as_str()) && !closes_itself {
                let close = find_raw_end_tag(bytes, i, tag.name.as_bytes()).unwrap_or(bytes.len());
                element.set_text(&html[i..close]);
                push_node(&mut stack, Node::Element(element));
                i = if close < bytes.len() {
                    parse_end_tag(html, close).1
                } else {
                    close
                };
                continue;
            }

            if closes_itself {
                push_node(&mut stack, Node::Element(element));
            } else {
                stack.push(element);
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && !starts_markup(bytes, i) {
            i += 1;
        }
        push_text(&mut stack, &html[text_start..i]);
    }

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    let root = stack.pop().map(|el| el.children).unwrap_or_default();
    (doctype, root)
}

fn in_foreign_content(stack: &[Element], tag: &str) -> bool {
    let foreign = |name: &str| name == "svg" || name == "math";
    foreign(tag) || stack.iter().any(|el| foreign(&el.name))
}

fn starts_markup(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'<'
        && bytes
            .get(i + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn push_text(stack: &mut [Element], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        if let Some(Node::Text(prev)) = parent.children.last_mut() {
            prev.push_str(text);
        } else {
            parent.children.push(Node::Text(text.to_string()));
        }
    }
}

fn pop_into_parent(stack: &mut Vec<Element>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(done) = stack.pop() {
        push_node(stack, Node::Element(done));
    }
}

/// Closes the nearest open element named `tag`; a tag that is not open is
/// ignored.
fn close_element(stack: &mut Vec<Element>, tag: &str) {
    let Some(pos) = stack.iter().skip(1).rposition(|el| el.name == tag) else {
        return;
    };
    let target = pos + 1;
    while stack.len() > target {
        pop_into_parent(stack);
    }
}

struct StartTag {
    name: String,
    attributes: Vec<Attribute>,
    self_closing: bool,
    next: usize,
}

fn parse_start_tag(html: &str, at: usize) -> Option<StartTag> {
    let bytes = html.as_bytes();
    let mut i = at + 1;
    let name_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let name = html[name_start..i].to_ascii_lowercase();
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return None;
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            i += 1;
            if bytes.get(i) == Some(&b'>') {
                self_closing = true;
                i += 1;
                break;
            }
            continue;
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == attr_start {
            // A lone `=` or similar junk.
            i += 1;
            continue;
        }
        let attr_name = html[attr_start..i].to_ascii_lowercase();

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, &mut i)?
        } else {
            String::new()
        };

        if !attributes.iter().any(|a| a.name == attr_name) {
            attributes.push(Attribute {
                name: attr_name,
                value,
            });
        }
    }

    Some(StartTag {
        name,
        attributes,
        self_closing,
        next: i,
    })
}

fn parse_attr_value(html: &str, i: &mut usize) -> Option<String> {
    let bytes = html.as_bytes();
    if *i >= bytes.len() {
        return None;
    }
    if bytes[*i] == b'"' || bytes[*i] == b'\'' {
        let quote = bytes[*i];
        let start = *i + 1;
        let end = start + bytes[start..].iter().position(|b| *b == quote)?;
        *i = end + 1;
        return Some(html[start..end].to_string());
    }
    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        *i += 1;
    }
    Some(html[start..*i].to_string())
}

fn parse_end_tag(html: &str, at: usize) -> (String, usize) {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);
    let name_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let name = html[name_start..i].to_ascii_lowercase();
    let next = find_subslice(bytes, i, b">").map_or(bytes.len(), |e| e + 1);
    (name, next)
}

fn parse_doctype(decl: &str) -> Doctype {
    let inner = decl["<!doctype".len()..].trim_end_matches('>').trim();
    let (name, rest) = inner
        .split_once(|c: char| c.is_ascii_whitespace())
        .unwrap_or((inner, ""));
    let rest = rest.trim();

    let mut public_id = None;
    let mut system_id = None;
    if starts_with_ignore_case(rest, "public") {
        let mut quoted = quoted_strings(&rest["public".len()..]);
        public_id = quoted.next();
        system_id = quoted.next();
    } else if starts_with_ignore_case(rest, "system") {
        system_id = quoted_strings(&rest["system".len()..]).next();
    }

    Doctype {
        name: name.to_ascii_lowercase(),
        public_id: public_id.filter(|id| !id.is_empty()),
        system_id: system_id.filter(|id| !id.is_empty()),
    }
}

fn quoted_strings(input: &str) -> impl Iterator<Item = String> + '_ {
    let mut rest = input;
    std::iter::from_fn(move || {
        let start = rest.find(['"', '\''])?;
        let quote = rest[start..].chars().next()?;
        let body = &rest[start + 1..];
        let end = body.find(quote)?;
        let value = body[..end].to_string();
        rest = &body[end + 1..];
        Some(value)
    })
}

/// Wraps the top-level nodes into a single `<html>` that has a `<head>`.
///
/// Whitespace and comments outside the root element are dropped. When the
/// input has an `<html>` element, other top-level content before it moves to
/// the start of the head and content after it moves into the body. Without
/// one, leading head-only elements form the head and everything else the body.
fn normalize(top_level: Vec<Node>) -> Element {
    let html_pos = top_level
        .iter()
        .position(|n| matches!(n, Node::Element(el) if el.name == "html"));

    let mut html = match html_pos {
        Some(pos) => {
            let mut nodes = top_level;
            let after = nodes.split_off(pos + 1);
            let mut html = match nodes.pop() {
                Some(Node::Element(el)) => el,
                _ => Element::new("html"),
            };
            let before = nodes;
            ensure_head(&mut html);
            hoist_into_head(&mut html);
            let stray_before: Vec<Node> = before.into_iter().filter(is_content).collect();
            if let Some(head) = html.child_element_mut("head") {
                head.children.splice(0..0, stray_before);
            }
            let stray_after: Vec<Node> = after.into_iter().filter(is_content).collect();
            if !stray_after.is_empty() {
                match html.child_element_mut("body") {
                    Some(body) => body.children.extend(stray_after),
                    None => html.children.extend(stray_after),
                }
            }
            html
        }
        None => synthesize_html(top_level),
    };
    ensure_head(&mut html);
    html
}

fn synthesize_html(top_level: Vec<Node>) -> Element {
    let mut html = Element::new("html");
    let has_structure = top_level.iter().any(
        |n| matches!(n, Node::Element(el) if el.name == "head" || el.name == "body"),
    );
    if has_structure {
        html.children = top_level.into_iter().filter(is_content).collect();
        hoist_into_head(&mut html);
        return html;
    }

    let mut head = Element::new("head");
    let mut body = Element::new("body");
    let mut in_body = false;
    for node in top_level {
        let head_only = match &node {
            Node::Element(el) => HEAD_TAGS.contains(&el.name.as_str()),
            Node::Text(text) => text.trim().is_empty(),
            Node::Comment(_) => true,
        };
        if !in_body && head_only {
            if is_content(&node) {
                head.children.push(node);
            }
        } else {
            in_body = true;
            body.children.push(node);
        }
    }
    html.children.push(Node::Element(head));
    html.children.push(Node::Element(body));
    html
}

/// Moves elements that precede an explicit `<head>` to the start of it, the
/// way a browser parses `<script>` written ahead of `<head>`. Whitespace-only
/// prefixes stay where they are.
fn hoist_into_head(html: &mut Element) {
    let Some(head_pos) = html
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(el) if el.name == "head"))
    else {
        return;
    };
    let has_element_before = html.children[..head_pos]
        .iter()
        .any(|n| matches!(n, Node::Element(_)));
    if !has_element_before {
        return;
    }
    let moved: Vec<Node> = html
        .children
        .drain(..head_pos)
        .filter(is_content)
        .collect();
    if let Some(head) = html.child_element_mut("head") {
        head.children.splice(0..0, moved);
    }
}

fn ensure_head(html: &mut Element) {
    if !html.has_child_element("head") {
        html.children.insert(0, Node::Element(Element::new("head")));
    }
}

fn is_content(node: &Node) -> bool {
    match node {
        Node::Element(_) => true,
        Node::Text(text) => !text.trim().is_empty(),
        Node::Comment(_) => false,
    }
}

pub fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.get(at..at + needle.len()) == Some(needle)
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

fn find_raw_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + 2 + tag.len() <= bytes.len() {
        if bytes[i] == b'<' && bytes[i + 1] == b'/' {
            let name_end = i + 2 + tag.len();
            let name_matches = bytes[i + 2..name_end].eq_ignore_ascii_case(tag);
            let separated = bytes
                .get(name_end)
                .is_none_or(|b| !b.is_ascii_alphanumeric());
            if name_matches && separated {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}
