use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use super::RenderError;

/// A4 in millimetres; layout math happens in mm like a paper form.
pub(crate) const PAGE_WIDTH_MM: f32 = 210.0;
pub(crate) const PAGE_HEIGHT_MM: f32 = 297.0;
const POINTS_PER_MM: f32 = 72.0 / 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    const fn resource(self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
            FontStyle::Italic => "F3",
        }
    }
}

/// Positioned drawing instruction, coordinates in mm from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
        right_aligned: bool,
        value: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
    },
}

impl Element {
    pub fn text_value(&self) -> Option<&str> {
        match self {
            Element::Text { value, .. } => Some(value.as_str()),
            Element::Rule { .. } => None,
        }
    }
}

/// Top margin and the lowest baseline body text may use before a page break.
pub(crate) const MARGIN_MM: f32 = 20.0;
pub const BODY_LIMIT_MM: f32 = PAGE_HEIGHT_MM - 25.0;

/// Builder mirroring how the agreement is laid out top to bottom, one page at a time.
#[derive(Debug)]
pub(crate) struct PageBuilder {
    pages: Vec<Vec<Element>>,
    size: f32,
    style: FontStyle,
}

impl PageBuilder {
    pub(crate) fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            size: 11.0,
            style: FontStyle::Regular,
        }
    }

    pub(crate) fn font(&mut self, size: f32, style: FontStyle) -> &mut Self {
        self.size = size;
        self.style = style;
        self
    }

    pub(crate) fn text(&mut self, x: f32, y: f32, value: impl Into<String>) -> &mut Self {
        self.push_text(x, y, value.into(), false)
    }

    pub(crate) fn text_right(&mut self, x: f32, y: f32, value: impl Into<String>) -> &mut Self {
        self.push_text(x, y, value.into(), true)
    }

    pub(crate) fn rule(&mut self, x1: f32, x2: f32, y: f32) -> &mut Self {
        self.current().push(Element::Rule { x1, x2, y });
        self
    }

    /// Returns the baseline to continue from, starting a new page when `needed` millimetres
    /// would run past the body area.
    pub(crate) fn reserve(&mut self, y: f32, needed: f32) -> f32 {
        if y + needed <= BODY_LIMIT_MM {
            return y;
        }
        self.pages.push(Vec::new());
        MARGIN_MM
    }

    /// Stamp the same element on every page produced so far.
    pub(crate) fn on_every_page(&mut self, element: Element) -> &mut Self {
        for page in &mut self.pages {
            page.push(element.clone());
        }
        self
    }

    pub(crate) fn text_element(&self, x: f32, y: f32, value: impl Into<String>) -> Element {
        Element::Text {
            x,
            y,
            size: self.size,
            style: self.style,
            right_aligned: false,
            value: value.into(),
        }
    }

    fn current(&mut self) -> &mut Vec<Element> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn push_text(&mut self, x: f32, y: f32, value: String, right_aligned: bool) -> &mut Self {
        let element = Element::Text {
            x,
            y,
            size: self.size,
            style: self.style,
            right_aligned,
            value,
        };
        self.current().push(element);
        self
    }

    pub(crate) fn finish(self) -> Vec<Vec<Element>> {
        self.pages
    }
}

/// Greedy word wrap by character count.
pub(crate) fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;
    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        let needed = if current.is_empty() {
            word_chars
        } else {
            current_chars + 1 + word_chars
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Transcode to the WinAnsi (cp1252) bytes the standard fonts are declared with.
/// Characters outside that code page are drawn as `?`.
pub(crate) fn win_ansi(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|ch| match ch {
            ' '..='~' => ch as u8,
            '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            _ => b'?',
        })
        .collect()
}

fn to_points(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

fn from_top(mm: f32) -> f32 {
    to_points(PAGE_HEIGHT_MM - mm)
}

// Helvetica averages roughly half an em per glyph; close enough for right alignment.
fn approximate_width(value: &str, size: f32) -> f32 {
    value.chars().count() as f32 * size * 0.5
}

fn operations(elements: &[Element]) -> Vec<Operation> {
    let mut ops = vec![Operation::new("w", vec![0.5f32.into()])];
    for element in elements {
        match element {
            Element::Text {
                x,
                y,
                size,
                style,
                right_aligned,
                value,
            } => {
                let mut left = to_points(*x);
                if *right_aligned {
                    left -= approximate_width(value, *size);
                }
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![style.resource().into(), (*size).into()],
                ));
                ops.push(Operation::new("Td", vec![left.into(), from_top(*y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(win_ansi(value), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            Element::Rule { x1, x2, y } => {
                ops.push(Operation::new(
                    "m",
                    vec![to_points(*x1).into(), from_top(*y).into()],
                ));
                ops.push(Operation::new(
                    "l",
                    vec![to_points(*x2).into(), from_top(*y).into()],
                ));
                ops.push(Operation::new("S", vec![]));
            }
        }
    }
    ops
}

/// Encode pages of elements as a PDF 1.5 document.
pub(crate) fn encode_pdf(pages: &[Vec<Element>]) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let italic = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Oblique",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
            "F3" => italic,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for elements in pages {
        let content = Content {
            operations: operations(elements),
        };
        let encoded = content
            .encode()
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            to_points(PAGE_WIDTH_MM).into(),
            to_points(PAGE_HEIGHT_MM).into(),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(tree));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|err| RenderError::Pdf(err.to_string()))?;
    Ok(buffer)
}
