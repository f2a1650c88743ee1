//! Slide parsing and in-place text editing.
//!
//! A slide is kept as its original XML string plus an index of every
//! `<a:t>` element that belongs to a text run of a `p:sp` shape. Editing a
//! run only marks it dirty; [`Slide::to_xml`] splices the new (escaped)
//! text into the original document at the recorded byte spans, so every
//! other byte of the slide, geometry and styling included, survives
//! unchanged.

use super::{PresentationError, Result};
use quick_xml::Reader;
use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};

/// Byte range of a run's text inside the slide XML.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TextSpan {
    start: usize,
    end: usize,
    /// Qualified tag name when the element was written as `<a:t/>`
    self_closing: Option<String>,
}

/// A single run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    text: String,
    span: TextSpan,
    dirty: bool,
}

impl Run {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the run's text. Formatting of the run is untouched.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.dirty = true;
        }
    }
}

/// A paragraph: an ordered list of runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    runs: Vec<Run>,
}

impl Paragraph {
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn runs_mut(&mut self) -> &mut [Run] {
        &mut self.runs
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// The editable text of a shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBody {
    paragraphs: Vec<Paragraph>,
}

impl TextBody {
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn paragraphs_mut(&mut self) -> &mut [Paragraph] {
        &mut self.paragraphs
    }

    /// Full text, paragraphs separated by `\n`
    pub fn text(&self) -> String {
        self.paragraphs.iter().map(Paragraph::text).collect::<Vec<_>>().join("\n")
    }

    /// Iterate every run of every paragraph
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.paragraphs.iter_mut().flat_map(|p| p.runs.iter_mut())
    }
}

/// A shape on a slide.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    name: String,
    text_body: Option<TextBody>,
}

impl Shape {
    /// Name from the shape's `cNvPr`, e.g. "TextBox 3"
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text_body(&self) -> Option<&TextBody> {
        self.text_body.as_ref()
    }

    pub fn text_body_mut(&mut self) -> Option<&mut TextBody> {
        self.text_body.as_mut()
    }

    pub fn has_text(&self) -> bool {
        self.text_body.is_some()
    }

    /// Full text, or an empty string for shapes without a text body
    pub fn text(&self) -> String {
        self.text_body.as_ref().map(TextBody::text).unwrap_or_default()
    }
}

/// One slide part of the presentation package.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    part_name: String,
    xml: String,
    shapes: Vec<Shape>,
}

impl Slide {
    /// Parse a slide part (e.g. `ppt/slides/slide1.xml`).
    pub fn parse(part_name: impl Into<String>, xml: String) -> Result<Self> {
        let part_name = part_name.into();
        let shapes = parse_shapes(&xml).map_err(|e| match e {
            PresentationError::Xml(msg) => PresentationError::Xml(format!("{}: {}", part_name, msg)),
            other => other,
        })?;
        Ok(Slide { part_name, xml, shapes })
    }

    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shapes_mut(&mut self) -> &mut [Shape] {
        &mut self.shapes
    }

    /// Whether any run on this slide was edited
    pub fn is_modified(&self) -> bool {
        self.runs().any(|r| r.dirty)
    }

    fn runs(&self) -> impl Iterator<Item = &Run> {
        self.shapes
            .iter()
            .filter_map(|s| s.text_body.as_ref())
            .flat_map(|b| b.paragraphs.iter())
            .flat_map(|p| p.runs.iter())
    }

    /// Serialize the slide, splicing edited run text into the original XML.
    pub fn to_xml(&self) -> String {
        let mut edits: Vec<&Run> = self.runs().filter(|r| r.dirty).collect();
        if edits.is_empty() {
            return self.xml.clone();
        }
        edits.sort_by_key(|r| r.span.start);

        let mut out = String::with_capacity(self.xml.len() + 64);
        let mut cursor = 0;
        for run in edits {
            out.push_str(&self.xml[cursor..run.span.start]);
            let escaped = partial_escape(&run.text);
            match &run.span.self_closing {
                Some(tag) => {
                    out.push('<');
                    out.push_str(tag);
                    out.push('>');
                    out.push_str(&escaped);
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                None => out.push_str(&escaped),
            }
            cursor = run.span.end;
        }
        out.push_str(&self.xml[cursor..]);
        out
    }
}

fn shape_name(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"name")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn parse_shapes(xml: &str) -> Result<Vec<Shape>> {
    let mut reader = Reader::from_str(xml);

    let mut shapes = Vec::new();
    let mut shape: Option<Shape> = None;
    let mut body: Option<TextBody> = None;
    let mut paragraph: Option<Paragraph> = None;
    let mut in_run = false;
    let mut text_start: Option<usize> = None;

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sp" => shape = Some(Shape::default()),
                b"cNvPr" => {
                    if let (Some(s), Some(name)) = (shape.as_mut(), shape_name(&e)) {
                        s.name = name;
                    }
                }
                b"txBody" if shape.is_some() => body = Some(TextBody::default()),
                b"p" if body.is_some() => paragraph = Some(Paragraph::default()),
                b"r" if paragraph.is_some() => in_run = true,
                b"t" if in_run => text_start = Some(reader.buffer_position() as usize),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"cNvPr" => {
                    if let (Some(s), Some(name)) = (shape.as_mut(), shape_name(&e)) {
                        s.name = name;
                    }
                }
                b"txBody" if shape.is_some() => {
                    if let Some(s) = shape.as_mut() {
                        s.text_body = Some(TextBody::default());
                    }
                }
                b"p" => {
                    if let Some(b) = body.as_mut() {
                        b.paragraphs.push(Paragraph::default());
                    }
                }
                b"t" if in_run => {
                    if let Some(p) = paragraph.as_mut() {
                        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        p.runs.push(Run {
                            text: String::new(),
                            span: TextSpan { start: before, end: reader.buffer_position() as usize, self_closing: Some(tag) },
                            dirty: false,
                        });
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => {
                    if let (Some(start), Some(p)) = (text_start.take(), paragraph.as_mut()) {
                        let raw = &xml[start..before];
                        let text = unescape(raw).map_err(|e| PresentationError::Xml(e.to_string()))?;
                        p.runs.push(Run {
                            text: text.into_owned(),
                            span: TextSpan { start, end: before, self_closing: None },
                            dirty: false,
                        });
                    }
                }
                b"r" => in_run = false,
                b"p" => {
                    if let (Some(p), Some(b)) = (paragraph.take(), body.as_mut()) {
                        b.paragraphs.push(p);
                    }
                }
                b"txBody" => {
                    if let (Some(b), Some(s)) = (body.take(), shape.as_mut()) {
                        s.text_body = Some(b);
                    }
                }
                b"sp" => {
                    if let Some(s) = shape.take() {
                        shapes.push(s);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PresentationError::Xml(format!(
                    "parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(shapes)
}
