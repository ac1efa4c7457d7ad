//! Office Open XML readers (docx, pptx, xlsx)
//!
//! These formats are zip archives of XML parts. Only the parts needed for
//! plain text are read; styles, images and formulas are ignored.

use anyhow::{anyhow, Context, Result};
use quick_xml::escape::{resolve_xml_entity, unescape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// Largest archive member we are willing to inflate
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn open(bytes: &[u8]) -> Result<Archive<'_>> {
    ZipArchive::new(Cursor::new(bytes)).context("not a valid Office document (zip archive expected)")
}

/// Read an archive member as UTF-8; `None` when it does not exist
fn read_part(archive: &mut Archive<'_>, name: &str) -> Result<Option<String>> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(anyhow!("failed to open {}: {}", name, e)),
    };

    if file.size() > MAX_PART_BYTES {
        return Err(anyhow!("{} is too large ({} bytes)", name, file.size()));
    }

    let mut xml = String::new();
    file.take(MAX_PART_BYTES)
        .read_to_string(&mut xml)
        .with_context(|| format!("failed to read {}", name))?;
    Ok(Some(xml))
}

fn require_part(archive: &mut Archive<'_>, name: &str) -> Result<String> {
    read_part(archive, name)?.ok_or_else(|| anyhow!("missing {}", name))
}

fn resolve_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_xml_entity(name).map(str::to_string)
}

/// Append character data carried by `event` to `out`
fn push_text(out: &mut String, event: &Event<'_>) {
    match event {
        Event::Text(text) => {
            let raw = String::from_utf8_lossy(text);
            match unescape(&raw) {
                Ok(value) => out.push_str(&value),
                Err(_) => out.push_str(&raw),
            }
        }
        Event::CData(data) => out.push_str(&String::from_utf8_lossy(data)),
        Event::GeneralRef(reference) => {
            let name = String::from_utf8_lossy(reference);
            if let Some(resolved) = resolve_entity(&name) {
                out.push_str(&resolved);
            }
        }
        _ => {}
    }
}

fn attr_value(attr: &Attribute<'_>) -> String {
    let raw = String::from_utf8_lossy(&attr.value);
    match unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

fn attribute(element: &BytesStart<'_>, local_name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local_name)
        .map(|a| attr_value(&a))
}

/// Collect paragraph text from WordprocessingML or DrawingML
///
/// `para` and `text` are the local element names of paragraphs and runs of
/// text. Blank paragraphs are dropped.
fn paragraphs(xml: &str, para: &[u8], text: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        let event = reader.read_event().context("malformed XML")?;
        match &event {
            Event::Start(e) if e.local_name().as_ref() == text => in_text = true,
            Event::End(e) if e.local_name().as_ref() == text => in_text = false,
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == para => {
                let line = std::mem::take(&mut current);
                if !line.trim().is_empty() {
                    out.push(line);
                }
            }
            Event::Eof => break,
            _ if in_text => push_text(&mut current, &event),
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        out.push(current);
    }
    Ok(out)
}

/// Text of every non-blank paragraph in a Word document
pub fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = open(bytes)?;
    let xml = require_part(&mut archive, "word/document.xml")?;
    Ok(paragraphs(&xml, b"p", b"t")?.join("\n"))
}

fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Text of every shape on every slide, in slide order
pub fn pptx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = open(bytes)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort();

    if slides.is_empty() {
        return Err(anyhow!("presentation has no slides"));
    }

    let mut lines = Vec::new();
    for (_, name) in slides {
        let xml = require_part(&mut archive, &name)?;
        lines.extend(paragraphs(&xml, b"p", b"t")?);
    }
    Ok(lines.join("\n"))
}

/// One worksheet as a grid of cell strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    /// Sheet name as shown in the workbook
    pub name: String,
    /// Rows in order; short rows are not padded
    pub rows: Vec<Vec<String>>,
}

/// Read every worksheet of an Excel workbook in tab order
pub fn xlsx_sheets(bytes: &[u8]) -> Result<Vec<Worksheet>> {
    let mut archive = open(bytes)?;

    let workbook = require_part(&mut archive, "xl/workbook.xml")?;
    let sheets = workbook_sheets(&workbook)?;
    if sheets.is_empty() {
        return Err(anyhow!("workbook has no sheets"));
    }

    let targets = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
        Some(xml) => relationship_targets(&xml)?,
        None => HashMap::new(),
    };

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut out = Vec::with_capacity(sheets.len());
    for (index, (name, rel_id)) in sheets.into_iter().enumerate() {
        let path = rel_id
            .and_then(|id| targets.get(&id))
            .map(|target| part_path(target))
            .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));

        let xml = require_part(&mut archive, &path)
            .with_context(|| format!("sheet {:?}", name))?;
        let rows = sheet_rows(&xml, &shared).with_context(|| format!("sheet {:?}", name))?;
        out.push(Worksheet { name, rows });
    }
    Ok(out)
}

fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// `(name, relationship id)` for each `<sheet>` in workbook.xml
fn workbook_sheets(xml: &str) -> Result<Vec<(String, Option<String>)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event().context("malformed workbook.xml")? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name").unwrap_or_else(|| format!("Sheet{}", sheets.len() + 1));
                sheets.push((name, attribute(&e, b"id")));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event().context("malformed workbook relationships")? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id"), attribute(&e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

fn shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        let event = reader.read_event().context("malformed sharedStrings.xml")?;
        match &event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ if in_text => push_text(&mut current, &event),
            _ => {}
        }
    }
    Ok(strings)
}

/// Widest worksheet Excel allows (column XFD)
const MAX_COLUMNS: usize = 16_384;

/// Zero-based column index of a cell reference such as `C7`
///
/// References beyond column XFD are rejected rather than widening the row.
fn column_index(reference: &str) -> Result<Option<usize>> {
    let letters = reference.chars().take_while(char::is_ascii_alphabetic);
    let mut index = 0usize;
    let mut seen = false;
    for c in letters {
        seen = true;
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .filter(|i| *i <= MAX_COLUMNS)
            .ok_or_else(|| anyhow!("cell reference out of range: {}", reference))?;
    }
    Ok(seen.then(|| index - 1))
}

#[derive(Default)]
struct PendingCell {
    column: Option<usize>,
    kind: Option<String>,
    value: String,
}

impl PendingCell {
    fn resolve(self, shared: &[String]) -> String {
        match self.kind.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i).cloned())
                .unwrap_or_default(),
            Some("b") => match self.value.trim() {
                "1" => "TRUE".to_string(),
                _ => "FALSE".to_string(),
            },
            _ => self.value,
        }
    }
}

fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        let event = reader.read_event().context("malformed worksheet XML")?;
        match &event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row = Vec::new(),
                b"c" => {
                    let column = match attribute(e, b"r") {
                        Some(reference) => column_index(&reference)?,
                        None => None,
                    };
                    cell = Some(PendingCell {
                        column,
                        kind: attribute(e, b"t"),
                        value: String::new(),
                    })
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(done) = cell.take() {
                        let column = done.column.unwrap_or(row.len());
                        if column >= MAX_COLUMNS {
                            return Err(anyhow!("cell reference out of range: row wider than XFD"));
                        }
                        let value = done.resolve(shared);
                        if row.len() <= column {
                            row.resize(column + 1, String::new());
                        }
                        row[column] = value;
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ if in_value => {
                if let Some(pending) = cell.as_mut() {
                    push_text(&mut pending.value, &event);
                }
            }
            _ => {}
        }
    }
    Ok(rows)
}
