use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

const SLIDE_PREFIX: &str = "ppt/slides/slide";
const PRESENTATION: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Text of every top-level shape on every slide, in slide order.
/// A shape's paragraphs are joined by newlines, and so are the shapes.
pub fn extract(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("Failed to open PPTX archive")?;

    let mut texts = Vec::new();
    for name in slide_parts(&mut archive)? {
        let xml = read_part(&mut archive, &name)?
            .with_context(|| format!("Missing slide {}", name))?;
        texts.extend(slide_shape_texts(&xml).with_context(|| format!("Malformed {}", name))?);
    }

    Ok(texts.join("\n"))
}

/// Slide part names in presentation order. The order comes from `p:sldIdLst`;
/// archives without a usable list fall back to the slide part numbers.
fn slide_parts<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let listed = match (read_part(archive, PRESENTATION)?, read_part(archive, PRESENTATION_RELS)?) {
        (Some(presentation), Some(rels)) => {
            let targets = relationship_targets(&rels).context("Malformed presentation relationships")?;
            slide_relationship_ids(&presentation)
                .context("Malformed presentation.xml")?
                .iter()
                .filter_map(|id| targets.get(id))
                .map(|target| part_name(target))
                .filter(|name| archive.index_for_name(name).is_some())
                .collect()
        }
        _ => Vec::new(),
    };
    if !listed.is_empty() {
        return Ok(listed);
    }

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);
    Ok(slides.into_iter().map(|(_, name)| name).collect())
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("Cannot open {}", name)),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml).with_context(|| format!("Cannot read {}", name))?;
    Ok(Some(xml))
}

// Relationship targets are relative to `ppt/` unless they start with `/`.
fn part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// The `r:id` of every `p:sldId`, in document order.
fn slide_relationship_ids(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                for attr in e.attributes() {
                    let attr = attr?;
                    // `id` alone is the numeric slide id; the relationship id is namespaced.
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        ids.push(attr.unescape_value()?.into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Maps relationship `Id` to `Target`.
fn relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

fn slide_shape_texts(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut shapes = Vec::new();
    // Paragraphs of the shape being read, if it is a top-level `p:sp`.
    let mut current: Option<Vec<String>> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                let parent = stack.last().map(Vec::as_slice);
                match (name.as_slice(), parent) {
                    (b"sp", Some(b"spTree")) => current = Some(Vec::new()),
                    (b"p", Some(b"txBody")) => {
                        if let Some(paragraphs) = current.as_mut() {
                            paragraphs.push(String::new());
                        }
                    }
                    (b"t", _) => in_text = current.is_some(),
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let parent = stack.last().map(Vec::as_slice);
                if let Some(paragraphs) = current.as_mut() {
                    match (e.local_name().as_ref(), parent) {
                        (b"p", Some(b"txBody")) => paragraphs.push(String::new()),
                        (b"br", _) => {
                            if let Some(last) = paragraphs.last_mut() {
                                last.push('\n');
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                if in_text {
                    if let Some(last) = current.as_mut().and_then(|p| p.last_mut()) {
                        last.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"sp" if stack.last().map(Vec::as_slice) == Some(&b"spTree"[..]) => {
                        if let Some(paragraphs) = current.take() {
                            shapes.push(paragraphs.join("\n"));
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    fn slide(shapes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
        )
    }

    fn shape(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:rPr lang=\"en-US\"/><a:t>{p}</a:t></a:r></a:p>"))
            .collect();
        format!("<p:sp><p:nvSpPr/><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{body}</p:txBody></p:sp>")
    }

    fn build_pptx(slides: &[(&str, String)]) -> anyhow::Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("[Content_Types].xml", SimpleFileOptions::default())?;
        writer.write_all(b"<Types/>")?;
        for (name, xml) in slides {
            writer.start_file(*name, SimpleFileOptions::default())?;
            writer.write_all(xml.as_bytes())?;
        }
        Ok(writer.finish()?.into_inner())
    }

    #[test]
    fn test_slides_in_numeric_order() -> anyhow::Result<()> {
        let bytes = build_pptx(&[
            ("ppt/slides/slide10.xml", slide(&shape(&["Tenth"]))),
            ("ppt/slides/slide2.xml", slide(&shape(&["Second"]))),
            ("ppt/slides/slide1.xml", slide(&format!("{}{}", shape(&["Title"]), shape(&["Line one", "Line two"])))),
            ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>".to_string()),
        ])?;

        let text = extract(&bytes)?;
        assert_eq!(text, "Title\nLine one\nLine two\nSecond\nTenth");
        Ok(())
    }

    const PRESENTATION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
<p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst>
</p:presentation>"#;

    const PRESENTATION_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="/ppt/slides/slide2.xml"/>
</Relationships>"#;

    #[test]
    fn test_slides_follow_presentation_order() -> anyhow::Result<()> {
        // slide2.xml was moved in front of slide1.xml in the editor.
        let bytes = build_pptx(&[
            (PRESENTATION, PRESENTATION_XML.to_string()),
            (PRESENTATION_RELS, PRESENTATION_RELS_XML.to_string()),
            ("ppt/slides/slide1.xml", slide(&shape(&["Details"]))),
            ("ppt/slides/slide2.xml", slide(&shape(&["Agenda"]))),
        ])?;

        assert_eq!(extract(&bytes)?, "Agenda\nDetails");
        Ok(())
    }

    #[test]
    fn test_slide_relationship_ids() -> anyhow::Result<()> {
        assert_eq!(slide_relationship_ids(PRESENTATION_XML)?, vec!["rId3", "rId2"]);
        let targets = relationship_targets(PRESENTATION_RELS_XML)?;
        assert_eq!(targets.get("rId2").map(String::as_str), Some("slides/slide1.xml"));
        assert_eq!(part_name("slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(part_name("/ppt/slides/slide2.xml"), "ppt/slides/slide2.xml");
        Ok(())
    }

    #[test]
    fn test_grouped_shapes_and_escapes() -> anyhow::Result<()> {
        let grouped = format!("<p:grpSp><p:nvGrpSpPr/>{}</p:grpSp>", shape(&["hidden in group"]));
        let xml = slide(&format!("{}{}", shape(&["Fish &amp; Chips"]), grouped));
        let bytes = build_pptx(&[("ppt/slides/slide1.xml", xml)])?;

        assert_eq!(extract(&bytes)?, "Fish & Chips");
        Ok(())
    }

    #[test]
    fn test_slide_number() {
        assert_eq!(slide_number("ppt/slides/slide7.xml"), Some(7));
        assert_eq!(slide_number("ppt/slides/_rels/slide7.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }
}
