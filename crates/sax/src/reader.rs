//! Feeds `quick-xml` events into a [`Session`].

use {
    crate::{
        error::SaxError,
        session::{Parsed, Session, Target},
        template::Template,
    },
    quick_xml::{escape::resolve_xml_entity, events::BytesStart, events::Event, Reader},
    std::io::BufRead,
    tracing::debug,
};

/// Maps an in-memory document.
pub fn parse<T: Target>(input: &[u8], template: &Template, target: T) -> Result<Parsed<T>, T::Error> {
    parse_reader(input, template, target)
}

/// Maps a document read from `input`.
///
/// Text split across entity references or CDATA sections is delivered to
/// the session as one chunk per run. The doctype becomes a `doctype` element
/// carrying its declaration in a `value` attribute.
pub fn parse_reader<R: BufRead, T: Target>(
    input: R,
    template: &Template,
    target: T,
) -> Result<Parsed<T>, T::Error> {
    let mut reader = Reader::from_reader(input);
    let mut session = Session::new(template, target);
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| SaxError::xml(position, e))?;
        match event {
            Event::Start(e) => {
                flush(&mut session, &mut text);
                open(&mut session, position, &e)?;
            }
            Event::Empty(e) => {
                flush(&mut session, &mut text);
                let tag = open(&mut session, position, &e)?;
                session.end_element(&tag)?;
            }
            Event::End(e) => {
                flush(&mut session, &mut text);
                session.end_element(&utf8(position, e.name().as_ref())?)?;
            }
            Event::Text(e) => {
                text.push_str(&e.decode().map_err(|e| SaxError::xml(position, e))?);
            }
            Event::CData(e) => text.push_str(&utf8(position, e.as_ref())?),
            Event::GeneralRef(e) => {
                let name = e.decode().map_err(|e| SaxError::xml(position, e))?;
                text.push_str(&resolve_entity(position, &name)?);
            }
            Event::DocType(e) => {
                flush(&mut session, &mut text);
                let declaration = utf8(position, e.as_ref())?;
                session.start_element("doctype")?;
                session.attribute("value", declaration.trim());
                session.end_element("doctype")?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    flush(&mut session, &mut text);
    debug!(depth = session.depth(), "reached end of document");
    session.finish()
}

fn flush<T: Target>(session: &mut Session<'_, T>, text: &mut String) {
    if !text.is_empty() {
        session.text(text);
        text.clear();
    }
}

fn open<T: Target>(
    session: &mut Session<'_, T>,
    position: u64,
    start: &BytesStart<'_>,
) -> Result<String, T::Error> {
    let tag = utf8(position, start.name().as_ref())?;
    session.start_element(&tag)?;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SaxError::xml(position, e))?;
        let key = utf8(position, attr.key.as_ref())?;
        let value = attr
            .unescape_value()
            .map_err(|e| SaxError::xml(position, e))?;
        session.attribute(&key, &value);
    }
    Ok(tag)
}

fn utf8(position: u64, bytes: &[u8]) -> Result<String, SaxError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| SaxError::xml(position, e))
}

fn resolve_entity(position: u64, raw: &str) -> Result<String, SaxError> {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return Ok(resolved.into());
    }
    if let Some(rest) = raw.strip_prefix('#') {
        let code = match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => rest.parse::<u32>(),
        }
        .map_err(|_| SaxError::xml(position, format!("invalid character reference &{raw};")))?;
        return char::from_u32(code)
            .map(String::from)
            .ok_or_else(|| SaxError::xml(position, format!("invalid code point {code}")));
    }
    Ok(format!("&{raw};"))
}
