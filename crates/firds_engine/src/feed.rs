use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// File-type code of the derivative-instrument delta file.
pub const DLTINS_FILE_TYPE: &str = "DLTINS";

/// One `doc` entry of the search-result listing. Only the two string
/// fields the locator cares about are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub file_type: Option<String>,
    pub download_link: Option<String>,
}

impl FeedDocument {
    fn matches(&self, file_type: &str) -> bool {
        self.file_type.as_deref() == Some(file_type)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("malformed results document: {0}")]
    Parse(String),
    #[error("no document with file type {file_type} offers a download link")]
    LinkNotFound { file_type: String },
}

/// Scan the search-result listing for the first `doc` whose `file_type`
/// field equals `file_type` and return its `download_link`.
///
/// Documents are visited in document order and the first match wins. A
/// matching document without a `download_link` field is skipped; if no
/// later document qualifies the result is [`FeedError::LinkNotFound`].
pub fn locate_download_link(xml: &str, file_type: &str) -> Result<String, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut result_depth = 0usize;
    let mut current: Option<FeedDocument> = None;
    let mut field: Option<String> = None;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|err| FeedError::Parse(err.to_string()))?
        {
            Event::Start(e) => match local_name(&e).as_str() {
                "result" => result_depth += 1,
                "doc" if result_depth > 0 && current.is_none() => {
                    current = Some(FeedDocument::default());
                }
                "str" if current.is_some() => {
                    field = str_field_name(&e)?;
                }
                _ => {}
            },
            Event::Text(e) => {
                if let (Some(doc), Some(name)) = (&mut current, &field) {
                    let value = e.unescape().unwrap_or_default().trim().to_string();
                    match name.as_str() {
                        "file_type" => doc.file_type = Some(value),
                        "download_link" => doc.download_link = Some(value),
                        _ => {}
                    }
                }
            }
            Event::End(e) => match local_name_end(e.local_name().as_ref()).as_str() {
                "result" => result_depth = result_depth.saturating_sub(1),
                "doc" => {
                    if let Some(doc) = current.take() {
                        if doc.matches(file_type) {
                            if let Some(link) = doc.download_link {
                                return Ok(link);
                            }
                        }
                    }
                }
                "str" => field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Err(FeedError::LinkNotFound {
        file_type: file_type.to_string(),
    })
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn local_name_end(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_string()
}

fn str_field_name(e: &BytesStart<'_>) -> Result<Option<String>, FeedError> {
    let attr = e
        .try_get_attribute("name")
        .map_err(|err| FeedError::Parse(err.to_string()))?;
    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|err| FeedError::Parse(err.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}
