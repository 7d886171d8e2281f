use std::fs;
use std::path::Path;

use engine_logging::engine_trace;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Local tag name of the general-attributes group under a record node.
pub const GENERAL_ATTRIBUTES_TAG: &str = "FinInstrmGnlAttrbts";
/// Local tag name of the issuer field under a record node.
pub const ISSUER_TAG: &str = "Issr";

/// How an instrument record changed in this publication. All three
/// kinds are extracted identically; the kind is kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    New,
    Modified,
    Terminated,
}

impl RecordKind {
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "NewRcrd" => Some(Self::New),
            "ModfdRcrd" => Some(Self::Modified),
            "TermntdRcrd" => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// One extracted reference-data row. Fields are filled by explicit
/// local-name lookup, never by child order; a missing leaf stays `None`
/// and serializes as an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentRecord {
    pub id: Option<String>,
    pub full_name: Option<String>,
    pub classification: Option<String>,
    pub commodity_derivative: Option<String>,
    pub notional_currency: Option<String>,
    pub issuer: Option<String>,
}

impl InstrumentRecord {
    /// Cell values in output column order; `None` renders empty.
    pub fn columns(&self) -> [&str; 6] {
        [
            self.id.as_deref().unwrap_or(""),
            self.full_name.as_deref().unwrap_or(""),
            self.classification.as_deref().unwrap_or(""),
            self.commodity_derivative.as_deref().unwrap_or(""),
            self.notional_currency.as_deref().unwrap_or(""),
            self.issuer.as_deref().unwrap_or(""),
        ]
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record document: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Read the persisted working XML and extract every qualifying record.
pub fn extract_records(path: &Path) -> Result<Vec<InstrumentRecord>, ExtractError> {
    let xml = fs::read_to_string(path)?;
    extract_records_from_str(&xml)
}

/// Walk every element of the record tree. An element at any depth whose
/// namespace-stripped local name is one of the three record kinds opens
/// a record scope; its direct children fill the row. The row is kept
/// only when the record carried both a general-attributes group and an
/// issuer field.
pub fn extract_records_from_str(xml: &str) -> Result<Vec<InstrumentRecord>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut scope: Option<RecordScope> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match scope.as_mut() {
                    None => {
                        if let Some(kind) = RecordKind::from_local_name(&name) {
                            engine_trace!("record node {kind:?} at depth {depth}");
                            scope = Some(RecordScope::open(depth));
                        }
                    }
                    Some(active) => active.open_element(&name, depth),
                }
            }
            Event::Empty(e) => {
                // Self-closing elements set the group/issuer flags but
                // carry no text.
                if let Some(active) = scope.as_mut() {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    active.open_element(&name, depth + 1);
                    active.close_element(depth + 1);
                }
            }
            Event::Text(e) => {
                if let Some(active) = scope.as_mut() {
                    let text = e.unescape().unwrap_or_default();
                    active.text(text.trim(), depth);
                }
            }
            Event::End(_) => {
                match scope.take() {
                    Some(active) if depth == active.record_depth => {
                        if let Some(record) = active.finish() {
                            records.push(record);
                        }
                    }
                    Some(mut active) => {
                        active.close_element(depth);
                        scope = Some(active);
                    }
                    None => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

/// Named slot for one of the five general-attribute leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeSlot {
    Id,
    FullName,
    Classification,
    CommodityDerivative,
    NotionalCurrency,
}

impl AttributeSlot {
    fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "Id" => Some(Self::Id),
            "FullNm" => Some(Self::FullName),
            "ClssfctnTp" => Some(Self::Classification),
            "CmmdtyDerivInd" => Some(Self::CommodityDerivative),
            "NtnlCcy" => Some(Self::NotionalCurrency),
            _ => None,
        }
    }
}

/// Per-record parse state: the row under construction plus the two
/// qualifying flags, reset for every record node.
struct RecordScope {
    record_depth: usize,
    record: InstrumentRecord,
    has_attributes: bool,
    has_issuer: bool,
    in_attributes: bool,
    in_issuer: bool,
    slot: Option<AttributeSlot>,
}

impl RecordScope {
    fn open(record_depth: usize) -> Self {
        Self {
            record_depth,
            record: InstrumentRecord::default(),
            has_attributes: false,
            has_issuer: false,
            in_attributes: false,
            in_issuer: false,
            slot: None,
        }
    }

    fn open_element(&mut self, name: &str, depth: usize) {
        if depth == self.record_depth + 1 {
            // Direct child of the record node.
            if name == GENERAL_ATTRIBUTES_TAG {
                self.has_attributes = true;
                self.in_attributes = true;
            } else if name == ISSUER_TAG {
                self.has_issuer = true;
                self.in_issuer = true;
            }
        } else if self.in_attributes && depth == self.record_depth + 2 {
            self.slot = AttributeSlot::from_local_name(name);
        }
    }

    fn close_element(&mut self, depth: usize) {
        if depth == self.record_depth + 1 {
            self.in_attributes = false;
            self.in_issuer = false;
        } else if depth == self.record_depth + 2 {
            self.slot = None;
        }
    }

    fn text(&mut self, text: &str, depth: usize) {
        if self.in_issuer && depth == self.record_depth + 1 {
            if self.record.issuer.is_none() {
                self.record.issuer = Some(text.to_string());
            }
            return;
        }
        if !self.in_attributes || depth != self.record_depth + 2 {
            return;
        }
        let target = match self.slot {
            Some(AttributeSlot::Id) => &mut self.record.id,
            Some(AttributeSlot::FullName) => &mut self.record.full_name,
            Some(AttributeSlot::Classification) => &mut self.record.classification,
            Some(AttributeSlot::CommodityDerivative) => &mut self.record.commodity_derivative,
            Some(AttributeSlot::NotionalCurrency) => &mut self.record.notional_currency,
            None => return,
        };
        if target.is_none() {
            *target = Some(text.to_string());
        }
    }

    fn finish(self) -> Option<InstrumentRecord> {
        if self.has_attributes && self.has_issuer {
            Some(self.record)
        } else {
            None
        }
    }
}
