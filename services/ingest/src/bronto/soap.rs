use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::models::{build_record, ActivityKind, ActivityQuery, RawRecord};

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const API_NS: &str = "http://api.bronto.com/v4";

/// A `<soap:Fault>` decoded from a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: Option<u32>,
    pub message: String,
}

fn escape(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}

fn envelope(header: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soapenv:Envelope xmlns:soapenv=\"{ENVELOPE_NS}\" xmlns:v4=\"{API_NS}\">\
         <soapenv:Header>{header}</soapenv:Header>\
         <soapenv:Body>{body}</soapenv:Body>\
         </soapenv:Envelope>"
    )
}

pub fn login_envelope(api_token: &str) -> String {
    envelope(
        "",
        &format!("<v4:login><apiToken>{}</apiToken></v4:login>", escape(api_token)),
    )
}

pub fn read_activities_envelope(
    session_id: &str,
    kind: ActivityKind,
    query: &ActivityQuery,
) -> String {
    let header = format!(
        "<v4:sessionHeader><sessionId>{}</sessionId></v4:sessionHeader>",
        escape(session_id)
    );
    let op = kind.operation();
    let body = format!(
        "<v4:{op}><filter>\
         <start>{}</start><end>{}</end><size>{}</size><readDirection>{}</readDirection>\
         </filter></v4:{op}>",
        query.start_param(),
        query.end_param(),
        query.size,
        query.read_direction.as_str(),
    );
    envelope(&header, &body)
}

/// Pull the numeric code off the front of a fault string such as
/// `"116 : End of result set."`.
pub fn fault_code(faultstring: &str) -> Option<u32> {
    let digits: String = faultstring
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Why a response body could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    #[error("invalid xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid escape: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("not a SOAP response: {0}")]
    NotSoap(&'static str),
}

/// Decoded content of a SOAP response body.
#[derive(Debug, Default)]
pub struct ParsedResponse {
    pub fault: Option<SoapFault>,
    /// Child fields of every `<return>` element, in document order.
    pub returns: Vec<BTreeMap<String, Vec<String>>>,
    /// Text content of `<return>` elements that have no children.
    pub scalar_returns: Vec<String>,
}

/// Tracks the `Envelope/Body/*Response|Fault` skeleton every answer must have.
#[derive(Debug, Default)]
struct EnvelopeShape {
    envelope: bool,
    in_body: bool,
    payload: bool,
}

impl EnvelopeShape {
    /// `level` is the number of elements open above `name`.
    fn open(&mut self, level: usize, name: &str) {
        match level {
            0 => self.envelope = name == "Envelope",
            1 if self.envelope => self.in_body = name == "Body",
            2 if self.in_body => {
                if name == "Fault" || name.ends_with("Response") {
                    self.payload = true;
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, level: usize) {
        if level == 1 {
            self.in_body = false;
        }
    }

    fn check(&self) -> Result<(), SoapError> {
        if !self.envelope {
            return Err(SoapError::NotSoap("missing Envelope"));
        }
        if !self.payload {
            return Err(SoapError::NotSoap("Body carries no response or fault"));
        }
        Ok(())
    }
}

fn local_name(name: quick_xml::name::LocalName<'_>) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

pub fn parse_response(body: &str) -> Result<ParsedResponse, SoapError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut parsed = ParsedResponse::default();
    let mut shape = EnvelopeShape::default();
    // elements currently open from the document root
    let mut level = 0usize;

    let mut in_fault = false;
    let mut fault_text: Option<String> = None;
    let mut capture_faultstring = false;

    // (fields, scalar text) of the <return> currently open
    let mut current: Option<(BTreeMap<String, Vec<String>>, String)> = None;
    let mut field: Option<String> = None;
    let mut field_text = String::new();
    // depth below the open <return>
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.local_name());
                shape.open(level, &name);
                level += 1;

                if current.is_some() {
                    depth += 1;
                    if depth == 1 {
                        field = Some(name);
                        field_text.clear();
                    }
                } else if name == "return" {
                    current = Some((BTreeMap::new(), String::new()));
                    depth = 0;
                } else if name == "Fault" {
                    in_fault = true;
                } else if in_fault && name == "faultstring" {
                    capture_faultstring = true;
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                append_text(
                    &text,
                    &mut current,
                    depth,
                    &mut field_text,
                    capture_faultstring,
                    &mut fault_text,
                );
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                append_text(
                    &text,
                    &mut current,
                    depth,
                    &mut field_text,
                    capture_faultstring,
                    &mut fault_text,
                );
            }
            Event::End(e) => {
                level = level.saturating_sub(1);
                shape.close(level);

                if current.is_some() {
                    if depth == 0 {
                        if let Some((fields, scalar)) = current.take() {
                            if fields.is_empty() {
                                parsed.scalar_returns.push(scalar);
                            } else {
                                parsed.returns.push(fields);
                            }
                        }
                    } else {
                        if depth == 1 {
                            if let (Some(name), Some((fields, _))) = (field.take(), current.as_mut())
                            {
                                fields
                                    .entry(name)
                                    .or_default()
                                    .push(std::mem::take(&mut field_text));
                            }
                        }
                        depth -= 1;
                    }
                    continue;
                }

                match e.local_name().as_ref() {
                    b"faultstring" => capture_faultstring = false,
                    b"Fault" => {
                        in_fault = false;
                        let message = fault_text.take().unwrap_or_default();
                        parsed.fault = Some(SoapFault {
                            code: fault_code(&message),
                            message,
                        });
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                // nil elements carry no value and are left out of the record
                shape.open(level, &local_name(e.local_name()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    shape.check()?;
    Ok(parsed)
}

fn append_text(
    text: &str,
    current: &mut Option<(BTreeMap<String, Vec<String>>, String)>,
    depth: usize,
    field_text: &mut String,
    capture_faultstring: bool,
    fault_text: &mut Option<String>,
) {
    if let Some((_, scalar)) = current.as_mut() {
        match depth {
            0 => scalar.push_str(text),
            1 => field_text.push_str(text),
            _ => {}
        }
    } else if capture_faultstring {
        fault_text.get_or_insert_with(String::new).push_str(text);
    }
}

/// Records of a recent-activity response.
pub fn activity_records(parsed: ParsedResponse) -> Vec<RawRecord> {
    parsed.returns.into_iter().map(build_record).collect()
}
