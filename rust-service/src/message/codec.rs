//! XML codec for the message envelope.
//!
//! Inbound bodies look like:
//!
//! ```text
//! <xml>
//!   <ToUserName><![CDATA[gh_bot]]></ToUserName>
//!   <FromUserName><![CDATA[o_user]]></FromUserName>
//!   <CreateTime>1348831860</CreateTime>
//!   <MsgType><![CDATA[text]]></MsgType>
//!   <Content><![CDATA[this is a test]]></Content>
//!   <MsgId>1234567890123456</MsgId>
//! </xml>
//! ```
//!
//! Only the direct children of the root are read. Unknown children are ignored.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::types::{InboundMessage, MessageType, OutboundMessage};
use crate::error::DecodeError;

/// Decode a raw request body.
pub fn decode_bytes(raw: &[u8]) -> Result<InboundMessage, DecodeError> {
    decode(std::str::from_utf8(raw)?)
}

/// Decode an inbound envelope into an [`InboundMessage`].
///
/// Missing fields decode to empty strings.
pub fn decode(raw: &str) -> Result<InboundMessage, DecodeError> {
    let mut fields = parse_fields(raw)?;
    let mut take = |name: &str| fields.remove(name).unwrap_or_default();

    Ok(InboundMessage {
        to_account: take("ToUserName"),
        from_user: take("FromUserName"),
        message_type: MessageType::parse(&take("MsgType")),
        content: take("Content"),
    })
}

/// Collect the root's leaf children as local-name to trimmed text.
fn parse_fields(raw: &str) -> Result<HashMap<String, String>, DecodeError> {
    let mut reader = Reader::from_str(raw);
    let mut fields = HashMap::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut current: Option<(String, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DecodeError::Xml(e.to_string()))?;

        match event {
            Event::Start(e) => {
                if depth == 0 && saw_root {
                    return Err(DecodeError::MultipleRoots);
                }
                depth += 1;
                if depth == 1 {
                    saw_root = true;
                } else if depth == 2 {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    current = Some((name, String::new()));
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    if saw_root {
                        return Err(DecodeError::MultipleRoots);
                    }
                    saw_root = true;
                } else if depth == 1 {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    fields.insert(name, String::new());
                }
            }
            Event::Text(t) if depth == 2 => {
                let text = t.unescape().map_err(|e| DecodeError::Xml(e.to_string()))?;
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&text);
                }
            }
            Event::CData(c) if depth == 2 => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some((name, value)) = current.take() {
                        fields.insert(name, value.trim().to_string());
                    }
                }
                depth = depth.checked_sub(1).ok_or(DecodeError::Unclosed)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(DecodeError::Unclosed);
    }
    if !saw_root {
        return Err(DecodeError::MissingRoot);
    }

    Ok(fields)
}

/// Encode a reply envelope.
///
/// Element order is fixed. `CreateTime` is a bare integer, every other value
/// is CDATA-wrapped.
pub fn encode(message: &OutboundMessage) -> String {
    format!(
        "<xml>\
         <ToUserName>{}</ToUserName>\
         <FromUserName>{}</FromUserName>\
         <CreateTime>{}</CreateTime>\
         <MsgType>{}</MsgType>\
         <Content>{}</Content>\
         </xml>",
        cdata(&message.to_account),
        cdata(&message.from_account),
        message.created_at,
        cdata(message.message_type()),
        cdata(&message.content),
    )
}

/// Wrap a value in CDATA. A literal `]]>` is split across two sections.
fn cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}
