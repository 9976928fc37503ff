//! RSS 2.0 rendering.
//!
//! ```text
//! <rss version="2.0">
//!   <channel>
//!     <title>afl.com.au</title> <link/> <description/> <language/> <generator/> <lastBuildDate/>
//!     <item>
//!       <title/> <link/> <description/> <pubDate/> <guid isPermaLink="true"/>
//!     </item>
//!   </channel>
//! </rss>
//! ```
//!
//! `pubDate` is written in RFC 2822 form and omitted when unknown. The guid is
//! the article url, so readers never show the same story twice.

use crate::models::{FeedItem, FeedMetadata};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;
use std::io::Write;

type RenderResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Render the feed document for `items`, in the order given.
pub fn render_feed(meta: &FeedMetadata, items: &[FeedItem]) -> RenderResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss_start))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &meta.title)?;
    write_text_element(&mut writer, "link", &meta.link)?;
    write_text_element(&mut writer, "description", &meta.description)?;
    write_text_element(&mut writer, "language", &meta.language)?;
    write_text_element(&mut writer, "generator", &meta.generator)?;
    write_text_element(&mut writer, "lastBuildDate", &meta.last_build_date.to_rfc2822())?;

    for item in items {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &item.title)?;
        write_text_element(&mut writer, "link", &item.link)?;
        write_text_element(&mut writer, "description", &item.description)?;
        if let Some(published) = item.published_at {
            write_text_element(&mut writer, "pubDate", &published.to_rfc2822())?;
        }
        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&sanitize_text(&item.guid))))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

fn write_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> RenderResult<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(&sanitize_text(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

// Remove control characters that are invalid in XML 1.0 (tab, LF and CR stay).
fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c as u32) >= 0x20)
        .collect()
}
