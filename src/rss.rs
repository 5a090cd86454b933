use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use std::io::Cursor;
use tracing::warn;

use crate::audio::public_path;
use crate::episode::Episode;
use crate::error::FeedError;
use crate::podcast::PodcastConfig;

pub const CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
const ENCLOSURE_TYPE: &str = "audio/mpeg";
const CATEGORY: &str = "Technology";
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

fn parse_created_at(created_at: &str) -> Result<DateTime<Utc>, FeedError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(created_at) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(created_at, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| FeedError::DateParseFallback(created_at.to_string()))
}

/// RFC 822 style date for `<pubDate>`; unparseable input yields the current time.
pub fn pub_date(created_at: &str) -> String {
    let dt = parse_created_at(created_at).unwrap_or_else(|e| {
        warn!("{}", e);
        Utc::now()
    });
    dt.format(PUB_DATE_FORMAT).to_string()
}

pub fn enclosure_url(base_url: &str, audio_filename: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), public_path(audio_filename))
}

/// Builds the podcast feed. Episodes without audio, or whose audio name points
/// outside the audio namespace, are left out; the rest keep the order they were
/// given in.
pub fn render_feed(config: &PodcastConfig, episodes: &[Episode]) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer
        .create_element("rss")
        .with_attribute(("version", "2.0"))
        .with_attribute(("xmlns:itunes", "http://www.itunes.com/dtds/podcast-1.0.dtd"))
        .with_attribute(("xmlns:content", "http://purl.org/rss/1.0/modules/content/"))
        .write_inner_content(|w| {
            w.create_element("channel").write_inner_content(|w| {
                text_element(w, "title", &config.title)?;
                text_element(w, "description", &config.description)?;
                text_element(w, "language", &config.language)?;
                text_element(w, "link", &config.base_url)?;
                text_element(w, "itunes:author", &config.author)?;
                w.create_element("itunes:owner").write_inner_content(|w| {
                    text_element(w, "itunes:name", &config.author)?;
                    text_element(w, "itunes:email", &config.email)?;
                    Ok::<(), quick_xml::Error>(())
                })?;
                if !config.image_url.is_empty() {
                    w.create_element("itunes:image")
                        .with_attribute(("href", config.image_url.as_str()))
                        .write_empty()?;
                }
                w.create_element("itunes:category")
                    .with_attribute(("text", CATEGORY))
                    .write_empty()?;
                text_element(w, "itunes:explicit", "false")?;

                for episode in episodes.iter().filter(|e| e.has_audio()) {
                    write_item(w, config, episode)?;
                }
                Ok::<(), quick_xml::Error>(())
            })?;
            Ok::<(), quick_xml::Error>(())
        })?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_item<W: std::io::Write>(
    w: &mut Writer<W>,
    config: &PodcastConfig,
    episode: &Episode,
) -> quick_xml::Result<()> {
    let url = enclosure_url(&config.base_url, &episode.audio_filename);
    let length = episode.file_size.to_string();
    w.create_element("item").write_inner_content(|w| {
        text_element(w, "title", &episode.title)?;
        text_element(w, "description", &episode.summary)?;
        text_element(w, "content:encoded", &episode.content)?;
        text_element(w, "pubDate", &pub_date(&episode.created_at))?;
        w.create_element("guid")
            .with_attribute(("isPermaLink", "false"))
            .write_text_content(BytesText::new(&episode.id))?;
        w.create_element("enclosure")
            .with_attribute(("url", url.as_str()))
            .with_attribute(("length", length.as_str()))
            .with_attribute(("type", ENCLOSURE_TYPE))
            .write_empty()?;
        if !episode.tags.is_empty() {
            text_element(w, "itunes:keywords", &episode.tags.join(","))?;
        }
        Ok::<(), quick_xml::Error>(())
    })?;
    Ok(())
}

fn text_element<W: std::io::Write>(w: &mut Writer<W>, name: &str, text: &str) -> quick_xml::Result<()> {
    w.create_element(name).write_text_content(BytesText::new(text))?;
    Ok(())
}
