//! MPEG-DASH MPD XML generation from structured DASH data.
//!
//! Pure data to XML string conversion. `BaseURL`s keep the CDN addresses;
//! callers that must hide them rewrite the manifest afterwards.

use std::fmt::Write;

use super::types::{DashData, SegmentBase};

/// Generate MPEG-DASH MPD XML from structured DASH data.
#[must_use]
pub fn generate_mpd(data: &DashData) -> String {
    let mut xml = String::with_capacity(4096);

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

    let duration_str = format_duration(data.duration);
    let min_buf_str = format_duration(data.min_buffer_time.max(1.5));

    let _ = writeln!(
        xml,
        "<MPD xmlns=\"urn:mpeg:dash:schema:mpd:2011\" \
         profiles=\"urn:mpeg:dash:profile:isoff-on-demand:2011\" \
         type=\"static\" \
         mediaPresentationDuration=\"{duration_str}\" \
         minBufferTime=\"{min_buf_str}\">"
    );
    xml.push_str("  <Period>\n");

    if !data.video_streams.is_empty() {
        xml.push_str("    <AdaptationSet mimeType=\"video/mp4\" segmentAlignment=\"true\" startWithSAP=\"1\">\n");
        for v in &data.video_streams {
            let _ = writeln!(
                xml,
                "      <Representation id=\"{}\" codecs=\"{}\" width=\"{}\" height=\"{}\" \
                 frameRate=\"{}\" bandwidth=\"{}\" sar=\"{}\" startWithSAP=\"{}\">",
                v.id,
                xml_escape(&v.codecs),
                v.width,
                v.height,
                xml_escape(&v.frame_rate),
                v.bandwidth,
                xml_escape(if v.sar.is_empty() { "1:1" } else { &v.sar }),
                v.start_with_sap,
            );
            let _ = writeln!(xml, "        <BaseURL>{}</BaseURL>", xml_escape(&v.base_url));
            write_segment_base(&mut xml, &v.segment_base);
            xml.push_str("      </Representation>\n");
        }
        xml.push_str("    </AdaptationSet>\n");
    }

    if !data.audio_streams.is_empty() {
        xml.push_str("    <AdaptationSet mimeType=\"audio/mp4\" segmentAlignment=\"true\" startWithSAP=\"1\">\n");
        for a in &data.audio_streams {
            let _ = writeln!(
                xml,
                "      <Representation id=\"{}\" codecs=\"{}\" bandwidth=\"{}\" startWithSAP=\"{}\">",
                a.id,
                xml_escape(&a.codecs),
                a.bandwidth,
                a.start_with_sap,
            );
            let _ = writeln!(xml, "        <BaseURL>{}</BaseURL>", xml_escape(&a.base_url));
            write_segment_base(&mut xml, &a.segment_base);
            xml.push_str("      </Representation>\n");
        }
        xml.push_str("    </AdaptationSet>\n");
    }

    xml.push_str("  </Period>\n");
    xml.push_str("</MPD>\n");
    xml
}

fn write_segment_base(xml: &mut String, segment_base: &SegmentBase) {
    if segment_base.initialization.is_empty() && segment_base.index_range.is_empty() {
        return;
    }
    let _ = write!(
        xml,
        "        <SegmentBase indexRange=\"{}\">\n\
                   <Initialization range=\"{}\"/>\n\
                 </SegmentBase>\n",
        xml_escape(&segment_base.index_range),
        xml_escape(&segment_base.initialization),
    );
}

/// Format seconds as ISO 8601 duration (e.g. `PT3M45.2S`).
fn format_duration(secs: f64) -> String {
    if secs <= 0.0 {
        return "PT0S".to_string();
    }
    let hours = (secs / 3600.0).floor() as u64;
    let mins = ((secs % 3600.0) / 60.0).floor() as u64;
    let remaining = secs % 60.0;

    let mut s = String::from("PT");
    if hours > 0 {
        let _ = write!(s, "{hours}H");
    }
    if mins > 0 {
        let _ = write!(s, "{mins}M");
    }
    if remaining > 0.0 || (hours == 0 && mins == 0) {
        let formatted = format!("{remaining:.1}");
        let formatted = formatted.trim_end_matches('0').trim_end_matches('.');
        let _ = write!(s, "{formatted}S");
    }
    s
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bilibili::types::{AudioStreamData, VideoStreamData};

    fn sample_data() -> DashData {
        DashData {
            duration: 225.5,
            min_buffer_time: 1.5,
            video_streams: vec![VideoStreamData {
                id: 32,
                quality_name: "480P 清晰".to_string(),
                base_url: "https://cdn.bilibili.com/v1.m4s?e=1&deadline=2".to_string(),
                mime_type: "video/mp4".to_string(),
                codecs: "avc1.64001F".to_string(),
                width: 854,
                height: 480,
                frame_rate: "30".to_string(),
                bandwidth: 500_000,
                sar: String::new(),
                start_with_sap: 1,
                segment_base: SegmentBase {
                    initialization: "0-926".to_string(),
                    index_range: "927-9286".to_string(),
                },
            }],
            audio_streams: vec![AudioStreamData {
                id: 30280,
                base_url: "https://cdn.bilibili.com/a1.m4s".to_string(),
                mime_type: "audio/mp4".to_string(),
                codecs: "mp4a.40.2".to_string(),
                bandwidth: 128_000,
                start_with_sap: 0,
                segment_base: SegmentBase {
                    initialization: "0-800".to_string(),
                    index_range: "801-5000".to_string(),
                },
            }],
        }
    }

    #[test]
    fn test_generate_mpd() {
        let mpd = generate_mpd(&sample_data());
        assert!(mpd.contains("mediaPresentationDuration=\"PT3M45.5S\""));
        assert!(mpd.contains("<BaseURL>https://cdn.bilibili.com/v1.m4s?e=1&amp;deadline=2</BaseURL>"));
        assert!(mpd.contains("<BaseURL>https://cdn.bilibili.com/a1.m4s</BaseURL>"));
        assert!(mpd.contains("indexRange=\"927-9286\""));
        assert!(mpd.contains("sar=\"1:1\""));
    }

    #[test]
    fn test_empty_variant_has_no_adaptation_sets() {
        let data = DashData {
            duration: 10.0,
            min_buffer_time: 0.0,
            video_streams: vec![],
            audio_streams: vec![],
        };
        let mpd = generate_mpd(&data);
        assert!(!mpd.contains("AdaptationSet"));
        assert!(mpd.contains("minBufferTime=\"PT1.5S\""));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "PT0S");
        assert_eq!(format_duration(30.0), "PT30S");
        assert_eq!(format_duration(90.5), "PT1M30.5S");
        assert_eq!(format_duration(3661.0), "PT1H1M1S");
    }
}
