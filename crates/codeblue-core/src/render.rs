use codeblue_schema::ClinicalEvent;

/// Render events as the on-screen markup tree: a `<logs>` root with one
/// `<event>` child per row, id and timestamp as attributes.
pub fn logs_to_xml(events: &[ClinicalEvent]) -> String {
    let mut xml = String::from("<logs>\n");
    for event in events {
        let extra = event
            .extra
            .as_ref()
            .map(|m| serde_json::to_string(m).unwrap_or_default())
            .unwrap_or_default();
        xml.push_str(&format!(
            "  <event id=\"{}\" timestamp=\"{}\">\n",
            event.id,
            xml_escape(&event.timestamp)
        ));
        xml.push_str(&format!("    <name>{}</name>\n", xml_escape(&event.name)));
        xml.push_str(&format!("    <note>{}</note>\n", xml_escape(&event.note)));
        xml.push_str(&format!("    <extra>{}</extra>\n", xml_escape(&extra)));
        xml.push_str("  </event>\n");
    }
    xml.push_str("</logs>");
    xml
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
