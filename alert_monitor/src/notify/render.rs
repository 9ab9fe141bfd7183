use crate::models::DetailRecord;

/// Appended in place of the blocks that no longer fit.
pub const TRUNCATION_NOTICE: &str = "<div style='color:red; font-weight:bold; margin-top:20px;'>\
Too many results to show in this message.<br>\
Please check the portal for the rest.</div>";

const BLOCK_OPEN: &str = "<div style='border-top: 1px solid #ccc; margin: 20px 0; padding-top: 10px;'>";
const BLOCK_CLOSE: &str = "</div>";

/// `{prefix}: {alert} ({count})`
pub fn subject(prefix: &str, alert: &str, count: usize) -> String {
    format!("{prefix}: {alert} ({count})")
}

/// Renders one block per record, stopping before the body would exceed
/// `max_chars` characters. When blocks are dropped, [`TRUNCATION_NOTICE`]
/// takes their place.
pub fn render(records: &[DetailRecord], template: &str, max_chars: usize) -> String {
    let mut body = String::new();
    let mut size = 0;
    for record in records {
        let block = render_block(record, template);
        let block_size = block.chars().count();
        if size + block_size > max_chars {
            body.push_str(TRUNCATION_NOTICE);
            break;
        }
        body.push_str(&block);
        size += block_size;
    }
    body
}

/// Substitutes the record into `template`, turns line breaks into `<br>` and
/// wraps the result in a separator block. Unknown placeholders are left as is.
pub fn render_block(record: &DetailRecord, template: &str) -> String {
    let filled = substitute(template, |name| placeholder(record, name));
    let html = filled.replace("\r\n", "<br>").replace('\n', "<br>");
    format!("{BLOCK_OPEN}{html}{BLOCK_CLOSE}")
}

fn placeholder(record: &DetailRecord, name: &str) -> Option<String> {
    let value = match name {
        "title" => record.title.clone(),
        "starting_date" => record.starting_date.clone(),
        "deadline" => record.deadline.clone(),
        "type" => record.kind.clone(),
        "status" => record.status.clone(),
        "url" => record.url.clone(),
        "identifier" => record.identifier.clone(),
        "reference" => record.reference.clone(),
        "summary" => record.summary.clone(),
        "frameworkProgramme" => record.framework_programme.clone(),
        "callTitle" => record.call_title.clone(),
        "destination" => record.destination.clone(),
        "keywords" => record.keywords.join(", "),
        "tags" => record.tags.join(", "),
        _ => return None,
    };
    Some(value)
}

/// Single left-to-right pass, so substituted values are never re-expanded.
fn substitute(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => match lookup(&after[..close]) {
                Some(value) => {
                    out.push_str(&value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            },
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
