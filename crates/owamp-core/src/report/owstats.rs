//! Parser for the owstats summary (`.sum`) text format.
//!
//! The format is line oriented: `KEY value` pairs at top level, plus three
//! bracketed histogram sections (`<BUCKETS>`, `<TTLBUCKETS>`,
//! `<NREORDERING>`) whose bodies are `<key> <count>` integer pairs closed by
//! a line starting with `</`.

use std::str::FromStr;

use crate::error::{OwampError, Result};
use crate::report::{HistogramEntry, SummaryReport};

/// Parse a complete summary artifact.
pub fn parse_summary(text: &str) -> Result<SummaryReport> {
    let mut ret = SummaryReport::default();
    let mut lines = text.lines();

    while let Some(raw) = lines.next() {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        let (key, value) = match parts.as_slice() {
            [] => continue,
            [key] => (*key, ""),
            [key, value] => (*key, *value),
            _ => {
                tracing::trace!(line = raw.trim(), "skipping summary line");
                continue;
            }
        };

        match key {
            "UNIX_START_TIME" => ret.start_time = field(value, "start_time")?,
            "UNIX_END_TIME" => ret.end_time = field(value, "end_time")?,
            "SENT" => ret.sent_pkts = field(value, "sent pkts")?,
            "DUPS" => ret.dup_pkts = field(value, "dup pkts")?,
            "LOST" => ret.lost_pkts = field(value, "lost pkts")?,
            "MAXERR" => ret.max_err = field(value, "maxerr")?,
            "MIN" => ret.latency_min = field(value, "min")?,
            "MEDIAN" => ret.latency_median = field(value, "median")?,
            "MAX" => ret.latency_max = field(value, "max")?,
            "BUCKET_WIDTH" => ret.latency_hist_width = field(value, "bucket_width")?,
            "<BUCKETS>" => ret.latency_hist = parse_histogram(&mut lines)?,
            "<TTLBUCKETS>" => ret.ttl_hist = parse_histogram(&mut lines)?,
            "<NREORDERING>" => ret.reordering_hist = parse_histogram(&mut lines)?,
            _ => {}
        }
    }

    Ok(ret)
}

fn field<T: FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| OwampError::Report(format!("invalid {what}: {value:?}")))
}

/// Consume one histogram section body, up to and including its `</...>`
/// terminator.
fn parse_histogram<'a, I>(lines: &mut I) -> Result<Vec<HistogramEntry>>
where
    I: Iterator<Item = &'a str>,
{
    let mut data = Vec::with_capacity(30);

    for raw in lines {
        let line = raw.trim();
        if line.starts_with("</") {
            return Ok(data);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let [key, value] = parts.as_slice() else {
            return Err(OwampError::Report(format!(
                "invalid histogram entry: {line:?}"
            )));
        };
        let key = key
            .parse()
            .map_err(|_| OwampError::Report(format!("invalid histogram key: {key:?}")))?;
        let value = value
            .parse()
            .map_err(|_| OwampError::Report(format!("invalid histogram value: {value:?}")))?;
        data.push(HistogramEntry { key, value });
    }

    Err(OwampError::Report(
        "incomplete histogram: missing closing marker".into(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn counters_and_buckets() {
        let text = "SENT 100\nDUPS 1\nLOST 0\n<BUCKETS>\n\t12 40\n\t13 59\n</BUCKETS>\n";
        let r = parse_summary(text).unwrap();
        assert_eq!(r.sent_pkts, 100);
        assert_eq!(r.dup_pkts, 1);
        assert_eq!(r.lost_pkts, 0);
        assert_eq!(
            r.latency_hist,
            vec![HistogramEntry::new(12, 40), HistogramEntry::new(13, 59)]
        );
        assert!(r.ttl_hist.is_empty());
    }

    #[test]
    fn missing_terminator_is_error() {
        let err = parse_summary("SENT 10\n<TTLBUCKETS>\n255 10\n").unwrap_err();
        assert_eq!(err.class().as_str(), "INGESTION");
    }

    #[test]
    fn bad_counter_is_error() {
        assert!(parse_summary("SENT ten\n").is_err());
        // a bare key has an empty value, which does not parse as a number
        assert!(parse_summary("LOST\n").is_err());
    }

    #[test]
    fn wide_and_unknown_lines_are_ignored() {
        let r = parse_summary("SUMMARY 3.0\nFROM_HOST a b c\nSENT 5\n").unwrap();
        assert_eq!(r.sent_pkts, 5);
    }

    #[test]
    fn malformed_pair_is_error() {
        assert!(parse_summary("<NREORDERING>\n1 2 3\n</NREORDERING>\n").is_err());
        assert!(parse_summary("<BUCKETS>\n-1 2\n</BUCKETS>\n").is_err());
    }
}
