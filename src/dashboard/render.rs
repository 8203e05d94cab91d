//! HTML rendering of dashboard snapshots

use crate::dashboard::{DashboardSnapshot, HistoryPoint};
use std::fmt::Write;

const CHART_WIDTH: f64 = 900.0;
const CHART_HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 50.0;

const LEGIT_COLOR: &str = "#2e7d32";
const FRAUD_COLOR: &str = "#c62828";

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;background:#fafafa;color:#222}\
.cards{display:flex;gap:1rem;margin-bottom:1.5rem}\
.card{flex:1;background:#fff;border:1px solid #ddd;border-radius:6px;padding:1rem}\
.card .label{font-size:.85rem;color:#666}.card .value{font-size:1.6rem;margin-top:.3rem}\
table{border-collapse:collapse;background:#fff}td,th{border:1px solid #ddd;padding:.35rem .7rem;text-align:left}\
.fraud{color:#c62828}.legit{color:#2e7d32}.errors li{font-family:monospace}";

/// Render the full dashboard page
pub fn render_page(snapshot: &DashboardSnapshot, refresh_secs: u64) -> String {
    let s = &snapshot.summary;
    let mut html = String::with_capacity(16 * 1024);

    let _ = write!(
        html,
        "<!doctype html><html><head><meta charset=\"utf-8\">\
<meta http-equiv=\"refresh\" content=\"{}\">\
<title>Real-Time Fraud Detection</title><style>{}</style></head><body>\
<h1>Real-Time Fraud Detection Dashboard</h1>",
        refresh_secs.max(1),
        STYLE
    );

    html.push_str("<div class=\"cards\">");
    metric_card(&mut html, "Total Transactions", &s.total_transactions.to_string());
    metric_card(&mut html, "Fraud Rate", &format!("{:.1}%", s.fraud_rate));
    metric_card(&mut html, "Total Amount", &format_currency(s.total_amount));
    metric_card(&mut html, "Fraud Amount", &format_currency(s.fraud_amount));
    html.push_str("</div>");

    html.push_str("<h2>Transaction History</h2>");
    html.push_str(&render_scatter(&snapshot.history));

    html.push_str("<h2>Recent Transactions</h2>");
    if snapshot.recent.is_empty() {
        html.push_str("<p>No transactions processed yet.</p>");
    } else {
        html.push_str(
            "<table><thead><tr><th>timestamp</th><th>amount</th><th>status</th>\
<th>probability</th><th>id</th></tr></thead><tbody>",
        );
        for row in &snapshot.recent {
            let (class, label) = if row.status == "FRAUD" {
                ("fraud", "🚨 FRAUD")
            } else {
                ("legit", "✅ LEGIT")
            };
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{:.2}</td><td class=\"{}\">{}</td><td>{}</td><td><code>{}</code></td></tr>",
                escape_html(&row.timestamp),
                row.amount,
                class,
                label,
                escape_html(&row.probability),
                escape_html(&row.id)
            );
        }
        html.push_str("</tbody></table>");
    }

    if !snapshot.errors.is_empty() {
        let _ = write!(
            html,
            "<h2>Processing Errors ({} total)</h2><ul class=\"errors\">",
            s.failed_files
        );
        for err in snapshot.errors.iter().rev() {
            let _ = write!(
                html,
                "<li>{} [{}] {}: {}</li>",
                err.at.format("%H:%M:%S"),
                err.kind,
                escape_html(&err.file),
                escape_html(&err.message)
            );
        }
        html.push_str("</ul>");
    }

    let _ = write!(
        html,
        "<p><small>Updated {} UTC · {:.1} tx/s · alerts sent {} / failed {}</small></p></body></html>",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S"),
        s.throughput,
        s.alerts_sent,
        s.alerts_failed
    );

    html
}

fn metric_card(html: &mut String, label: &str, value: &str) {
    let _ = write!(
        html,
        "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
        label,
        escape_html(value)
    );
}

/// Scatter plot of amount over time, legitimate and fraudulent series
pub fn render_scatter(points: &[HistoryPoint]) -> String {
    if points.is_empty() {
        return "<p>No transactions yet.</p>".to_string();
    }

    let times: Vec<f64> = points
        .iter()
        .map(|p| p.timestamp.and_utc().timestamp_millis() as f64)
        .collect();
    let t_min = times.iter().copied().fold(f64::INFINITY, f64::min);
    let t_max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let a_max = points.iter().map(|p| p.amount).fold(0.0_f64, f64::max).max(1.0);

    let plot_w = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let x_of = |t: f64| {
        if t_max > t_min {
            MARGIN_LEFT + (t - t_min) / (t_max - t_min) * plot_w
        } else {
            MARGIN_LEFT + plot_w / 2.0
        }
    };
    let y_of = |a: f64| MARGIN_TOP + plot_h - (a / a_max) * plot_h;

    let mut svg = String::with_capacity(points.len() * 160 + 2048);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\
<rect width=\"{w}\" height=\"{h}\" fill=\"#fff\"/>",
        w = CHART_WIDTH,
        h = CHART_HEIGHT
    );

    // axes
    let x0 = MARGIN_LEFT;
    let y0 = MARGIN_TOP + plot_h;
    let _ = write!(
        svg,
        "<line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x1}\" y2=\"{y0}\" stroke=\"#888\"/>\
<line x1=\"{x0}\" y1=\"{top}\" x2=\"{x0}\" y2=\"{y0}\" stroke=\"#888\"/>",
        x1 = MARGIN_LEFT + plot_w,
        top = MARGIN_TOP
    );
    let _ = write!(
        svg,
        "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"13\">Time</text>\
<text x=\"15\" y=\"{}\" text-anchor=\"middle\" font-size=\"13\" transform=\"rotate(-90 15 {})\">Amount ($)</text>",
        MARGIN_LEFT + plot_w / 2.0,
        CHART_HEIGHT - 10.0,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    );
    let _ = write!(
        svg,
        "<text x=\"{x}\" y=\"{y}\" text-anchor=\"end\" font-size=\"11\">{top}</text>\
<text x=\"{x}\" y=\"{y0}\" text-anchor=\"end\" font-size=\"11\">0</text>",
        x = MARGIN_LEFT - 6.0,
        y = MARGIN_TOP + 4.0,
        top = format_currency(a_max)
    );
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        let _ = write!(
            svg,
            "<text x=\"{}\" y=\"{ly}\" font-size=\"11\">{}</text>\
<text x=\"{}\" y=\"{ly}\" text-anchor=\"end\" font-size=\"11\">{}</text>",
            MARGIN_LEFT,
            first.timestamp.format("%H:%M:%S"),
            MARGIN_LEFT + plot_w,
            last.timestamp.format("%H:%M:%S"),
            ly = y0 + 16.0
        );
    }

    for (series, color, fraud) in [("Legitimate", LEGIT_COLOR, false), ("Fraudulent", FRAUD_COLOR, true)] {
        let _ = write!(svg, "<g class=\"series\" data-series=\"{}\" fill=\"{}\">", series, color);
        for (p, &t) in points.iter().zip(&times).filter(|(p, _)| p.is_fraud == fraud) {
            let _ = write!(
                svg,
                "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\"><title>{} ${:.2} ({:.2}%)</title></circle>",
                x_of(t),
                y_of(p.amount),
                escape_html(&crate::types::transaction::short_id(&p.id)),
                p.amount,
                p.prediction * 100.0
            );
        }
        svg.push_str("</g>");
    }

    // legend
    let lx = MARGIN_LEFT + plot_w - 140.0;
    let _ = write!(
        svg,
        "<circle cx=\"{lx}\" cy=\"14\" r=\"5\" fill=\"{LEGIT_COLOR}\"/><text x=\"{}\" y=\"18\" font-size=\"12\">Legitimate</text>\
<circle cx=\"{}\" cy=\"14\" r=\"5\" fill=\"{FRAUD_COLOR}\"/><text x=\"{}\" y=\"18\" font-size=\"12\">Fraudulent</text>",
        lx + 9.0,
        lx + 80.0,
        lx + 89.0
    );

    svg.push_str("</svg>");
    svg
}

/// `1234567.891` -> `$1,234,567.89`
pub fn format_currency(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, frac) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::RecentRow;
    use crate::metrics::{ErrorRecord, MetricsSummary};
    use chrono::{NaiveDate, Utc};

    fn point(id: &str, minute: u32, amount: f64, is_fraud: bool) -> HistoryPoint {
        HistoryPoint {
            id: id.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(12, minute, 0)
                .unwrap(),
            amount,
            prediction: 0.2,
            is_fraud,
        }
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.5), "$999.50");
        assert_eq!(format_currency(1234.0), "$1,234.00");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(-50.0), "-$50.00");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_scatter_splits_series() {
        let points = vec![
            point("a", 0, 10.0, false),
            point("b", 1, 500.0, true),
            point("c", 2, 20.0, false),
        ];
        let svg = render_scatter(&points);

        assert!(svg.starts_with("<svg"));
        let legit = svg.split("data-series=\"Legitimate\"").nth(1).unwrap();
        let legit = legit.split("</g>").next().unwrap();
        assert_eq!(legit.matches("<circle").count(), 2);

        let fraud = svg.split("data-series=\"Fraudulent\"").nth(1).unwrap();
        let fraud = fraud.split("</g>").next().unwrap();
        assert_eq!(fraud.matches("<circle").count(), 1);
    }

    #[test]
    fn test_scatter_single_point_and_empty() {
        let svg = render_scatter(&[point("a", 0, 10.0, false)]);
        assert!(svg.contains("<circle cx=\"475.0\""));
        assert!(!svg.contains("NaN"));

        assert_eq!(render_scatter(&[]), "<p>No transactions yet.</p>");
    }

    #[test]
    fn test_page_contains_metrics_table_and_errors() {
        let snapshot = DashboardSnapshot {
            summary: MetricsSummary {
                total_transactions: 4,
                fraud_count: 1,
                fraud_rate: 25.0,
                total_amount: 1500.0,
                fraud_amount: 1200.0,
                legit_amount: 300.0,
                failed_files: 1,
                ..Default::default()
            },
            history: vec![point("a", 0, 10.0, false)],
            recent: vec![RecentRow {
                timestamp: "2024-03-14 12:00:00".to_string(),
                amount: 1200.0,
                status: "FRAUD",
                probability: "91.00%".to_string(),
                id: "3f6c1a52".to_string(),
            }],
            errors: vec![ErrorRecord {
                file: "transaction_<bad>.json".to_string(),
                kind: "malformed",
                message: "unexpected end".to_string(),
                at: Utc::now(),
            }],
            generated_at: Utc::now(),
        };

        let html = render_page(&snapshot, 1);
        assert!(html.contains("Total Transactions"));
        assert!(html.contains("25.0%"));
        assert!(html.contains("$1,500.00"));
        assert!(html.contains("$1,200.00"));
        assert!(html.contains("🚨 FRAUD"));
        assert!(html.contains("<code>3f6c1a52</code>"));
        assert!(html.contains("transaction_&lt;bad&gt;.json"));
        assert!(html.contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn test_empty_page() {
        let html = render_page(&DashboardSnapshot::empty(), 1);
        assert!(html.contains("No transactions yet."));
        assert!(html.contains("No transactions processed yet."));
        assert!(!html.contains("Processing Errors"));
    }
}
