//! Formatting helpers shared by every template.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Narrow no-break space, used by fr-FR as the thousands separator.
const GROUP_SEP: char = '\u{202F}';
/// No-break space between the amount and the currency sign.
const CURRENCY_SEP: char = '\u{00A0}';

/// Per-render context: site links and the date used for "today".
#[derive(Debug, Clone)]
pub struct Helpers {
    pub site_url: String,
    pub today: NaiveDate,
}

impl Helpers {
    pub fn new(site_url: &str) -> Self {
        Self {
            site_url: site_url.trim_end_matches('/').to_string(),
            today: Utc::now().date_naive(),
        }
    }

    pub fn link(&self, path: &str) -> String {
        format!("{}{}", self.site_url, path)
    }

    /// A caller-supplied date string is parsed and formatted when possible.
    /// Unparseable strings are returned as-is and a missing date means today.
    pub fn date(&self, supplied: Option<&str>) -> String {
        match supplied.filter(|s| !s.trim().is_empty()) {
            Some(raw) => parse_date(raw)
                .map(format_date)
                .unwrap_or_else(|| raw.to_string()),
            None => format_date(self.today),
        }
    }
}

/// `1234.5` -> `"1 234,50 $"`, with fr-FR spacing characters.
/// A missing amount renders as `"0,00 $"`.
pub fn format_currency(amount: Option<f64>) -> String {
    let Some(amount) = amount.filter(|a| a.is_finite()) else {
        return format!("0,00{}$", CURRENCY_SEP);
    };

    let cents = (amount.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEP);
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{},{:02}{}$", sign, grouped, fraction, CURRENCY_SEP)
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// French long date, e.g. "18 octobre 2026".
pub fn format_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_FR[date.month0() as usize],
        date.year()
    )
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

/// WhatsApp support block appended to some transaction emails.
/// Empty when no phone number is configured.
pub fn support_html(phone: Option<&str>) -> String {
    let Some(phone) = phone.filter(|p| !p.trim().is_empty()) else {
        return String::new();
    };
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!(
        concat!(
            r#"<div style="margin-top: 20px; padding-top: 20px; border-top: 1px solid #eee; font-size: 14px; color: #666; text-align: center;">"#,
            r#"<p>Besoin d'aide ? Contactez notre support sur WhatsApp : <br>"#,
            r#"<a href="https://wa.me/{}" style="color: #25D366; font-weight: bold; text-decoration: none;">{}</a></p>"#,
            "</div>"
        ),
        digits,
        escape_html(phone)
    )
}
