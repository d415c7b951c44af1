use crate::{Notification, NotificationKind};

const SIGNATURE: &str = "Cosine Stock Alerts";

/// Email bodies for notifications.
pub struct EmailTemplate;

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl EmailTemplate {
    pub fn render_text(notification: &Notification) -> String {
        match &notification.kind {
            NotificationKind::PriceThreshold {
                symbol,
                current_price,
                threshold,
                ..
            } => format!(
                "Hello,\n\n\
                 The stock {symbol} has reached your threshold.\n\
                 Current Price: ${current_price:.2}\n\
                 Threshold: ${threshold:.2}\n\n\
                 Regards,\n{SIGNATURE}"
            ),
        }
    }

    pub fn render(notification: &Notification) -> String {
        let details = match &notification.kind {
            NotificationKind::PriceThreshold {
                symbol,
                current_price,
                threshold,
                condition,
            } => {
                let accent = if condition == "below" { "#b91c1c" } else { "#15803d" };
                format!(
                    "<h2 style=\"color:{accent};margin:0 0 12px\">{symbol} is {condition} ${threshold:.2}</h2>\n\
                     <p>The stock {symbol} has reached your threshold.</p>\n\
                     <ul>\n\
                     <li>Current Price: <strong>${current_price:.2}</strong></li>\n\
                     <li>Threshold: <strong>${threshold:.2}</strong></li>\n\
                     </ul>\n\
                     <p style=\"color:#64748b\">This alert has been retired and will not be sent again.</p>",
                    symbol = html_escape(symbol),
                    condition = html_escape(condition),
                )
            }
        };

        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
             <body style=\"font-family:Helvetica,Arial,sans-serif;color:#0f172a;max-width:560px;margin:24px auto\">\n\
             <p>Hello,</p>\n{details}\n\
             <hr style=\"border:none;border-top:1px solid #e2e8f0\">\n\
             <p style=\"font-size:12px;color:#94a3b8\">{message}<br>{sent_at} UTC &middot; {SIGNATURE}</p>\n\
             </body></html>",
            title = html_escape(&notification.title),
            message = html_escape(&notification.message),
            sent_at = notification.timestamp.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}
