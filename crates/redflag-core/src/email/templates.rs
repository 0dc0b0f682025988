//! Email bodies for account verification and password reset.

use super::OutgoingEmail;

fn link(app_url: &str, path: &str, token: &str) -> String {
    format!("{}/{}?token={}", app_url.trim_end_matches('/'), path, token)
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

pub fn verification_email(to: &str, app_url: &str, token: &str, ttl_hours: i64) -> OutgoingEmail {
    let url = link(app_url, "verify-email", token);
    let expiry = plural(ttl_hours, "hour");
    OutgoingEmail {
        to: to.to_string(),
        subject: "Confirm your Red Flag Detector account".to_string(),
        text: format!(
            "Welcome to Red Flag Detector!\n\n\
             Confirm your email address by opening this link:\n{url}\n\n\
             The link expires in {expiry}. If you did not sign up, ignore this email."
        ),
        html: format!(
            "<p>Welcome to Red Flag Detector!</p>\
             <p><a href=\"{url}\">Confirm your email address</a></p>\
             <p>The link expires in {expiry}. If you did not sign up, ignore this email.</p>"
        ),
    }
}

pub fn password_reset_email(to: &str, app_url: &str, token: &str, ttl_minutes: i64) -> OutgoingEmail {
    let url = link(app_url, "reset-password", token);
    let expiry = if ttl_minutes % 60 == 0 {
        plural(ttl_minutes / 60, "hour")
    } else {
        plural(ttl_minutes, "minute")
    };
    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your Red Flag Detector password".to_string(),
        text: format!(
            "Someone asked to reset the password for this account.\n\n\
             Choose a new password here:\n{url}\n\n\
             The link expires in {expiry}. If this was not you, no action is needed."
        ),
        html: format!(
            "<p>Someone asked to reset the password for this account.</p>\
             <p><a href=\"{url}\">Choose a new password</a></p>\
             <p>The link expires in {expiry}. If this was not you, no action is needed.</p>"
        ),
    }
}
