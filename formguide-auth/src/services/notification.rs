use std::sync::Arc;

use formguide_shared::clients::email::EmailSender;
use formguide_shared::errors::{AppError, AppResult, ErrorCode};

/// Renders and dispatches the two transactional emails of the auth flows.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
    public_base_url: String,
}

impl Notifier {
    pub fn new(sender: Arc<dyn EmailSender>, public_base_url: &str) -> Self {
        Self {
            sender,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/api/auth/verify-email?token={token}", self.public_base_url)
    }

    pub async fn send_verification(&self, to: &str, username: &str, token: &str) -> AppResult<()> {
        let link = self.verification_link(token);
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #2563eb;">Online Form Guide - Verify your email</h2>
            <p>Hello {username},</p>
            <p>Thanks for registering. Please confirm your email address to continue.</p>
            <p style="text-align: center; margin: 30px 0;">
            <a href="{link}" style="background: #2563eb; color: #ffffff; padding: 12px 24px; border-radius: 6px; text-decoration: none; font-weight: bold;">Verify Email</a>
            </p>
            <p style="color: #666;">Or paste this link into your browser:</p>
            <p style="word-break: break-all;"><a href="{link}">{link}</a></p>
            <p style="color: #666; margin-top: 20px;">This link expires in 1 hour.</p>
            </div>"#
        );

        self.dispatch(to, "Verify your email", &html).await
    }

    pub async fn send_otp(&self, to: &str, code: &str) -> AppResult<()> {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #2563eb;">Online Form Guide - Password Reset</h2>
            <p>Your password reset code is:</p>
            <div style="background: #f1f5f9; color: #1e293b; font-size: 32px; font-weight: bold; text-align: center; padding: 20px; border-radius: 8px; letter-spacing: 8px;">{code}</div>
            <p style="color: #666; margin-top: 20px;">This code is valid for 10 minutes. If you did not request this, please ignore this email.</p>
            </div>"#
        );

        self.dispatch(to, "Your password reset code", &html).await
    }

    async fn dispatch(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        self.sender.send(to, subject, html).await.map_err(|e| {
            tracing::error!(to = %to, subject = %subject, error = %e, "email dispatch failed");
            AppError::new(ErrorCode::EmailDeliveryFailed, format!("email dispatch failed: {e}"))
        })
    }
}
