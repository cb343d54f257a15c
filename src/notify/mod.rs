mod email;
mod sms;

use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use futures_util::future::BoxFuture;
use tracing::{error, info, warn};

pub use email::HttpMailer;
pub use sms::TwilioSms;

use crate::{
    AppError, AppResult,
    auth::{Channel, Identifier},
    config::Config,
};

pub struct Notice<'a> {
    pub subject: &'a str,
    pub body: &'a str,
}

/// One outbound channel (email provider, SMS provider).
pub trait CodeSender: Send + Sync {
    fn send<'a>(&'a self, to: &'a str, notice: Notice<'a>) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Stands in for a provider whose credentials were not supplied.
pub struct Unconfigured(pub Channel);

impl CodeSender for Unconfigured {
    fn send<'a>(&'a self, _to: &'a str, _notice: Notice<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move { Err(anyhow!("{} delivery is not configured", self.0)) })
    }
}

#[derive(Clone)]
pub struct Notifier {
    email: Arc<dyn CodeSender>,
    sms: Arc<dyn CodeSender>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(email: Arc<dyn CodeSender>, sms: Arc<dyn CodeSender>, timeout: Duration) -> Self {
        Notifier { email, sms, timeout }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.delivery_timeout)
            .build()?;

        let email: Arc<dyn CodeSender> = match &config.mail {
            Some(mail) => Arc::new(HttpMailer::new(http_client.clone(), mail.clone())),
            None => {
                warn!("no mail provider configured, email codes will fail to send");
                Arc::new(Unconfigured(Channel::Email))
            }
        };
        let sms: Arc<dyn CodeSender> = match &config.twilio {
            Some(twilio) => Arc::new(TwilioSms::new(http_client, twilio.clone())),
            None => {
                warn!("no SMS provider configured, SMS codes will fail to send");
                Arc::new(Unconfigured(Channel::Sms))
            }
        };

        Ok(Notifier::new(email, sms, config.delivery_timeout))
    }

    /// Sends `code` over the channel the identifier belongs to. Failure and
    /// timeout both surface as a delivery error.
    pub async fn deliver_code(&self, identifier: &Identifier, code: &str) -> AppResult<()> {
        let channel = identifier.channel();
        let (sender, subject, body, failure) = match channel {
            Channel::Email => (
                &self.email,
                "Email Verification",
                format!("Your verification code is: {code}"),
                "Error sending verification email.",
            ),
            Channel::Sms => (
                &self.sms,
                "Verification Code",
                format!("Your OTP is: {code}"),
                "Error sending OTP via SMS.",
            ),
        };

        let notice = Notice {
            subject,
            body: &body,
        };
        match tokio::time::timeout(self.timeout, sender.send(identifier.as_str(), notice)).await {
            Ok(Ok(())) => {
                info!(%channel, "verification code sent");
                Ok(())
            }
            Ok(Err(err)) => {
                error!(%channel, "provider rejected verification code: {err:#}");
                Err(AppError::Delivery(failure.to_owned()))
            }
            Err(_) => {
                error!(%channel, timeout = ?self.timeout, "provider timed out");
                Err(AppError::Delivery(failure.to_owned()))
            }
        }
    }
}
