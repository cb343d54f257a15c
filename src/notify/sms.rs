use futures_util::future::BoxFuture;

use crate::config::TwilioConfig;

use super::{CodeSender, Notice};

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioSms {
    http_client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioSms {
    pub fn new(http_client: reqwest::Client, config: TwilioConfig) -> Self {
        TwilioSms {
            http_client,
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{TWILIO_API}/Accounts/{}/Messages.json", self.config.account_sid)
    }
}

impl CodeSender for TwilioSms {
    fn send<'a>(&'a self, to: &'a str, notice: Notice<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.http_client
                .post(self.endpoint())
                .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
                .form(&[
                    ("To", to),
                    ("From", self.config.from_number.as_str()),
                    ("Body", notice.body),
                ])
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }
}
