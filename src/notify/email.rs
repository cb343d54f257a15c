use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::config::MailConfig;

use super::{CodeSender, Notice};

pub struct HttpMailer {
    http_client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(http_client: reqwest::Client, config: MailConfig) -> Self {
        HttpMailer {
            http_client,
            config,
        }
    }
}

#[derive(Serialize)]
struct MailRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

fn mail_request<'a>(from: &'a str, to: &'a str, notice: &Notice<'a>) -> MailRequest<'a> {
    MailRequest {
        personalizations: [Personalization {
            to: [Address { email: to }],
        }],
        from: Address { email: from },
        subject: notice.subject,
        content: [Content {
            kind: "text/plain",
            value: notice.body,
        }],
    }
}

impl CodeSender for HttpMailer {
    fn send<'a>(&'a self, to: &'a str, notice: Notice<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.http_client
                .post(&self.config.api_url)
                .bearer_auth(&self.config.api_key)
                .json(&mail_request(&self.config.from, to, &notice))
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }
}
